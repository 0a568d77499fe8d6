//! PostgreSQL implementation of the billing repositories

use async_trait::async_trait;
use serde_json::{json, Value};
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use std::collections::HashMap;

use super::models::{CollectionJob, File, JobStatus, Step, StepStatus, StepType, StepTypeName};
use super::repository::{
    check_bulk_rows, CollectionJobRepository, FileRepository, StepRepository, StepTypeRepository,
    TransactionalStore, UnitOfWork,
};
use super::{DbError, DbResult};

const STEP_COLUMNS: &str =
    "step_id, step_type_id, collection_job_id, start_date, end_date, file_id, status, error";

const JOB_COLUMNS: &str =
    "collection_job_id, source_id, status, current_step_type_id, start_date, end_date";

const STEP_TYPE_COLUMNS: &str = "step_type_id, source_id, name, step_order";

const FILE_COLUMNS: &str = "file_id, checksum, name, file_path";

pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn commit(self) -> DbResult<()> {
        self.tx.commit().await.map_err(DbError::from)
    }

    async fn rollback(self) -> DbResult<()> {
        self.tx.rollback().await.map_err(DbError::from)
    }
}

#[derive(Clone)]
pub struct PgBillingStore {
    pool: PgPool,
}

impl PgBillingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn required<T>(row: Option<T>, resource: &str, identifier: impl std::fmt::Display) -> DbResult<T> {
    row.ok_or_else(|| DbError::not_found(resource, identifier))
}

#[async_trait]
impl TransactionalStore for PgBillingStore {
    type Tx = PgUnitOfWork;

    async fn begin(&self) -> DbResult<PgUnitOfWork> {
        Ok(PgUnitOfWork {
            tx: self.pool.begin().await?,
        })
    }

    async fn bulk_insert(
        &self,
        insert_prefix: &str,
        value_template: &str,
        rows: &[Vec<String>],
    ) -> DbResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        check_bulk_rows(value_template, rows)?;

        let mut builder = QueryBuilder::<Postgres>::new(insert_prefix);
        builder.push(" ");
        for (index, row) in rows.iter().enumerate() {
            if index > 0 {
                builder.push(", ");
            }
            let mut parts = value_template.split('?');
            if let Some(head) = parts.next() {
                builder.push(head);
            }
            for (value, tail) in row.iter().zip(parts) {
                builder.push_bind(value.clone());
                builder.push(tail);
            }
        }

        let result = builder.build().execute(&self.pool).await?;
        tracing::debug!(
            rows = rows.len(),
            affected = result.rows_affected(),
            "Bulk insert executed"
        );
        Ok(())
    }

    async fn check(&self) -> DbResult<HashMap<String, Value>> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;

        let mut status = HashMap::new();
        status.insert("status".to_string(), json!("up"));
        status.insert("pool_size".to_string(), json!(self.pool.size()));
        status.insert("idle_connections".to_string(), json!(self.pool.num_idle()));
        Ok(status)
    }
}

#[async_trait]
impl CollectionJobRepository for PgBillingStore {
    async fn create_collection_job(
        &self,
        tx: &mut PgUnitOfWork,
        source_id: i64,
        initial_step_type_id: i64,
        user: &str,
    ) -> DbResult<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO collection_job (source_id, status, current_step_type_id, created_by)
            VALUES ($1, $2, $3, $4)
            RETURNING collection_job_id
            "#,
        )
        .bind(source_id)
        .bind(JobStatus::InProgress.as_str())
        .bind(initial_step_type_id)
        .bind(user)
        .fetch_one(&mut *tx.tx)
        .await?;

        Ok(id)
    }

    async fn fetch_collection_job(&self, id: i64) -> DbResult<CollectionJob> {
        let row = sqlx::query_as::<_, CollectionJob>(&format!(
            "SELECT {} FROM collection_job WHERE collection_job_id = $1",
            JOB_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        required(row, "Collection job", id)
    }

    async fn list_collection_jobs_by_status(&self, status: JobStatus) -> DbResult<Vec<CollectionJob>> {
        let rows = sqlx::query_as::<_, CollectionJob>(&format!(
            "SELECT {} FROM collection_job WHERE status = $1 ORDER BY collection_job_id",
            JOB_COLUMNS
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn update_collection_job(
        &self,
        tx: &mut PgUnitOfWork,
        job: &CollectionJob,
        user: &str,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE collection_job
            SET status = $1, current_step_type_id = $2, end_date = $3, modified_by = $4
            WHERE collection_job_id = $5
            "#,
        )
        .bind(job.status.as_str())
        .bind(job.current_step_type_id)
        .bind(job.end_date)
        .bind(user)
        .bind(job.id)
        .execute(&mut *tx.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Collection job", job.id));
        }
        Ok(())
    }
}

#[async_trait]
impl StepRepository for PgBillingStore {
    async fn create_step(
        &self,
        tx: &mut PgUnitOfWork,
        step_type_id: i64,
        collection_job_id: i64,
        user: &str,
    ) -> DbResult<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO step (step_type_id, collection_job_id, status, created_by)
            VALUES ($1, $2, $3, $4)
            RETURNING step_id
            "#,
        )
        .bind(step_type_id)
        .bind(collection_job_id)
        .bind(StepStatus::InProgress.as_str())
        .bind(user)
        .fetch_one(&mut *tx.tx)
        .await?;

        Ok(id)
    }

    async fn fetch_step(&self, id: i64) -> DbResult<Step> {
        let row = sqlx::query_as::<_, Step>(&format!(
            "SELECT {} FROM step WHERE step_id = $1",
            STEP_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        required(row, "Step", id)
    }

    async fn list_steps_by_collection_job(&self, collection_job_id: i64) -> DbResult<Vec<Step>> {
        let rows = sqlx::query_as::<_, Step>(&format!(
            "SELECT {} FROM step WHERE collection_job_id = $1 ORDER BY step_id",
            STEP_COLUMNS
        ))
        .bind(collection_job_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn fetch_unfinished_step(
        &self,
        source_id: i64,
        step_type_id: i64,
        user: &str,
    ) -> DbResult<Step> {
        let row = sqlx::query_as::<_, Step>(
            r#"
            SELECT s.step_id, s.step_type_id, s.collection_job_id, s.start_date, s.end_date,
                   s.file_id, s.status, s.error
            FROM step s
            JOIN step_type st USING (step_type_id)
            WHERE s.step_type_id = $1
              AND s.created_by = $2
              AND s.status <> $3
              AND st.source_id = $4
            ORDER BY s.step_id
            LIMIT 1
            "#,
        )
        .bind(step_type_id)
        .bind(user)
        .bind(StepStatus::Finished.as_str())
        .bind(source_id)
        .fetch_optional(&self.pool)
        .await?;

        required(
            row,
            "Unfinished step",
            format!("source={} type={} user={}", source_id, step_type_id, user),
        )
    }

    async fn fetch_step_by_file_with_no_next_step(
        &self,
        file_id: i64,
        next_step_type_id: i64,
        _user: &str,
    ) -> DbResult<Step> {
        let row = sqlx::query_as::<_, Step>(
            r#"
            SELECT prev.step_id, prev.step_type_id, prev.collection_job_id, prev.start_date,
                   prev.end_date, prev.file_id, prev.status, prev.error
            FROM step prev
            LEFT JOIN (
                SELECT step_id, collection_job_id
                FROM step
                WHERE step_type_id = $1 AND status = $2
            ) next USING (collection_job_id)
            WHERE next.step_id IS NULL
              AND prev.file_id = $3
              AND prev.status = $2
            ORDER BY prev.step_id
            LIMIT 1
            "#,
        )
        .bind(next_step_type_id)
        .bind(StepStatus::Finished.as_str())
        .bind(file_id)
        .fetch_optional(&self.pool)
        .await?;

        required(
            row,
            "Step without next step",
            format!("file={} next_type={}", file_id, next_step_type_id),
        )
    }

    async fn update_step(&self, tx: &mut PgUnitOfWork, step: &Step, user: &str) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE step
            SET start_date = $1, end_date = $2, file_id = $3, status = $4, error = $5,
                modified_by = $6
            WHERE step_id = $7
            "#,
        )
        .bind(step.start_date)
        .bind(step.end_date)
        .bind(step.file_id)
        .bind(step.status.as_str())
        .bind(&step.error)
        .bind(user)
        .bind(step.id)
        .execute(&mut *tx.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Step", step.id));
        }
        Ok(())
    }
}

#[async_trait]
impl StepTypeRepository for PgBillingStore {
    async fn fetch_step_type(&self, id: i64) -> DbResult<StepType> {
        let row = sqlx::query_as::<_, StepType>(&format!(
            "SELECT {} FROM step_type WHERE step_type_id = $1",
            STEP_TYPE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        required(row, "Step type", id)
    }

    async fn list_step_types_by_source(&self, source_id: i64) -> DbResult<Vec<StepType>> {
        let rows = sqlx::query_as::<_, StepType>(&format!(
            "SELECT {} FROM step_type WHERE source_id = $1 ORDER BY step_order",
            STEP_TYPE_COLUMNS
        ))
        .bind(source_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn fetch_step_type_by_source_and_name(
        &self,
        source_id: i64,
        name: StepTypeName,
    ) -> DbResult<StepType> {
        let row = sqlx::query_as::<_, StepType>(&format!(
            "SELECT {} FROM step_type WHERE source_id = $1 AND name = $2",
            STEP_TYPE_COLUMNS
        ))
        .bind(source_id)
        .bind(name.as_str())
        .fetch_optional(&self.pool)
        .await?;

        required(row, "Step type", format!("source={} name={}", source_id, name))
    }

    async fn fetch_step_type_by_source_and_order(
        &self,
        source_id: i64,
        step_order: i32,
    ) -> DbResult<StepType> {
        let row = sqlx::query_as::<_, StepType>(&format!(
            "SELECT {} FROM step_type WHERE source_id = $1 AND step_order = $2",
            STEP_TYPE_COLUMNS
        ))
        .bind(source_id)
        .bind(step_order)
        .fetch_optional(&self.pool)
        .await?;

        required(row, "Step type", format!("source={} order={}", source_id, step_order))
    }
}

#[async_trait]
impl FileRepository for PgBillingStore {
    async fn create_file(
        &self,
        tx: &mut PgUnitOfWork,
        checksum: &str,
        name: &str,
        file_path: &str,
        user: &str,
    ) -> DbResult<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO file (checksum, name, file_path, created_by)
            VALUES ($1, $2, $3, $4)
            RETURNING file_id
            "#,
        )
        .bind(checksum)
        .bind(name)
        .bind(file_path)
        .bind(user)
        .fetch_one(&mut *tx.tx)
        .await?;

        Ok(id)
    }

    async fn fetch_file(&self, id: i64) -> DbResult<File> {
        let row = sqlx::query_as::<_, File>(&format!(
            "SELECT {} FROM file WHERE file_id = $1",
            FILE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        required(row, "File", id)
    }

    async fn fetch_file_by_checksum(&self, checksum: &str) -> DbResult<File> {
        let row = sqlx::query_as::<_, File>(&format!(
            "SELECT {} FROM file WHERE checksum = $1 ORDER BY file_id LIMIT 1",
            FILE_COLUMNS
        ))
        .bind(checksum)
        .fetch_optional(&self.pool)
        .await?;

        required(row, "File with checksum", checksum)
    }
}
