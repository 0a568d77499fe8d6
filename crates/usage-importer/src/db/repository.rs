//! Repository contracts over the billing database
//!
//! Mutations take the caller's unit of work; reads run against committed
//! state. Every lookup that matches nothing fails with [`DbError::NotFound`],
//! which several callers treat as an expected outcome.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use super::models::{CollectionJob, File, JobStatus, Step, StepType, StepTypeName};
use super::{DbError, DbResult};

/// A transaction owned by one logical operation
#[async_trait]
pub trait UnitOfWork: Send + Sized {
    async fn commit(self) -> DbResult<()>;
    async fn rollback(self) -> DbResult<()>;
}

/// Commit on `Ok`, roll back on `Err`
///
/// A failing commit or rollback replaces the result with its own error.
pub async fn commit_or_rollback<Tx, T, E>(tx: Tx, result: Result<T, E>) -> Result<T, E>
where
    Tx: UnitOfWork,
    E: From<DbError>,
{
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        },
        Err(err) => match tx.rollback().await {
            Ok(()) => Err(err),
            Err(rollback_err) => {
                tracing::error!(error = %rollback_err, "Transaction rollback failed");
                Err(rollback_err.into())
            },
        },
    }
}

#[async_trait]
pub trait TransactionalStore: Send + Sync {
    type Tx: UnitOfWork;

    async fn begin(&self) -> DbResult<Self::Tx>;

    /// Insert all rows with a single multi-row statement
    ///
    /// `value_template` is one parenthesized row whose `?` placeholders are
    /// bound to the row's values in order. An empty `rows` is a no-op.
    async fn bulk_insert(
        &self,
        insert_prefix: &str,
        value_template: &str,
        rows: &[Vec<String>],
    ) -> DbResult<()>;

    /// Status map reported to the health endpoint
    async fn check(&self) -> DbResult<HashMap<String, Value>>;
}

#[async_trait]
pub trait CollectionJobRepository: TransactionalStore {
    async fn create_collection_job(
        &self,
        tx: &mut Self::Tx,
        source_id: i64,
        initial_step_type_id: i64,
        user: &str,
    ) -> DbResult<i64>;

    async fn fetch_collection_job(&self, id: i64) -> DbResult<CollectionJob>;

    async fn list_collection_jobs_by_status(&self, status: JobStatus) -> DbResult<Vec<CollectionJob>>;

    /// Full replace of the job's mutable fields
    async fn update_collection_job(
        &self,
        tx: &mut Self::Tx,
        job: &CollectionJob,
        user: &str,
    ) -> DbResult<()>;
}

#[async_trait]
pub trait StepRepository: TransactionalStore {
    async fn create_step(
        &self,
        tx: &mut Self::Tx,
        step_type_id: i64,
        collection_job_id: i64,
        user: &str,
    ) -> DbResult<i64>;

    async fn fetch_step(&self, id: i64) -> DbResult<Step>;

    async fn list_steps_by_collection_job(&self, collection_job_id: i64) -> DbResult<Vec<Step>>;

    /// The step of this type created by `user` for `source_id` that is not finished
    async fn fetch_unfinished_step(
        &self,
        source_id: i64,
        step_type_id: i64,
        user: &str,
    ) -> DbResult<Step>;

    /// The finished step that produced `file_id`, provided its collection job
    /// has no finished step of `next_step_type_id` yet
    async fn fetch_step_by_file_with_no_next_step(
        &self,
        file_id: i64,
        next_step_type_id: i64,
        user: &str,
    ) -> DbResult<Step>;

    async fn update_step(&self, tx: &mut Self::Tx, step: &Step, user: &str) -> DbResult<()>;
}

#[async_trait]
pub trait StepTypeRepository: Send + Sync {
    async fn fetch_step_type(&self, id: i64) -> DbResult<StepType>;

    async fn list_step_types_by_source(&self, source_id: i64) -> DbResult<Vec<StepType>>;

    async fn fetch_step_type_by_source_and_name(
        &self,
        source_id: i64,
        name: StepTypeName,
    ) -> DbResult<StepType>;

    async fn fetch_step_type_by_source_and_order(
        &self,
        source_id: i64,
        step_order: i32,
    ) -> DbResult<StepType>;
}

#[async_trait]
pub trait FileRepository: TransactionalStore {
    async fn create_file(
        &self,
        tx: &mut Self::Tx,
        checksum: &str,
        name: &str,
        file_path: &str,
        user: &str,
    ) -> DbResult<i64>;

    async fn fetch_file(&self, id: i64) -> DbResult<File>;

    async fn fetch_file_by_checksum(&self, checksum: &str) -> DbResult<File>;
}

/// Everything the step service and importer need from the billing database
pub trait BillingStore:
    CollectionJobRepository + StepRepository + StepTypeRepository + FileRepository + 'static
{
}

impl<T> BillingStore for T where
    T: CollectionJobRepository + StepRepository + StepTypeRepository + FileRepository + 'static
{
}

/// Number of `?` placeholders in a bulk insert row template
pub fn count_placeholders(value_template: &str) -> usize {
    value_template.matches('?').count()
}

/// Reject rows whose width does not match the template
pub fn check_bulk_rows(value_template: &str, rows: &[Vec<String>]) -> DbResult<()> {
    let expected = count_placeholders(value_template);
    if expected == 0 {
        return Err(DbError::Validation(format!(
            "value template '{}' has no placeholders",
            value_template
        )));
    }
    if let Some((index, row)) = rows.iter().enumerate().find(|(_, row)| row.len() != expected) {
        return Err(DbError::Validation(format!(
            "row {} has {} values but the template expects {}",
            index,
            row.len(),
            expected
        )));
    }
    Ok(())
}
