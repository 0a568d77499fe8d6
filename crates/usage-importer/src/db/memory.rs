//! In-process billing store for tests
//!
//! Mirrors the PostgreSQL semantics: writes made through a [`MemoryUnitOfWork`]
//! are staged and only become visible on commit, a commit applies all of them
//! or none, reads see committed state, ids come from sequences that are not
//! reused after a rollback. Failures can be injected per operation to
//! exercise rollback paths.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use super::models::{CollectionJob, File, JobStatus, Step, StepStatus, StepType, StepTypeName};
use super::repository::{
    check_bulk_rows, CollectionJobRepository, FileRepository, StepRepository, StepTypeRepository,
    TransactionalStore, UnitOfWork,
};
use super::{DbError, DbResult};

/// Operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultPoint {
    Begin,
    Commit,
    Rollback,
    BulkInsert,
    Check,
    CreateCollectionJob,
    FetchCollectionJob,
    UpdateCollectionJob,
    CreateStep,
    FetchStep,
    FetchUnfinishedStep,
    FetchStepByFile,
    UpdateStep,
    FetchStepType,
    CreateFile,
    FetchFile,
    FetchFileByChecksum,
}

#[derive(Debug, Clone)]
struct Audited<T> {
    row: T,
    created_by: String,
    modified_by: Option<String>,
}

#[derive(Debug, Default)]
struct State {
    jobs: BTreeMap<i64, Audited<CollectionJob>>,
    steps: BTreeMap<i64, Audited<Step>>,
    files: BTreeMap<i64, Audited<File>>,
    step_types: BTreeMap<i64, StepType>,
    bulk_inserts: Vec<Vec<Vec<String>>>,
    last_id: i64,
    faults: HashMap<FaultPoint, Fault>,
}

/// When an injected fault fires
#[derive(Debug, Clone, Copy)]
struct Fault {
    /// Calls that still succeed before the fault fires
    skip: usize,
    /// Failures left, `None` for every call
    times: Option<usize>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn fault(&mut self, point: FaultPoint) -> DbResult<()> {
        let Some(fault) = self.faults.get_mut(&point) else {
            return Ok(());
        };
        if fault.skip > 0 {
            fault.skip -= 1;
            return Ok(());
        }
        if let Some(times) = fault.times.as_mut() {
            *times -= 1;
            if *times == 0 {
                self.faults.remove(&point);
            }
        }
        Err(DbError::Storage(format!("injected failure at {:?}", point)))
    }

    /// Committed row or one inserted earlier in the same unit of work
    fn has_step(&self, writes: &[StagedWrite], id: i64) -> bool {
        self.steps.contains_key(&id)
            || writes
                .iter()
                .any(|w| matches!(w, StagedWrite::InsertStep(s) if s.row.id == id))
    }

    fn has_job(&self, writes: &[StagedWrite], id: i64) -> bool {
        self.jobs.contains_key(&id)
            || writes
                .iter()
                .any(|w| matches!(w, StagedWrite::InsertJob(j) if j.row.id == id))
    }
}

#[derive(Debug)]
enum StagedWrite {
    InsertJob(Audited<CollectionJob>),
    UpdateJob(CollectionJob, String),
    InsertStep(Audited<Step>),
    UpdateStep(Step, String),
    InsertFile(Audited<File>),
}

pub struct MemoryUnitOfWork {
    state: Arc<Mutex<State>>,
    writes: Vec<StagedWrite>,
}

impl MemoryUnitOfWork {
    fn state(&self) -> MutexGuard<'_, State> {
        lock(&self.state)
    }
}

fn lock(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn commit(self) -> DbResult<()> {
        let mut state = lock(&self.state);
        state.fault(FaultPoint::Commit)?;

        for (i, write) in self.writes.iter().enumerate() {
            let earlier = &self.writes[..i];
            match write {
                StagedWrite::UpdateJob(job, _) if !state.has_job(earlier, job.id) => {
                    return Err(DbError::not_found("Collection job", job.id));
                },
                StagedWrite::UpdateStep(step, _) if !state.has_step(earlier, step.id) => {
                    return Err(DbError::not_found("Step", step.id));
                },
                _ => {},
            }
        }

        for write in self.writes {
            match write {
                StagedWrite::InsertJob(job) => {
                    state.jobs.insert(job.row.id, job);
                },
                StagedWrite::UpdateJob(job, user) => {
                    if let Some(stored) = state.jobs.get_mut(&job.id) {
                        stored.row = job;
                        stored.modified_by = Some(user);
                    }
                },
                StagedWrite::InsertStep(step) => {
                    state.steps.insert(step.row.id, step);
                },
                StagedWrite::UpdateStep(step, user) => {
                    if let Some(stored) = state.steps.get_mut(&step.id) {
                        stored.row = step;
                        stored.modified_by = Some(user);
                    }
                },
                StagedWrite::InsertFile(file) => {
                    state.files.insert(file.row.id, file);
                },
            }
        }
        Ok(())
    }

    async fn rollback(self) -> DbResult<()> {
        self.state().fault(FaultPoint::Rollback)
    }
}

/// Billing store kept in memory, cheap to clone and share
#[derive(Clone, Default)]
pub struct MemoryBillingStore {
    state: Arc<Mutex<State>>,
}

impl MemoryBillingStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        lock(&self.state)
    }

    /// Make every call of `point` fail until [`clear_faults`](Self::clear_faults)
    pub fn fail_on(&self, point: FaultPoint) {
        self.inject(point, 0, None);
    }

    /// Make only the next `times` calls of `point` fail
    pub fn fail_next(&self, point: FaultPoint, times: usize) {
        if times > 0 {
            self.inject(point, 0, Some(times));
        }
    }

    /// Let `calls` calls of `point` through, then fail every later one
    pub fn fail_after(&self, point: FaultPoint, calls: usize) {
        self.inject(point, calls, None);
    }

    fn inject(&self, point: FaultPoint, skip: usize, times: Option<usize>) {
        self.state().faults.insert(point, Fault { skip, times });
    }

    pub fn clear_faults(&self) {
        self.state().faults.clear();
    }

    pub fn add_step_type(&self, source_id: i64, name: StepTypeName, step_order: i32) -> StepType {
        let mut state = self.state();
        let step_type = StepType {
            id: state.next_id(),
            source_id,
            name,
            step_order,
        };
        state.step_types.insert(step_type.id, step_type.clone());
        step_type
    }

    /// Committed collection job with the given current step type
    pub fn seed_collection_job(&self, source_id: i64, current_step_type_id: i64, user: &str) -> CollectionJob {
        let mut state = self.state();
        let job = CollectionJob {
            id: state.next_id(),
            source_id,
            status: JobStatus::InProgress,
            current_step_type_id,
            start_date: Utc::now(),
            end_date: None,
        };
        state.jobs.insert(
            job.id,
            Audited {
                row: job.clone(),
                created_by: user.to_string(),
                modified_by: None,
            },
        );
        job
    }

    /// Committed step with an explicit status and file
    pub fn seed_step(
        &self,
        step_type_id: i64,
        collection_job_id: i64,
        status: StepStatus,
        file_id: Option<i64>,
        user: &str,
    ) -> Step {
        let mut state = self.state();
        let now = Utc::now();
        let step = Step {
            id: state.next_id(),
            step_type_id,
            collection_job_id,
            start_date: now,
            end_date: (status != StepStatus::InProgress).then_some(now),
            file_id,
            status,
            error: String::new(),
        };
        state.steps.insert(
            step.id,
            Audited {
                row: step.clone(),
                created_by: user.to_string(),
                modified_by: None,
            },
        );
        step
    }

    pub fn seed_file(&self, checksum: &str, name: &str, file_path: &str) -> File {
        let mut state = self.state();
        let file = File {
            id: state.next_id(),
            checksum: checksum.to_string(),
            name: name.to_string(),
            file_path: file_path.to_string(),
        };
        state.files.insert(
            file.id,
            Audited {
                row: file.clone(),
                created_by: "seed".to_string(),
                modified_by: None,
            },
        );
        file
    }

    pub fn files(&self) -> Vec<File> {
        self.state().files.values().map(|f| f.row.clone()).collect()
    }

    pub fn steps(&self) -> Vec<Step> {
        self.state().steps.values().map(|s| s.row.clone()).collect()
    }

    pub fn collection_jobs(&self) -> Vec<CollectionJob> {
        self.state().jobs.values().map(|j| j.row.clone()).collect()
    }

    /// Rows of every executed bulk insert, in call order
    pub fn bulk_inserts(&self) -> Vec<Vec<Vec<String>>> {
        self.state().bulk_inserts.clone()
    }

    /// User recorded in `modified_by` on the step's last committed update
    pub fn step_modified_by(&self, id: i64) -> Option<String> {
        self.state().steps.get(&id).and_then(|s| s.modified_by.clone())
    }
}

#[async_trait]
impl TransactionalStore for MemoryBillingStore {
    type Tx = MemoryUnitOfWork;

    async fn begin(&self) -> DbResult<MemoryUnitOfWork> {
        self.state().fault(FaultPoint::Begin)?;
        Ok(MemoryUnitOfWork {
            state: self.state.clone(),
            writes: Vec::new(),
        })
    }

    async fn bulk_insert(
        &self,
        _insert_prefix: &str,
        value_template: &str,
        rows: &[Vec<String>],
    ) -> DbResult<()> {
        let mut state = self.state();
        state.fault(FaultPoint::BulkInsert)?;
        if rows.is_empty() {
            return Ok(());
        }
        check_bulk_rows(value_template, rows)?;
        state.bulk_inserts.push(rows.to_vec());
        Ok(())
    }

    async fn check(&self) -> DbResult<HashMap<String, Value>> {
        let mut state = self.state();
        state.fault(FaultPoint::Check)?;

        let mut status = HashMap::new();
        status.insert("status".to_string(), json!("up"));
        status.insert("backend".to_string(), json!("memory"));
        status.insert("steps".to_string(), json!(state.steps.len()));
        Ok(status)
    }
}

#[async_trait]
impl CollectionJobRepository for MemoryBillingStore {
    async fn create_collection_job(
        &self,
        tx: &mut MemoryUnitOfWork,
        source_id: i64,
        initial_step_type_id: i64,
        user: &str,
    ) -> DbResult<i64> {
        let id = {
            let mut state = self.state();
            state.fault(FaultPoint::CreateCollectionJob)?;
            state.next_id()
        };
        tx.writes.push(StagedWrite::InsertJob(Audited {
            row: CollectionJob {
                id,
                source_id,
                status: JobStatus::InProgress,
                current_step_type_id: initial_step_type_id,
                start_date: Utc::now(),
                end_date: None,
            },
            created_by: user.to_string(),
            modified_by: None,
        }));
        Ok(id)
    }

    async fn fetch_collection_job(&self, id: i64) -> DbResult<CollectionJob> {
        let mut state = self.state();
        state.fault(FaultPoint::FetchCollectionJob)?;
        state
            .jobs
            .get(&id)
            .map(|j| j.row.clone())
            .ok_or_else(|| DbError::not_found("Collection job", id))
    }

    async fn list_collection_jobs_by_status(&self, status: JobStatus) -> DbResult<Vec<CollectionJob>> {
        Ok(self
            .state()
            .jobs
            .values()
            .filter(|j| j.row.status == status)
            .map(|j| j.row.clone())
            .collect())
    }

    async fn update_collection_job(
        &self,
        tx: &mut MemoryUnitOfWork,
        job: &CollectionJob,
        user: &str,
    ) -> DbResult<()> {
        {
            let mut state = self.state();
            state.fault(FaultPoint::UpdateCollectionJob)?;
            if !state.has_job(&tx.writes, job.id) {
                return Err(DbError::not_found("Collection job", job.id));
            }
        }
        tx.writes.push(StagedWrite::UpdateJob(job.clone(), user.to_string()));
        Ok(())
    }
}

#[async_trait]
impl StepRepository for MemoryBillingStore {
    async fn create_step(
        &self,
        tx: &mut MemoryUnitOfWork,
        step_type_id: i64,
        collection_job_id: i64,
        user: &str,
    ) -> DbResult<i64> {
        let id = {
            let mut state = self.state();
            state.fault(FaultPoint::CreateStep)?;
            state.next_id()
        };
        tx.writes.push(StagedWrite::InsertStep(Audited {
            row: Step {
                id,
                step_type_id,
                collection_job_id,
                start_date: Utc::now(),
                end_date: None,
                file_id: None,
                status: StepStatus::InProgress,
                error: String::new(),
            },
            created_by: user.to_string(),
            modified_by: None,
        }));
        Ok(id)
    }

    async fn fetch_step(&self, id: i64) -> DbResult<Step> {
        let mut state = self.state();
        state.fault(FaultPoint::FetchStep)?;
        state
            .steps
            .get(&id)
            .map(|s| s.row.clone())
            .ok_or_else(|| DbError::not_found("Step", id))
    }

    async fn list_steps_by_collection_job(&self, collection_job_id: i64) -> DbResult<Vec<Step>> {
        Ok(self
            .state()
            .steps
            .values()
            .filter(|s| s.row.collection_job_id == collection_job_id)
            .map(|s| s.row.clone())
            .collect())
    }

    async fn fetch_unfinished_step(
        &self,
        source_id: i64,
        step_type_id: i64,
        user: &str,
    ) -> DbResult<Step> {
        let mut state = self.state();
        state.fault(FaultPoint::FetchUnfinishedStep)?;

        let source_matches = state
            .step_types
            .get(&step_type_id)
            .is_some_and(|st| st.source_id == source_id);

        state
            .steps
            .values()
            .filter(|_| source_matches)
            .find(|s| {
                s.row.step_type_id == step_type_id
                    && s.created_by == user
                    && s.row.status != StepStatus::Finished
            })
            .map(|s| s.row.clone())
            .ok_or_else(|| {
                DbError::not_found(
                    "Unfinished step",
                    format!("source={} type={} user={}", source_id, step_type_id, user),
                )
            })
    }

    async fn fetch_step_by_file_with_no_next_step(
        &self,
        file_id: i64,
        next_step_type_id: i64,
        _user: &str,
    ) -> DbResult<Step> {
        let mut state = self.state();
        state.fault(FaultPoint::FetchStepByFile)?;

        let consumed_jobs: HashSet<i64> = state
            .steps
            .values()
            .filter(|s| s.row.step_type_id == next_step_type_id && s.row.status == StepStatus::Finished)
            .map(|s| s.row.collection_job_id)
            .collect();

        state
            .steps
            .values()
            .find(|s| {
                s.row.file_id == Some(file_id)
                    && s.row.status == StepStatus::Finished
                    && !consumed_jobs.contains(&s.row.collection_job_id)
            })
            .map(|s| s.row.clone())
            .ok_or_else(|| {
                DbError::not_found(
                    "Step without next step",
                    format!("file={} next_type={}", file_id, next_step_type_id),
                )
            })
    }

    async fn update_step(&self, tx: &mut MemoryUnitOfWork, step: &Step, user: &str) -> DbResult<()> {
        {
            let mut state = self.state();
            state.fault(FaultPoint::UpdateStep)?;
            if !state.has_step(&tx.writes, step.id) {
                return Err(DbError::not_found("Step", step.id));
            }
        }
        tx.writes.push(StagedWrite::UpdateStep(step.clone(), user.to_string()));
        Ok(())
    }
}

#[async_trait]
impl StepTypeRepository for MemoryBillingStore {
    async fn fetch_step_type(&self, id: i64) -> DbResult<StepType> {
        let mut state = self.state();
        state.fault(FaultPoint::FetchStepType)?;
        state
            .step_types
            .get(&id)
            .cloned()
            .ok_or_else(|| DbError::not_found("Step type", id))
    }

    async fn list_step_types_by_source(&self, source_id: i64) -> DbResult<Vec<StepType>> {
        let mut types: Vec<StepType> = self
            .state()
            .step_types
            .values()
            .filter(|st| st.source_id == source_id)
            .cloned()
            .collect();
        types.sort_by_key(|st| st.step_order);
        Ok(types)
    }

    async fn fetch_step_type_by_source_and_name(
        &self,
        source_id: i64,
        name: StepTypeName,
    ) -> DbResult<StepType> {
        self.state()
            .step_types
            .values()
            .find(|st| st.source_id == source_id && st.name == name)
            .cloned()
            .ok_or_else(|| DbError::not_found("Step type", format!("source={} name={}", source_id, name)))
    }

    async fn fetch_step_type_by_source_and_order(
        &self,
        source_id: i64,
        step_order: i32,
    ) -> DbResult<StepType> {
        self.state()
            .step_types
            .values()
            .find(|st| st.source_id == source_id && st.step_order == step_order)
            .cloned()
            .ok_or_else(|| {
                DbError::not_found("Step type", format!("source={} order={}", source_id, step_order))
            })
    }
}

#[async_trait]
impl FileRepository for MemoryBillingStore {
    async fn create_file(
        &self,
        tx: &mut MemoryUnitOfWork,
        checksum: &str,
        name: &str,
        file_path: &str,
        user: &str,
    ) -> DbResult<i64> {
        let id = {
            let mut state = self.state();
            state.fault(FaultPoint::CreateFile)?;
            state.next_id()
        };
        tx.writes.push(StagedWrite::InsertFile(Audited {
            row: File {
                id,
                checksum: checksum.to_string(),
                name: name.to_string(),
                file_path: file_path.to_string(),
            },
            created_by: user.to_string(),
            modified_by: None,
        }));
        Ok(id)
    }

    async fn fetch_file(&self, id: i64) -> DbResult<File> {
        let mut state = self.state();
        state.fault(FaultPoint::FetchFile)?;
        state
            .files
            .get(&id)
            .map(|f| f.row.clone())
            .ok_or_else(|| DbError::not_found("File", id))
    }

    async fn fetch_file_by_checksum(&self, checksum: &str) -> DbResult<File> {
        let mut state = self.state();
        state.fault(FaultPoint::FetchFileByChecksum)?;
        state
            .files
            .values()
            .find(|f| f.row.checksum == checksum)
            .map(|f| f.row.clone())
            .ok_or_else(|| DbError::not_found("File with checksum", checksum))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::commit_or_rollback;

    #[tokio::test]
    async fn test_writes_visible_only_after_commit() {
        let store = MemoryBillingStore::new();
        let import = store.add_step_type(1, StepTypeName::Import, 4);
        let job = store.seed_collection_job(1, import.id, "tester");

        let mut tx = store.begin().await.unwrap();
        let step_id = store.create_step(&mut tx, import.id, job.id, "tester").await.unwrap();
        assert!(store.fetch_step(step_id).await.unwrap_err().is_not_found());

        tx.commit().await.unwrap();
        let step = store.fetch_step(step_id).await.unwrap();
        assert_eq!(step.status, StepStatus::InProgress);
        assert_eq!(step.file_id, None);
    }

    #[tokio::test]
    async fn test_rollback_discards_writes() {
        let store = MemoryBillingStore::new();
        let mut tx = store.begin().await.unwrap();
        store.create_file(&mut tx, "abc", "a.csv", "/in", "tester").await.unwrap();

        let result: DbResult<()> = commit_or_rollback(tx, Err(DbError::Storage("boom".into()))).await;
        assert!(result.is_err());
        assert!(store.files().is_empty());
    }

    #[tokio::test]
    async fn test_unfinished_step_filters() {
        let store = MemoryBillingStore::new();
        let import = store.add_step_type(1, StepTypeName::Import, 4);
        let other_source = store.add_step_type(2, StepTypeName::Import, 4);
        let job = store.seed_collection_job(1, import.id, "tester");

        store.seed_step(import.id, job.id, StepStatus::Finished, Some(99), "tester");
        store.seed_step(import.id, job.id, StepStatus::Error, None, "someone-else");
        let expected = store.seed_step(import.id, job.id, StepStatus::Error, None, "tester");

        let found = store.fetch_unfinished_step(1, import.id, "tester").await.unwrap();
        assert_eq!(found.id, expected.id);

        assert!(store
            .fetch_unfinished_step(2, import.id, "tester")
            .await
            .unwrap_err()
            .is_not_found());
        assert!(store
            .fetch_unfinished_step(2, other_source.id, "tester")
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_step_by_file_with_no_next_step() {
        let store = MemoryBillingStore::new();
        let summarize = store.add_step_type(1, StepTypeName::Summarize, 2);
        let import = store.add_step_type(1, StepTypeName::Import, 3);
        let job = store.seed_collection_job(1, summarize.id, "tester");
        let file = store.seed_file("abc", "a.csv", "/in");

        let producer = store.seed_step(summarize.id, job.id, StepStatus::Finished, Some(file.id), "tester");
        let found = store
            .fetch_step_by_file_with_no_next_step(file.id, import.id, "tester")
            .await
            .unwrap();
        assert_eq!(found.id, producer.id);

        store.seed_step(import.id, job.id, StepStatus::Finished, Some(file.id), "tester");
        assert!(store
            .fetch_step_by_file_with_no_next_step(file.id, import.id, "tester")
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_fault_injection() {
        let store = MemoryBillingStore::new();
        store.fail_on(FaultPoint::Begin);
        assert!(matches!(store.begin().await, Err(DbError::Storage(_))));

        store.clear_faults();
        assert!(store.begin().await.is_ok());
    }

    #[tokio::test]
    async fn test_fault_schedules() {
        let store = MemoryBillingStore::new();
        store.fail_next(FaultPoint::Begin, 1);
        assert!(store.begin().await.is_err());
        assert!(store.begin().await.is_ok());

        store.fail_after(FaultPoint::Check, 1);
        assert!(store.check().await.is_ok());
        assert!(store.check().await.is_err());
        assert!(store.check().await.is_err());
    }

    #[tokio::test]
    async fn test_update_of_unknown_row_is_not_found() {
        let store = MemoryBillingStore::new();
        let import = store.add_step_type(1, StepTypeName::Import, 4);
        let job = store.seed_collection_job(1, import.id, "tester");

        let mut tx = store.begin().await.unwrap();
        store.create_step(&mut tx, import.id, job.id, "tester").await.unwrap();
        let mut missing = job.clone();
        missing.id = 9999;
        let err = store
            .update_collection_job(&mut tx, &missing, "tester")
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let result: DbResult<()> = commit_or_rollback(tx, Err(err)).await;
        assert!(result.is_err());
        assert!(store.steps().is_empty());

        let mut tx = store.begin().await.unwrap();
        let mut step = store.seed_step(import.id, job.id, StepStatus::InProgress, None, "tester");
        step.id = 9999;
        assert!(store
            .update_step(&mut tx, &step, "tester")
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_update_of_row_staged_in_same_transaction() {
        let store = MemoryBillingStore::new();
        let import = store.add_step_type(1, StepTypeName::Import, 4);
        let job = store.seed_collection_job(1, import.id, "tester");

        let mut tx = store.begin().await.unwrap();
        let step_id = store.create_step(&mut tx, import.id, job.id, "tester").await.unwrap();
        let mut step = Step {
            id: step_id,
            step_type_id: import.id,
            collection_job_id: job.id,
            start_date: Utc::now(),
            end_date: None,
            file_id: None,
            status: StepStatus::Error,
            error: "late".to_string(),
        };
        store.update_step(&mut tx, &step, "fixer").await.unwrap();
        tx.commit().await.unwrap();

        let stored = store.fetch_step(step_id).await.unwrap();
        step.start_date = stored.start_date;
        assert_eq!(stored, step);
        assert_eq!(store.step_modified_by(step_id), Some("fixer".to_string()));
    }

    #[tokio::test]
    async fn test_bulk_insert_validates_width() {
        let store = MemoryBillingStore::new();
        let rows = vec![vec!["1".to_string(), "x".to_string()]];
        assert!(store.bulk_insert("INSERT INTO t", "(?, ?, ?)", &rows).await.is_err());
        store.bulk_insert("INSERT INTO t", "(?, ?)", &rows).await.unwrap();
        store.bulk_insert("INSERT INTO t", "(?, ?)", &[]).await.unwrap();
        assert_eq!(store.bulk_inserts().len(), 1);
    }
}
