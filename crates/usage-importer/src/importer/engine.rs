//! Import step engine
//!
//! One execution:
//! 1. resolves the configured step type and checks it belongs to the source
//! 2. picks the oldest eligible input file
//! 3. restarts the unfinished import step of the same collection job, or
//!    creates a new one
//! 4. streams the file's records into the vendor usage table in batches
//! 5. finishes the step with the input file, or marks it as ERROR

use async_trait::async_trait;
use csv_async::{AsyncReaderBuilder, StringRecord};
use std::sync::Arc;
use tokio::io::AsyncRead;
use tracing::{debug, error, info, instrument, warn};

use super::observer::{ExecutionObserver, Trace};
use super::vendor::VendorMapper;
use crate::db::{commit_or_rollback, BillingStore, Step, StepType};
use crate::steps::{StepError, StepOptions, StepResult, StepService};

/// Mapped rows sent per bulk insert
pub const DEFAULT_BULK_FLUSH_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    /// Nothing in the input folder was eligible
    NoFile,
    Imported {
        step_id: i64,
        file_id: i64,
        batches: u64,
        rows: u64,
    },
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct ImportSummary {
    batches: u64,
    rows: u64,
}

/// Something the `/start-job` handler can run in the background
#[async_trait]
pub trait ImportRunner: Send + Sync + 'static {
    async fn run_import(&self) -> StepResult<ImportOutcome>;
}

pub struct ImporterStep<S> {
    store: Arc<S>,
    steps: StepService<S>,
    options: StepOptions,
    vendor: VendorMapper,
    observers: Vec<Arc<dyn ExecutionObserver>>,
    bulk_flush_size: usize,
}

impl<S: BillingStore> ImporterStep<S> {
    pub fn new(
        store: Arc<S>,
        options: StepOptions,
        vendor: VendorMapper,
        observers: Vec<Arc<dyn ExecutionObserver>>,
    ) -> StepResult<Self> {
        vendor.validate()?;
        let steps = StepService::new(store.clone(), options.clone())?;

        debug!(
            source_id = options.source_id,
            step_type_id = options.step_type_id,
            vendor = %vendor.vendor_name,
            "Importer step created"
        );

        Ok(Self {
            store,
            steps,
            options,
            vendor,
            observers,
            bulk_flush_size: DEFAULT_BULK_FLUSH_SIZE,
        })
    }

    pub fn with_bulk_flush_size(mut self, size: usize) -> Self {
        self.bulk_flush_size = size.max(1);
        self
    }

    fn report(&self, trace: &Trace) {
        for observer in &self.observers {
            observer.observe(trace);
        }
    }

    /// Run one import
    ///
    /// Finding no eligible file is a successful [`ImportOutcome::NoFile`].
    #[instrument(skip_all, fields(source_id = self.options.source_id, step_type_id = self.options.step_type_id))]
    pub async fn execute(&self) -> StepResult<ImportOutcome> {
        let mut trace = Trace::new("Execute Importer Step")
            .with_field("source_id", self.options.source_id)
            .with_field("step_type_id", self.options.step_type_id)
            .with_field(
                "input_folder",
                self.options.input_folder.to_string_lossy().into_owned(),
            );

        let result = match self.run(&mut trace).await {
            Err(err) if err.is_benign() => {
                info!("{}", err);
                Ok(ImportOutcome::NoFile)
            },
            other => other,
        };

        if let Err(err) = &result {
            trace.fail(err);
        }
        self.report(&trace);

        result
    }

    async fn run(&self, trace: &mut Trace) -> StepResult<ImportOutcome> {
        let step_type = self.resolve_step_type().await?;

        let eligible = self.steps.fetch_next_eligible_file(&step_type).await?;
        trace.set_field("file_id", eligible.file.id);
        trace.set_field("file_name", eligible.file.name.clone());

        let collection_job_id = eligible.previous_step.collection_job_id;
        let mut step = self.start_step(&step_type, collection_job_id).await?;
        trace.set_field("step_id", step.id);
        trace.set_field("collection_job_id", collection_job_id);

        let summary = match self.import_records(eligible.reader).await {
            Ok(summary) => summary,
            Err(err) => {
                if let Err(update_err) = self.steps.fail_step(&mut step, &err).await {
                    warn!(step_id = step.id, error = %update_err, "Failed to mark step as ERROR");
                }
                return Err(err);
            },
        };
        trace.set_field("batches", summary.batches);
        trace.set_field("rows", summary.rows);

        let file_id = eligible.previous_step.file_id.unwrap_or(eligible.file.id);
        if let Err(err) = self.steps.finish_step_with_existing_file(&mut step, file_id).await {
            return Err(match self.steps.fail_step(&mut step, &err).await {
                Ok(()) => err,
                Err(update_err) => {
                    error!(step_id = step.id, error = %err, "Step left unfinished after failed finalization");
                    update_err
                },
            });
        }

        info!(
            step_id = step.id,
            file_id,
            batches = summary.batches,
            rows = summary.rows,
            "Import step finished"
        );

        Ok(ImportOutcome::Imported {
            step_id: step.id,
            file_id,
            batches: summary.batches,
            rows: summary.rows,
        })
    }

    async fn resolve_step_type(&self) -> StepResult<StepType> {
        let step_type = self.store.fetch_step_type(self.options.step_type_id).await?;
        if step_type.source_id != self.options.source_id {
            return Err(StepError::InvalidStepType {
                step_type_id: step_type.id,
                expected_source_id: self.options.source_id,
                actual_source_id: step_type.source_id,
            });
        }
        Ok(step_type)
    }

    /// Restart the unfinished step of this collection job or create a new one
    #[instrument(skip_all, fields(step_type_id = step_type.id, collection_job_id = collection_job_id))]
    async fn start_step(&self, step_type: &StepType, collection_job_id: i64) -> StepResult<Step> {
        match self
            .store
            .fetch_unfinished_step(step_type.source_id, step_type.id, &self.options.user)
            .await
        {
            Ok(mut step) if step.collection_job_id == collection_job_id => {
                info!(
                    step_id = step.id,
                    previous_status = %format!("{} : {}", step.status, step.error),
                    "An unfinished import step will be restarted"
                );
                self.steps.restart_step(&mut step).await?;
                return Ok(step);
            },
            Ok(step) => {
                debug!(
                    step_id = step.id,
                    step_collection_job_id = step.collection_job_id,
                    "Unfinished step belongs to another collection job"
                );
            },
            Err(err) if err.is_not_found() => {},
            Err(err) => return Err(err.into()),
        }

        self.create_step(step_type, collection_job_id).await
    }

    /// Create the step and point the collection job at its type, atomically
    async fn create_step(&self, step_type: &StepType, collection_job_id: i64) -> StepResult<Step> {
        let user = &self.options.user;
        let mut tx = self.store.begin().await?;

        let result: StepResult<i64> = async {
            let step_id = self
                .store
                .create_step(&mut tx, step_type.id, collection_job_id, user)
                .await?;

            let mut job = self.store.fetch_collection_job(collection_job_id).await?;
            job.current_step_type_id = step_type.id;
            self.store.update_collection_job(&mut tx, &job, user).await?;

            Ok(step_id)
        }
        .await;

        let step_id = commit_or_rollback(tx, result).await?;
        info!(step_id, collection_job_id, "New import step created");

        Ok(self.store.fetch_step(step_id).await?)
    }

    async fn import_records<R>(&self, reader: R) -> StepResult<ImportSummary>
    where
        R: AsyncRead + Unpin + Send,
    {
        let mut records = AsyncReaderBuilder::new()
            .has_headers(false)
            .create_reader(reader);
        let mut record = StringRecord::new();
        let mut batch: Vec<Vec<String>> = Vec::with_capacity(self.bulk_flush_size);
        let mut summary = ImportSummary::default();
        let mut record_number = 0u64;

        while records.read_record(&mut record).await? {
            record_number += 1;
            let row = self
                .vendor
                .map_record(|i| record.get(i), record_number, &self.options.user)?;
            batch.push(row);

            if batch.len() == self.bulk_flush_size {
                self.flush(&mut batch, &mut summary).await?;
            }
        }

        if !batch.is_empty() {
            self.flush(&mut batch, &mut summary).await?;
        }

        Ok(summary)
    }

    async fn flush(&self, batch: &mut Vec<Vec<String>>, summary: &mut ImportSummary) -> StepResult<()> {
        self.store
            .bulk_insert(&self.vendor.sql_base, &self.vendor.sql_values, batch)
            .await?;

        summary.batches += 1;
        summary.rows += batch.len() as u64;
        debug!(rows = batch.len(), total_rows = summary.rows, "Batch inserted");
        batch.clear();
        Ok(())
    }
}

#[async_trait]
impl<S: BillingStore> ImportRunner for ImporterStep<S> {
    async fn run_import(&self) -> StepResult<ImportOutcome> {
        self.execute().await
    }
}
