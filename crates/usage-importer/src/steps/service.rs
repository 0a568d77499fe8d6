//! Step service
//!
//! Every transition runs in its own unit of work. The caller's step is only
//! replaced once the write has been committed, so on any error it still holds
//! the values it had before the call.

use chrono::Utc;
use std::fmt::Display;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use usage_common::{checksum, files, FileMeta};

use super::{StepError, StepOptions, StepResult};
use crate::db::{commit_or_rollback, BillingStore, File, Step, StepStatus, StepType};

/// Oldest input file that the next step has not consumed yet
#[derive(Debug)]
pub struct EligibleFile {
    pub reader: tokio::fs::File,
    pub path: PathBuf,
    /// Tracked row of the file
    pub file: File,
    /// Step that produced the file
    pub previous_step: Step,
}

pub struct StepService<S> {
    store: Arc<S>,
    options: StepOptions,
}

async fn run_blocking<T, F>(task: F) -> StepResult<T>
where
    F: FnOnce() -> usage_common::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| StepError::Io(std::io::Error::other(e)))?
        .map_err(StepError::from)
}

fn finished(step: &Step, file_id: i64) -> Step {
    Step {
        file_id: Some(file_id),
        status: StepStatus::Finished,
        error: String::new(),
        end_date: Some(Utc::now()),
        ..step.clone()
    }
}

impl<S: BillingStore> StepService<S> {
    pub fn new(store: Arc<S>, options: StepOptions) -> StepResult<Self> {
        options.validate()?;
        Ok(Self { store, options })
    }

    pub fn options(&self) -> &StepOptions {
        &self.options
    }

    async fn persist(&self, step: &Step) -> StepResult<()> {
        let mut tx = self.store.begin().await?;
        let result = self
            .store
            .update_step(&mut tx, step, &self.options.user)
            .await
            .map_err(StepError::from);
        commit_or_rollback(tx, result).await
    }

    /// Reset the step to IN PROGRESS with no file, no error and a fresh start time
    #[instrument(skip_all, fields(step_id = step.id, previous_status = %step.status))]
    pub async fn restart_step(&self, step: &mut Step) -> StepResult<()> {
        let restarted = Step {
            status: StepStatus::InProgress,
            error: String::new(),
            file_id: None,
            start_date: Utc::now(),
            end_date: None,
            ..step.clone()
        };

        self.persist(&restarted).await?;
        *step = restarted;
        debug!("Step restarted");
        Ok(())
    }

    /// Finish the step with the file described by `meta`
    ///
    /// A file row with the same checksum is reused; otherwise a new one is
    /// created in the same unit of work as the step update.
    #[instrument(skip_all, fields(step_id = step.id, checksum = %meta.checksum))]
    pub async fn finish_step_with_new_file(&self, step: &mut Step, meta: &FileMeta) -> StepResult<File> {
        let user = &self.options.user;
        let mut tx = self.store.begin().await?;

        let outcome: StepResult<(Step, Option<File>)> = async {
            let existing = match self.store.fetch_file_by_checksum(&meta.checksum).await {
                Ok(file) => Some(file),
                Err(err) if err.is_not_found() => None,
                Err(err) => return Err(err.into()),
            };

            let file_id = match &existing {
                Some(file) => file.id,
                None => {
                    self.store
                        .create_file(
                            &mut tx,
                            &meta.checksum,
                            &meta.file_name,
                            &meta.file_path.to_string_lossy(),
                            user,
                        )
                        .await?
                },
            };

            let updated = finished(step, file_id);
            self.store.update_step(&mut tx, &updated, user).await?;
            Ok((updated, existing))
        }
        .await;

        let (updated, existing) = commit_or_rollback(tx, outcome).await?;
        let file_id = updated.file_id.unwrap_or_default();
        *step = updated;

        // A new row is only readable once committed
        let file = match existing {
            Some(file) if file.id >= 1 => file,
            _ => self.store.fetch_file(file_id).await?,
        };

        debug!(file_id = file.id, "Step finished with file");
        Ok(file)
    }

    #[instrument(skip_all, fields(step_id = step.id, file_id = file_id))]
    pub async fn finish_step_with_existing_file(&self, step: &mut Step, file_id: i64) -> StepResult<()> {
        let updated = finished(step, file_id);
        self.persist(&updated).await?;
        *step = updated;
        debug!("Step finished");
        Ok(())
    }

    /// Mark the step as ERROR with `reason` as its message
    #[instrument(skip_all, fields(step_id = step.id))]
    pub async fn fail_step(&self, step: &mut Step, reason: &(dyn Display + Sync)) -> StepResult<()> {
        let message = reason.to_string();
        if message.trim().is_empty() {
            return Err(StepError::NilError);
        }

        let failed = Step {
            status: StepStatus::Error,
            error: message,
            end_date: Some(Utc::now()),
            ..step.clone()
        };

        self.persist(&failed).await?;
        *step = failed;
        debug!("Step marked as failed");
        Ok(())
    }

    /// Pick the oldest file in the input folder that `step_type` has not consumed
    ///
    /// Files without a tracked row, or whose producing step already has a
    /// finished successor of `step_type`, are skipped.
    #[instrument(skip_all, fields(step_type_id = step_type.id, input_folder = %self.options.input_folder.display()))]
    pub async fn fetch_next_eligible_file(&self, step_type: &StepType) -> StepResult<EligibleFile> {
        let folder = self.options.input_folder.clone();
        let mut entries = run_blocking(move || files::list_files_in_folder(&folder)).await?;
        entries.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.name.cmp(&b.name)));

        info!(files = entries.len(), "Scanning input folder");

        for entry in entries {
            let path = entry.path.clone();
            let checksum = run_blocking(move || checksum::file_checksum(&path)).await?;

            let file = match self.store.fetch_file_by_checksum(&checksum).await {
                Ok(file) => file,
                Err(err) if err.is_not_found() => {
                    debug!(file = %entry.name, "Skipping untracked file");
                    continue;
                },
                Err(err) => return Err(err.into()),
            };

            let previous_step = match self
                .store
                .fetch_step_by_file_with_no_next_step(file.id, step_type.id, &self.options.user)
                .await
            {
                Ok(step) => step,
                Err(err) if err.is_not_found() => {
                    debug!(file = %entry.name, file_id = file.id, "Skipping consumed file");
                    continue;
                },
                Err(err) => return Err(err.into()),
            };

            info!(
                previous_step_id = previous_step.id,
                previous_step_type_id = previous_step.step_type_id,
                file_id = file.id,
                file_checksum = %file.checksum,
                file_name = %file.name,
                "File eligible for processing"
            );

            let reader = tokio::fs::File::open(&entry.path).await?;
            return Ok(EligibleFile {
                reader,
                path: entry.path,
                file,
                previous_step,
            });
        }

        Err(StepError::NoFileToTransform)
    }
}
