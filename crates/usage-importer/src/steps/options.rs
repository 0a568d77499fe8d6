use std::path::PathBuf;

use super::{StepError, StepResult};
use crate::config::ImporterConfig;

/// Settings shared by the step service and the importer engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOptions {
    pub source_id: i64,
    pub step_type_id: i64,
    pub input_folder: PathBuf,
    pub user: String,
}

impl StepOptions {
    pub fn validate(&self) -> StepResult<()> {
        if self.user.trim().is_empty() {
            return Err(StepError::Validation("user must not be empty".to_string()));
        }
        if self.input_folder.as_os_str().is_empty() {
            return Err(StepError::Validation("input folder must not be empty".to_string()));
        }
        if self.source_id < 1 {
            return Err(StepError::Validation(format!(
                "source id must be positive, got {}",
                self.source_id
            )));
        }
        Ok(())
    }
}

impl From<&ImporterConfig> for StepOptions {
    fn from(config: &ImporterConfig) -> Self {
        Self {
            source_id: config.source_id,
            step_type_id: config.step_type_id,
            input_folder: config.input_folder.clone(),
            user: config.user.clone(),
        }
    }
}
