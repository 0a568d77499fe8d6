//! Step state transitions and input file selection

use thiserror::Error;

use crate::db::DbError;

pub mod options;
pub mod service;

pub use options::StepOptions;
pub use service::{EligibleFile, StepService};

pub type StepResult<T> = std::result::Result<T, StepError>;

#[derive(Error, Debug)]
pub enum StepError {
    /// Nothing in the input folder is ready for this step
    #[error("There is no file available for the step")]
    NoFileToTransform,

    #[error("Step type {step_type_id} belongs to source {actual_source_id}, not {expected_source_id}")]
    InvalidStepType {
        step_type_id: i64,
        expected_source_id: i64,
        actual_source_id: i64,
    },

    /// A step cannot be failed without a reason
    #[error("Invalid error to update the step: the reason must not be empty")]
    NilError,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Record {record} has no column {index}")]
    MissingColumn { record: u64, index: usize },

    #[error(transparent)]
    Db(#[from] DbError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv_async::Error),

    #[error(transparent)]
    File(#[from] usage_common::UsageError),
}

impl StepError {
    /// Expected outcomes that must not be logged or counted as errors
    pub fn is_benign(&self) -> bool {
        matches!(self, Self::NoFileToTransform)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Db(err) if err.is_not_found())
    }
}
