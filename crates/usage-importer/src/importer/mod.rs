//! Usage file import

pub mod engine;
pub mod observer;
pub mod vendor;

pub use engine::{ImportOutcome, ImportRunner, ImporterStep, DEFAULT_BULK_FLUSH_SIZE};
pub use observer::{ExecutionObserver, LogObserver, MetricsObserver, Trace};
pub use vendor::{ColumnMapper, VendorMapper};
