//! Usage Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared helpers for the usage collection services.
//!
//! # Overview
//!
//! - **Error Handling**: [`UsageError`] and the [`Result`] alias
//! - **Checksums**: truncated SHA-256 content hashes used as file dedup keys
//! - **Files**: folder listing, file comparison and file creation from a stream
//! - **Logging**: `tracing` subscriber setup driven by `LOG_*` variables
//!
//! # Example
//!
//! ```no_run
//! use usage_common::checksum;
//!
//! fn main() -> usage_common::Result<()> {
//!     let sum = checksum::file_checksum("transforms/usage-2024-01.csv")?;
//!     assert_eq!(sum.len(), 32);
//!     Ok(())
//! }
//! ```

pub mod checksum;
pub mod error;
pub mod files;
pub mod logging;
pub mod types;

pub use error::{Result, UsageError};
pub use types::{FileFormat, FileMeta, FileNaming};
