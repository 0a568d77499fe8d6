//! Usage Importer
//!
//! Runs the IMPORT step of the usage collection pipeline.
//!
//! # Overview
//!
//! A collection job moves a vendor's usage data through ordered steps
//! (download, summarize, translate, import, archive). Each step consumes the
//! file produced by the previous one and records its progress in the billing
//! database. This service:
//!
//! - picks the oldest file in the input folder that the import step has not
//!   consumed yet
//! - starts a new import step, or restarts the unfinished one of the same job
//! - bulk-inserts the file's records into the vendor usage table
//! - finishes the step with the input file, or marks it as ERROR
//!
//! # Modules
//!
//! - [`db`]: billing database models, repository traits and the PostgreSQL
//!   store
//! - [`steps`]: step state transitions and eligible file selection
//! - [`importer`]: the import engine and the vendor mapping file
//! - [`gate`], [`routes`]: single-flight HTTP trigger
//! - [`health`], [`metrics`]: background health checks and counters

pub mod config;
pub mod db;
pub mod error;
pub mod gate;
pub mod health;
pub mod importer;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod steps;

pub use error::AppError;
