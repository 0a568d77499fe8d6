//! Billing database access
//!
//! The pipeline state (collection jobs, steps, files and the step type
//! reference table) lives in the billing database. Access goes through the
//! repository traits in [`repository`]; [`postgres`] is the production
//! backend. Tests run against an in-process store with the same semantics.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use thiserror::Error;

#[cfg(test)]
pub mod memory;
pub mod models;
pub mod postgres;
pub mod repository;

#[cfg(test)]
pub use memory::{FaultPoint, MemoryBillingStore};
pub use models::{CollectionJob, File, JobStatus, Step, StepStatus, StepType, StepTypeName};
pub use postgres::PgBillingStore;
pub use repository::{
    commit_or_rollback, BillingStore, CollectionJobRepository, FileRepository, StepRepository,
    StepTypeRepository, TransactionalStore, UnitOfWork,
};

/// Database operation errors
#[derive(Error, Debug)]
pub enum DbError {
    /// SQL query or connection error
    #[error("Database query failed: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Database configuration error: {0}. Check DATABASE_URL and connection settings.")]
    Config(String),

    /// No row matched; callers decide whether that is expected
    #[error("{0}")]
    NotFound(String),

    /// Backend failure that did not come from the SQL driver
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid input: {0}")]
    Validation(String),
}

impl DbError {
    pub fn not_found(resource_type: &str, identifier: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{} '{}' not found in database", resource_type, identifier))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Sqlx(sqlx::Error::RowNotFound))
    }
}

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: Option<u64>,
}

impl From<&crate::config::DatabaseConfig> for DbConfig {
    fn from(config: &crate::config::DatabaseConfig) -> Self {
        Self {
            url: config.url.clone(),
            max_connections: config.max_connections,
            min_connections: config.min_connections,
            connect_timeout_secs: config.connect_timeout_secs,
            idle_timeout_secs: Some(config.idle_timeout_secs),
        }
    }
}

pub async fn create_pool(config: &DbConfig) -> DbResult<PgPool> {
    if config.url.is_empty() {
        return Err(DbError::Config("DATABASE_URL not set".to_string()));
    }

    let mut options = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs));

    if let Some(idle_timeout) = config.idle_timeout_secs {
        options = options.idle_timeout(Duration::from_secs(idle_timeout));
    }

    let pool = options.connect(&config.url).await?;

    tracing::info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Database connection pool created"
    );

    Ok(pool)
}
