//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// Server Configuration Constants
// ============================================================================

/// Default server host binding.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_SERVER_PORT: u16 = 8080;

/// Default shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Database Configuration Constants
// ============================================================================

pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

pub const DEFAULT_DATABASE_MIN_CONNECTIONS: u32 = 1;

pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default database idle timeout in seconds (10 minutes).
pub const DEFAULT_DATABASE_IDLE_TIMEOUT_SECS: u64 = 600;

// ============================================================================
// Importer Configuration Constants
// ============================================================================

/// Folder scanned for files produced by the previous step.
pub const DEFAULT_INPUT_FOLDER: &str = "transforms";

pub const DEFAULT_VENDOR_MAPPER_PATH: &str = "config/vendor-mapper.yml";

/// Seconds between two billing database health checks.
pub const DEFAULT_HEALTH_CHECK_INTERVAL_SECS: u64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub importer: ImporterConfig,
    pub health_check_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

/// What this importer instance processes and on whose behalf
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImporterConfig {
    pub input_folder: PathBuf,
    pub source_id: i64,
    pub step_type_id: i64,
    pub user: String,
    pub vendor_mapper_path: PathBuf,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from `.env`, the environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            server: ServerConfig {
                host: std::env::var("IMPORTER_HOST")
                    .unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string()),
                port: env_or("IMPORTER_PORT", DEFAULT_SERVER_PORT),
                shutdown_timeout_secs: env_or(
                    "IMPORTER_SHUTDOWN_TIMEOUT",
                    DEFAULT_SHUTDOWN_TIMEOUT_SECS,
                ),
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL").unwrap_or_default(),
                max_connections: env_or("DATABASE_MAX_CONNECTIONS", DEFAULT_DATABASE_MAX_CONNECTIONS),
                min_connections: env_or("DATABASE_MIN_CONNECTIONS", DEFAULT_DATABASE_MIN_CONNECTIONS),
                connect_timeout_secs: env_or(
                    "DATABASE_CONNECT_TIMEOUT",
                    DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                ),
                idle_timeout_secs: env_or("DATABASE_IDLE_TIMEOUT", DEFAULT_DATABASE_IDLE_TIMEOUT_SECS),
            },
            importer: ImporterConfig {
                input_folder: std::env::var("INPUT_FOLDER")
                    .unwrap_or_else(|_| DEFAULT_INPUT_FOLDER.to_string())
                    .into(),
                source_id: env_or("SOURCE_ID", 0),
                step_type_id: env_or("STEPTYPE_ID", 0),
                user: std::env::var("IMPORTER_USER")
                    .or_else(|_| std::env::var("USER"))
                    .unwrap_or_default(),
                vendor_mapper_path: std::env::var("VENDOR_MAPPER_PATH")
                    .unwrap_or_else(|_| DEFAULT_VENDOR_MAPPER_PATH.to_string())
                    .into(),
            },
            health_check_interval_secs: env_or(
                "HEALTH_CHECK_INTERVAL",
                DEFAULT_HEALTH_CHECK_INTERVAL_SECS,
            ),
        };

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port must be greater than 0");
        }

        if self.database.url.is_empty() {
            anyhow::bail!("DATABASE_URL must be set");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("Database max_connections must be greater than 0");
        }

        if self.database.min_connections > self.database.max_connections {
            anyhow::bail!(
                "Database min_connections ({}) cannot be greater than max_connections ({})",
                self.database.min_connections,
                self.database.max_connections
            );
        }

        if self.health_check_interval_secs == 0 {
            anyhow::bail!("HEALTH_CHECK_INTERVAL must be greater than 0");
        }

        // Importer options are validated when the step service is built
        if self.importer.source_id < 1 {
            tracing::warn!(source_id = self.importer.source_id, "SOURCE_ID is not set");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: DEFAULT_SERVER_HOST.to_string(),
                port: DEFAULT_SERVER_PORT,
                shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            },
            database: DatabaseConfig {
                url: String::new(),
                max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
                min_connections: DEFAULT_DATABASE_MIN_CONNECTIONS,
                connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                idle_timeout_secs: DEFAULT_DATABASE_IDLE_TIMEOUT_SECS,
            },
            importer: ImporterConfig {
                input_folder: PathBuf::from(DEFAULT_INPUT_FOLDER),
                source_id: 0,
                step_type_id: 0,
                user: String::new(),
                vendor_mapper_path: PathBuf::from(DEFAULT_VENDOR_MAPPER_PATH),
            },
            health_check_interval_secs: DEFAULT_HEALTH_CHECK_INTERVAL_SECS,
        }
    }
}
