//! Periodic billing database health check
//!
//! The loop publishes a snapshot that `/health` reads; it shares nothing else
//! with import runs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::db::TransactionalStore;

pub const BILLING_DB_DEPENDENCY: &str = "billing_db";

#[derive(Debug, Clone, Serialize)]
pub struct DependencyHealth {
    pub healthy: bool,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub details: HashMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub status: &'static str,
    pub checked_at: Option<DateTime<Utc>>,
    pub dependencies: HashMap<String, DependencyHealth>,
}

impl HealthSnapshot {
    /// State before the first check completes
    pub fn pending() -> Self {
        Self {
            status: "starting",
            checked_at: None,
            dependencies: HashMap::new(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.checked_at.is_some() && self.dependencies.values().all(|d| d.healthy)
    }
}

#[derive(Clone)]
pub struct HealthMonitor {
    snapshot: Arc<RwLock<HealthSnapshot>>,
}

impl Default for HealthMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthMonitor {
    pub fn new() -> Self {
        Self {
            snapshot: Arc::new(RwLock::new(HealthSnapshot::pending())),
        }
    }

    pub async fn snapshot(&self) -> HealthSnapshot {
        self.snapshot.read().await.clone()
    }

    /// Run one check against `store` and publish the result
    pub async fn check<S: TransactionalStore + ?Sized>(&self, store: &S) -> HealthSnapshot {
        let billing_db = match store.check().await {
            Ok(details) => DependencyHealth {
                healthy: true,
                details,
                error: None,
            },
            Err(err) => {
                tracing::warn!(error = %err, "Billing database health check failed");
                DependencyHealth {
                    healthy: false,
                    details: HashMap::new(),
                    error: Some(err.to_string()),
                }
            },
        };

        let healthy = billing_db.healthy;
        let mut dependencies = HashMap::new();
        dependencies.insert(BILLING_DB_DEPENDENCY.to_string(), billing_db);

        let snapshot = HealthSnapshot {
            status: if healthy { "healthy" } else { "unhealthy" },
            checked_at: Some(Utc::now()),
            dependencies,
        };
        *self.snapshot.write().await = snapshot.clone();
        snapshot
    }

    pub fn spawn<S: TransactionalStore + 'static>(&self, store: Arc<S>, interval: Duration) -> JoinHandle<()> {
        let monitor = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                monitor.check(store.as_ref()).await;
            }
        })
    }
}
