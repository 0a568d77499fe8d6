//! HTTP endpoints

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::gate::RunGate;
use crate::health::{HealthMonitor, HealthSnapshot};
use crate::importer::{ImportOutcome, ImportRunner};
use crate::metrics::Metrics;
use crate::middleware;

pub const ENQUEUED_MESSAGE: &str = "Import Step request enqueued";

/// Shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub runner: Arc<dyn ImportRunner>,
    pub gate: RunGate,
    pub metrics: Arc<Metrics>,
    pub health: HealthMonitor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/start-job", get(start_job))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .with_state(state)
        .layer(middleware::tracing_layer())
}

async fn root() -> impl IntoResponse {
    Json(json!({
        "name": "usage-importer",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
    }))
}

/// Start an import in the background
///
/// The response only says whether the run was accepted; its outcome shows up
/// in logs and metrics.
async fn start_job(State(state): State<AppState>) -> Result<Json<MessageResponse>, AppError> {
    let Some(permit) = state.gate.try_acquire() else {
        state.metrics.record_busy_rejection();
        warn!("Import request rejected, a run is in progress");
        return Err(AppError::Busy);
    };

    state.metrics.record_run_started();
    let runner = state.runner.clone();
    let metrics = state.metrics.clone();

    tokio::spawn(async move {
        let _permit = permit;
        let started = Instant::now();

        match runner.run_import().await {
            Ok(ImportOutcome::NoFile) => metrics.record_run_skipped(started.elapsed()),
            Ok(outcome) => {
                info!(?outcome, "Import run completed");
                metrics.record_run_finished(started.elapsed());
            },
            // The execution trace already logged the failure
            Err(err) => {
                debug!(error = %err, "Import run failed");
                metrics.record_run_failed(started.elapsed());
            },
        }
    });

    Ok(Json(MessageResponse {
        message: ENQUEUED_MESSAGE.to_string(),
    }))
}

async fn health(State(state): State<AppState>) -> Result<Json<HealthSnapshot>, AppError> {
    let snapshot = state.health.snapshot().await;
    if snapshot.is_healthy() {
        Ok(Json(snapshot))
    } else {
        Err(AppError::Unhealthy(Box::new(snapshot)))
    }
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.to_prometheus(),
    )
}
