//! HTTP-facing errors

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::health::HealthSnapshot;

#[derive(Error, Debug)]
pub enum AppError {
    /// A run is already in progress
    #[error("Server is busy. Try again later")]
    Busy,

    #[error("Billing database is unhealthy")]
    Unhealthy(Box<HealthSnapshot>),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Busy => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "message": self.to_string() })),
            )
                .into_response(),
            AppError::Unhealthy(snapshot) => {
                tracing::warn!(checked_at = ?snapshot.checked_at, "Reporting unhealthy status");
                (StatusCode::SERVICE_UNAVAILABLE, Json(*snapshot)).into_response()
            },
        }
    }
}
