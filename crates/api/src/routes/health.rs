//! Health check endpoint.

use std::sync::Arc;

use audit_log::AuditLog;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;

use super::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub registry_id: String,

    /// Latest audit log version of the registry; absent when the log
    /// could not be reached.
    pub registry_version: Option<i64>,
}

/// `GET /health`: liveness plus a round trip to the audit log.
pub async fn check<S: AuditLog + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> (StatusCode, Json<HealthResponse>) {
    let registry_id = state.registry_id.to_string();

    match state.log.registry_version(state.registry_id).await {
        Ok(version) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                registry_id,
                registry_version: version.map(|v| v.as_i64()),
            }),
        ),
        Err(e) => {
            tracing::error!(error = %e, "audit log unreachable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "degraded",
                    registry_id,
                    registry_version: None,
                }),
            )
        }
    }
}
