//! API error types with HTTP response mapping.

use audit_log::AuditLogError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use projections::ProjectionError;
use registry::{DomainError, RegistryError};

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// No usable caller identity on the request.
    Unauthenticated(String),
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Domain logic error.
    Domain(DomainError),
    /// Read model could not be brought up to date.
    Projection(ProjectionError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthenticated(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Domain(err) => domain_error_to_response(err),
            ApiError::Projection(err) => {
                tracing::error!(error = %err, "projection catch-up failed");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, String) {
    let status = match &err {
        DomainError::Registry(registry_err) => match registry_err {
            RegistryError::Unauthorized { .. } | RegistryError::NotOwner { .. } => {
                StatusCode::FORBIDDEN
            }
            RegistryError::InvalidIdentity { .. } => StatusCode::BAD_REQUEST,
            RegistryError::ReentrantTransfer { .. } | RegistryError::AlreadyCreated => {
                StatusCode::CONFLICT
            }
            RegistryError::NotCreated => StatusCode::NOT_FOUND,
        },
        DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
        DomainError::AuditLog(AuditLogError::ConcurrencyConflict { .. }) => StatusCode::CONFLICT,
        _ => {
            tracing::error!(error = %err, "internal server error");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    (status, err.to_string())
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<ProjectionError> for ApiError {
    fn from(err: ProjectionError) -> Self {
        ApiError::Projection(err)
    }
}

impl From<AuditLogError> for ApiError {
    fn from(err: AuditLogError) -> Self {
        ApiError::Domain(DomainError::AuditLog(err))
    }
}
