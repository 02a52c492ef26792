//! Projection error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("Audit log error: {0}")]
    AuditLog(#[from] audit_log::AuditLogError),

    /// A record payload did not decode into a registry event.
    #[error("Event deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    #[error("Projection error: {0}")]
    Projection(String),
}

pub type Result<T> = std::result::Result<T, ProjectionError>;
