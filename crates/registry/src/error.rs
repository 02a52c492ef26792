//! Domain error types.

use audit_log::{AuditLogError, RegistryId};
use thiserror::Error;

use crate::registry::RegistryError;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Audit log error: {0}")]
    AuditLog(#[from] AuditLogError),

    /// A registry rule rejected the command.
    #[error("{0}")]
    Registry(#[from] RegistryError),

    #[error("Registry not found: {registry_id}")]
    NotFound { registry_id: RegistryId },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DomainError {
    /// Returns the registry rule violation, if that is what this is.
    pub fn as_registry_error(&self) -> Option<&RegistryError> {
        match self {
            DomainError::Registry(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(
            self,
            DomainError::AuditLog(AuditLogError::ConcurrencyConflict { .. })
        )
    }
}
