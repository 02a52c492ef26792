use thiserror::Error;

use crate::{RegistryId, Version};

/// Errors that can occur when reading from or appending to the audit log.
#[derive(Debug, Error)]
pub enum AuditLogError {
    /// Another writer appended to the registry since it was loaded.
    #[error(
        "Concurrency conflict for registry {registry_id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        registry_id: RegistryId,
        expected: Version,
        actual: Version,
    },

    /// The batch handed to `append` is empty or internally inconsistent.
    #[error("Invalid append batch: {0}")]
    InvalidBatch(String),

    /// A record was built without one of its required fields.
    #[error("Incomplete audit record: missing {0}")]
    IncompleteRecord(&'static str),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for audit log operations.
pub type Result<T> = std::result::Result<T, AuditLogError>;
