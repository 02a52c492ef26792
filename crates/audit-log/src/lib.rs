//! Append-only audit log for the parcel registry.
//!
//! Every mutating registry operation is recorded here as a typed record.
//! The log is the registry's source for state reconstruction and the feed
//! consumed by projections and external indexers.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod record;
pub mod snapshot;
pub mod store;

pub use common::RegistryId;
pub use error::{AuditLogError, Result};
pub use memory::InMemoryAuditLog;
pub use postgres::PostgresAuditLog;
pub use query::AuditQuery;
pub use record::{AuditRecord, AuditRecordBuilder, RecordId, Version};
pub use snapshot::StateSnapshot;
pub use store::{AppendOptions, AuditLog, AuditLogExt, RecordStream};
