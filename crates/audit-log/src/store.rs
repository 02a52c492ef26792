use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::{AuditLogError, AuditQuery, AuditRecord, RegistryId, Result, StateSnapshot, Version};

/// Options for appending records.
#[derive(Debug, Clone, Default)]
pub struct AppendOptions {
    /// Version the registry must be at before the append.
    /// `None` skips the check.
    pub expected_version: Option<Version>,
}

impl AppendOptions {
    /// No version check.
    pub fn new() -> Self {
        Self::default()
    }

    /// Require the registry to be at `version`.
    pub fn expect_version(version: Version) -> Self {
        Self {
            expected_version: Some(version),
        }
    }

    /// Require the registry to have no records yet.
    pub fn expect_new() -> Self {
        Self {
            expected_version: Some(Version::initial()),
        }
    }
}

/// A stream of audit records.
pub type RecordStream = Pin<Box<dyn Stream<Item = Result<AuditRecord>> + Send>>;

/// Storage backend for audit records and registry snapshots.
///
/// Records are immutable once appended. Implementations must be thread-safe.
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Appends a batch of records atomically.
    ///
    /// Fails with `ConcurrencyConflict` when `options.expected_version` is
    /// set and does not match the registry's current version. Returns the
    /// registry's version after the append.
    async fn append(&self, records: Vec<AuditRecord>, options: AppendOptions) -> Result<Version>;

    /// All records of a registry, oldest first.
    async fn records_for_registry(&self, registry_id: RegistryId) -> Result<Vec<AuditRecord>>;

    /// Records of a registry with `version >= from_version`, oldest first.
    async fn records_from_version(
        &self,
        registry_id: RegistryId,
        from_version: Version,
    ) -> Result<Vec<AuditRecord>>;

    async fn query(&self, query: AuditQuery) -> Result<Vec<AuditRecord>>;

    async fn records_by_type(&self, event_type: &str) -> Result<Vec<AuditRecord>>;

    /// Streams every record in insertion order.
    async fn stream_all(&self) -> Result<RecordStream>;

    /// Current version of a registry, or `None` if it has no records.
    async fn registry_version(&self, registry_id: RegistryId) -> Result<Option<Version>>;

    /// Stores a snapshot, replacing any earlier one for the same registry.
    async fn save_snapshot(&self, snapshot: StateSnapshot) -> Result<()>;

    async fn latest_snapshot(&self, registry_id: RegistryId) -> Result<Option<StateSnapshot>>;
}

/// Convenience methods available on every audit log.
#[async_trait]
pub trait AuditLogExt: AuditLog {
    async fn append_record(&self, record: AuditRecord, options: AppendOptions) -> Result<Version> {
        self.append(vec![record], options).await
    }

    async fn registry_exists(&self, registry_id: RegistryId) -> Result<bool> {
        Ok(self.registry_version(registry_id).await?.is_some())
    }

    /// Returns the latest snapshot (if any) and the records written after it.
    async fn load_history(
        &self,
        registry_id: RegistryId,
    ) -> Result<(Option<StateSnapshot>, Vec<AuditRecord>)> {
        if let Some(snapshot) = self.latest_snapshot(registry_id).await? {
            let records = self
                .records_from_version(registry_id, snapshot.version.next())
                .await?;
            Ok((Some(snapshot), records))
        } else {
            let records = self.records_for_registry(registry_id).await?;
            Ok((None, records))
        }
    }
}

impl<T: AuditLog + ?Sized> AuditLogExt for T {}

/// Checks that a batch is non-empty, targets one registry and carries
/// contiguous versions.
pub fn validate_batch(records: &[AuditRecord]) -> Result<()> {
    let Some(first) = records.first() else {
        return Err(AuditLogError::InvalidBatch(
            "cannot append an empty batch".to_string(),
        ));
    };

    let mut expected_version = first.version;
    for record in &records[1..] {
        if record.registry_id != first.registry_id {
            return Err(AuditLogError::InvalidBatch(
                "all records must belong to the same registry".to_string(),
            ));
        }
        if record.aggregate_type != first.aggregate_type {
            return Err(AuditLogError::InvalidBatch(
                "all records must share an aggregate type".to_string(),
            ));
        }
        expected_version = expected_version.next();
        if record.version != expected_version {
            return Err(AuditLogError::InvalidBatch(format!(
                "versions must be contiguous: expected {}, got {}",
                expected_version, record.version
            )));
        }
    }

    Ok(())
}
