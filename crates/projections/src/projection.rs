//! Projection trait and position tracking.

use std::collections::HashMap;

use async_trait::async_trait;
use audit_log::{AuditRecord, RegistryId, Version};

use crate::Result;

/// Last version a projection has seen for each registry.
///
/// Versions within one registry are committed in order, so a record is
/// covered exactly when its version is at or below the registry's entry.
/// Records of different registries may surface in the log out of commit
/// order, which is why no single log index is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectionPosition {
    versions: HashMap<RegistryId, Version>,
    records_seen: u64,
}

impl ProjectionPosition {
    pub fn zero() -> Self {
        Self::default()
    }

    /// Whether `record` has already been folded in.
    pub fn covers(&self, record: &AuditRecord) -> bool {
        record.version <= self.version_of(record.registry_id)
    }

    /// Marks `record` as seen. Covered records leave the position unchanged.
    pub fn advance(&mut self, record: &AuditRecord) {
        if self.covers(record) {
            return;
        }
        self.versions.insert(record.registry_id, record.version);
        self.records_seen += 1;
    }

    pub fn version_of(&self, registry_id: RegistryId) -> Version {
        self.versions
            .get(&registry_id)
            .copied()
            .unwrap_or_else(Version::initial)
    }

    pub fn records_seen(&self) -> u64 {
        self.records_seen
    }
}

impl std::fmt::Display for ProjectionPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "position({} records, {} registries)",
            self.records_seen,
            self.versions.len()
        )
    }
}

/// Folds audit records into a read model.
///
/// Every record advances the position, including records the projection
/// ignores, so catch-up can tell which records are still to be delivered.
#[async_trait]
pub trait Projection: Send + Sync {
    fn name(&self) -> &'static str;

    async fn handle(&self, record: &AuditRecord) -> Result<()>;

    async fn position(&self) -> ProjectionPosition;

    /// Clears the read model and rewinds to position zero.
    async fn reset(&self) -> Result<()>;
}
