use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    AuditLogError, AuditQuery, AuditRecord, RegistryId, Result, StateSnapshot, Version,
    store::{AppendOptions, AuditLog, RecordStream, validate_batch},
};

/// Audit log held entirely in memory.
///
/// Used by tests and by the server when no database is configured. Clones
/// share the same underlying storage.
#[derive(Clone, Default)]
pub struct InMemoryAuditLog {
    records: Arc<RwLock<Vec<AuditRecord>>>,
    snapshots: Arc<RwLock<HashMap<RegistryId, StateSnapshot>>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of records across all registries.
    pub async fn record_count(&self) -> usize {
        self.records.read().await.len()
    }

    /// Number of stored snapshots.
    pub async fn snapshot_count(&self) -> usize {
        self.snapshots.read().await.len()
    }

    fn current_version(records: &[AuditRecord], registry_id: RegistryId) -> Version {
        records
            .iter()
            .filter(|r| r.registry_id == registry_id)
            .map(|r| r.version)
            .max()
            .unwrap_or(Version::initial())
    }
}

#[async_trait]
impl AuditLog for InMemoryAuditLog {
    async fn append(&self, records: Vec<AuditRecord>, options: AppendOptions) -> Result<Version> {
        validate_batch(&records)?;

        let registry_id = records[0].registry_id;
        let first_version = records[0].version;

        let mut store = self.records.write().await;
        let current = Self::current_version(&store, registry_id);

        if let Some(expected) = options.expected_version
            && current != expected
        {
            return Err(AuditLogError::ConcurrencyConflict {
                registry_id,
                expected,
                actual: current,
            });
        }

        // Same rule the unique (registry_id, version) index enforces in Postgres.
        if first_version != current.next() {
            return Err(AuditLogError::ConcurrencyConflict {
                registry_id,
                expected: options.expected_version.unwrap_or(current),
                actual: current,
            });
        }

        let last_version = records.last().map(|r| r.version).unwrap_or(current);
        store.extend(records);

        tracing::debug!(%registry_id, version = %last_version, "appended audit records");
        Ok(last_version)
    }

    async fn records_for_registry(&self, registry_id: RegistryId) -> Result<Vec<AuditRecord>> {
        let store = self.records.read().await;
        let mut records: Vec<_> = store
            .iter()
            .filter(|r| r.registry_id == registry_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.version);
        Ok(records)
    }

    async fn records_from_version(
        &self,
        registry_id: RegistryId,
        from_version: Version,
    ) -> Result<Vec<AuditRecord>> {
        let store = self.records.read().await;
        let mut records: Vec<_> = store
            .iter()
            .filter(|r| r.registry_id == registry_id && r.version >= from_version)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.version);
        Ok(records)
    }

    async fn query(&self, query: AuditQuery) -> Result<Vec<AuditRecord>> {
        let store = self.records.read().await;
        let mut records: Vec<_> = store.iter().filter(|r| query.matches(r)).cloned().collect();

        records.sort_by(|a, b| {
            a.recorded_at
                .cmp(&b.recorded_at)
                .then(a.version.cmp(&b.version))
        });

        let records = records
            .into_iter()
            .skip(query.offset.unwrap_or(0))
            .take(query.limit.unwrap_or(usize::MAX))
            .collect();

        Ok(records)
    }

    async fn records_by_type(&self, event_type: &str) -> Result<Vec<AuditRecord>> {
        let store = self.records.read().await;
        Ok(store
            .iter()
            .filter(|r| r.event_type == event_type)
            .cloned()
            .collect())
    }

    async fn stream_all(&self) -> Result<RecordStream> {
        use futures_util::stream;

        let records = self.records.read().await.clone();
        Ok(Box::pin(stream::iter(records.into_iter().map(Ok))))
    }

    async fn registry_version(&self, registry_id: RegistryId) -> Result<Option<Version>> {
        let store = self.records.read().await;
        Ok(store
            .iter()
            .filter(|r| r.registry_id == registry_id)
            .map(|r| r.version)
            .max())
    }

    async fn save_snapshot(&self, snapshot: StateSnapshot) -> Result<()> {
        self.snapshots
            .write()
            .await
            .insert(snapshot.registry_id, snapshot);
        Ok(())
    }

    async fn latest_snapshot(&self, registry_id: RegistryId) -> Result<Option<StateSnapshot>> {
        Ok(self.snapshots.read().await.get(&registry_id).cloned())
    }
}
