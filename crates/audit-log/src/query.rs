use chrono::{DateTime, Utc};

use crate::{AuditRecord, RegistryId, Version};

/// Filter over audit records.
///
/// Unset fields match everything. Results are ordered by version within a
/// registry and by timestamp across registries.
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    pub registry_id: Option<RegistryId>,
    pub aggregate_type: Option<String>,

    /// Matches any of these event types.
    pub event_types: Option<Vec<String>>,

    /// Inclusive.
    pub from_version: Option<Version>,
    /// Inclusive.
    pub to_version: Option<Version>,

    /// Inclusive.
    pub from_timestamp: Option<DateTime<Utc>>,
    /// Inclusive.
    pub to_timestamp: Option<DateTime<Utc>>,

    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl AuditQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records of one registry.
    pub fn for_registry(registry_id: RegistryId) -> Self {
        Self {
            registry_id: Some(registry_id),
            ..Default::default()
        }
    }

    /// All records of one event type.
    pub fn for_event_type(event_type: impl Into<String>) -> Self {
        Self {
            event_types: Some(vec![event_type.into()]),
            ..Default::default()
        }
    }

    pub fn registry_id(mut self, id: RegistryId) -> Self {
        self.registry_id = Some(id);
        self
    }

    pub fn aggregate_type(mut self, aggregate_type: impl Into<String>) -> Self {
        self.aggregate_type = Some(aggregate_type.into());
        self
    }

    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_types = Some(vec![event_type.into()]);
        self
    }

    pub fn event_types(mut self, event_types: Vec<String>) -> Self {
        self.event_types = Some(event_types);
        self
    }

    pub fn from_version(mut self, version: Version) -> Self {
        self.from_version = Some(version);
        self
    }

    pub fn to_version(mut self, version: Version) -> Self {
        self.to_version = Some(version);
        self
    }

    pub fn from_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.from_timestamp = Some(timestamp);
        self
    }

    pub fn to_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.to_timestamp = Some(timestamp);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns true if `record` passes every filter. Paging is not applied.
    pub fn matches(&self, record: &AuditRecord) -> bool {
        if let Some(id) = self.registry_id
            && record.registry_id != id
        {
            return false;
        }
        if let Some(ref aggregate_type) = self.aggregate_type
            && &record.aggregate_type != aggregate_type
        {
            return false;
        }
        if let Some(ref types) = self.event_types
            && !types.contains(&record.event_type)
        {
            return false;
        }
        if let Some(from) = self.from_version
            && record.version < from
        {
            return false;
        }
        if let Some(to) = self.to_version
            && record.version > to
        {
            return false;
        }
        if let Some(from) = self.from_timestamp
            && record.recorded_at < from
        {
            return false;
        }
        if let Some(to) = self.to_timestamp
            && record.recorded_at > to
        {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(registry_id: RegistryId, version: i64, event_type: &str) -> AuditRecord {
        AuditRecord::builder()
            .registry_id(registry_id)
            .aggregate_type("Registry")
            .event_type(event_type)
            .version(Version::new(version))
            .payload_raw(serde_json::json!({}))
            .build()
            .unwrap()
    }

    #[test]
    fn for_registry_sets_only_registry() {
        let id = RegistryId::new();
        let query = AuditQuery::for_registry(id);

        assert_eq!(query.registry_id, Some(id));
        assert!(query.event_types.is_none());
        assert!(query.limit.is_none());
    }

    #[test]
    fn builder_chain() {
        let id = RegistryId::new();
        let query = AuditQuery::new()
            .registry_id(id)
            .event_type("ParcelRegistered")
            .from_version(Version::new(2))
            .to_version(Version::new(8))
            .limit(10)
            .offset(1);

        assert_eq!(query.registry_id, Some(id));
        assert_eq!(
            query.event_types,
            Some(vec!["ParcelRegistered".to_string()])
        );
        assert_eq!(query.from_version, Some(Version::new(2)));
        assert_eq!(query.to_version, Some(Version::new(8)));
        assert_eq!(query.limit, Some(10));
        assert_eq!(query.offset, Some(1));
    }

    #[test]
    fn matches_applies_every_filter() {
        let id = RegistryId::new();
        let other = RegistryId::new();
        let query = AuditQuery::for_registry(id)
            .event_types(vec![
                "ParcelRegistered".to_string(),
                "ParcelOwnershipTransferred".to_string(),
            ])
            .from_version(Version::new(2));

        assert!(query.matches(&record(id, 2, "ParcelRegistered")));
        assert!(query.matches(&record(id, 5, "ParcelOwnershipTransferred")));
        assert!(!query.matches(&record(id, 1, "ParcelRegistered")));
        assert!(!query.matches(&record(id, 3, "OfficerAdded")));
        assert!(!query.matches(&record(other, 3, "ParcelRegistered")));
    }
}
