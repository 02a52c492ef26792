use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AuditLogError, RegistryId};

/// Unique identifier for an audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Creates a new random record ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a record ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position of a record within its registry's history.
///
/// A registry that has never been written is at version 0. The first record
/// carries version 1 and each later record increments it by one, so the
/// version doubles as the optimistic concurrency token for appends.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Creates a version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Version of a registry with no records.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Version carried by a registry's first record.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw version value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// One immutable entry in the audit log.
///
/// Wraps a serialized domain event with the data needed to order, filter
/// and replay it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub record_id: RecordId,

    /// Domain event name, e.g. `"ParcelRegistered"`.
    pub event_type: String,

    pub registry_id: RegistryId,

    /// Aggregate type that produced the event, e.g. `"Registry"`.
    pub aggregate_type: String,

    pub version: Version,

    pub recorded_at: DateTime<Utc>,

    /// The event itself, as JSON.
    pub payload: serde_json::Value,

    /// Free-form annotations such as the calling identity.
    pub metadata: HashMap<String, serde_json::Value>,
}

impl AuditRecord {
    /// Creates a new record builder.
    pub fn builder() -> AuditRecordBuilder {
        AuditRecordBuilder::default()
    }

    /// Decodes the payload into a typed event.
    pub fn decode<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}

/// Builder for audit records.
#[derive(Debug, Default)]
pub struct AuditRecordBuilder {
    record_id: Option<RecordId>,
    event_type: Option<String>,
    registry_id: Option<RegistryId>,
    aggregate_type: Option<String>,
    version: Option<Version>,
    recorded_at: Option<DateTime<Utc>>,
    payload: Option<serde_json::Value>,
    metadata: HashMap<String, serde_json::Value>,
}

impl AuditRecordBuilder {
    /// Sets the record ID. A fresh one is generated otherwise.
    pub fn record_id(mut self, id: RecordId) -> Self {
        self.record_id = Some(id);
        self
    }

    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    pub fn registry_id(mut self, id: RegistryId) -> Self {
        self.registry_id = Some(id);
        self
    }

    pub fn aggregate_type(mut self, aggregate_type: impl Into<String>) -> Self {
        self.aggregate_type = Some(aggregate_type.into());
        self
    }

    pub fn version(mut self, version: Version) -> Self {
        self.version = Some(version);
        self
    }

    /// Sets the timestamp. The current time is used otherwise.
    pub fn recorded_at(mut self, recorded_at: DateTime<Utc>) -> Self {
        self.recorded_at = Some(recorded_at);
        self
    }

    /// Serializes `payload` into the record.
    pub fn payload<T: Serialize>(mut self, payload: &T) -> Result<Self, serde_json::Error> {
        self.payload = Some(serde_json::to_value(payload)?);
        Ok(self)
    }

    /// Sets an already-serialized payload.
    pub fn payload_raw(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Builds the record, failing if a required field was never set.
    pub fn build(self) -> Result<AuditRecord, AuditLogError> {
        Ok(AuditRecord {
            record_id: self.record_id.unwrap_or_default(),
            event_type: self
                .event_type
                .ok_or(AuditLogError::IncompleteRecord("event_type"))?,
            registry_id: self
                .registry_id
                .ok_or(AuditLogError::IncompleteRecord("registry_id"))?,
            aggregate_type: self
                .aggregate_type
                .ok_or(AuditLogError::IncompleteRecord("aggregate_type"))?,
            version: self
                .version
                .ok_or(AuditLogError::IncompleteRecord("version"))?,
            recorded_at: self.recorded_at.unwrap_or_else(Utc::now),
            payload: self
                .payload
                .ok_or(AuditLogError::IncompleteRecord("payload"))?,
            metadata: self.metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_ordering() {
        let v1 = Version::new(1);
        let v2 = Version::new(2);
        assert!(v1 < v2);
        assert_eq!(v1.next(), v2);
        assert_eq!(Version::initial().next(), Version::first());
    }

    #[test]
    fn builder_fills_defaults() {
        let registry_id = RegistryId::new();
        let payload = serde_json::json!({"type": "OfficerAdded"});

        let record = AuditRecord::builder()
            .event_type("OfficerAdded")
            .registry_id(registry_id)
            .aggregate_type("Registry")
            .version(Version::first())
            .payload_raw(payload.clone())
            .metadata("caller", serde_json::json!("0xabc"))
            .build()
            .unwrap();

        assert_eq!(record.event_type, "OfficerAdded");
        assert_eq!(record.registry_id, registry_id);
        assert_eq!(record.version, Version::first());
        assert_eq!(record.payload, payload);
        assert_eq!(
            record.metadata.get("caller"),
            Some(&serde_json::json!("0xabc"))
        );
    }

    #[test]
    fn builder_reports_first_missing_field() {
        let err = AuditRecord::builder().build().unwrap_err();
        assert!(matches!(err, AuditLogError::IncompleteRecord("event_type")));

        let err = AuditRecord::builder()
            .event_type("OfficerAdded")
            .registry_id(RegistryId::new())
            .aggregate_type("Registry")
            .version(Version::first())
            .build()
            .unwrap_err();
        assert!(matches!(err, AuditLogError::IncompleteRecord("payload")));
    }

    #[test]
    fn decode_reads_payload() {
        #[derive(Deserialize, PartialEq, Debug)]
        struct Added {
            identity: String,
        }

        let record = AuditRecord::builder()
            .event_type("OfficerAdded")
            .registry_id(RegistryId::new())
            .aggregate_type("Registry")
            .version(Version::first())
            .payload_raw(serde_json::json!({"identity": "0x01"}))
            .build()
            .unwrap();

        let added: Added = record.decode().unwrap();
        assert_eq!(added.identity, "0x01");
    }
}
