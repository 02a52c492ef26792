use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{RegistryId, Version};

/// Serialized registry state as of a given version.
///
/// Loading starts from the latest snapshot and replays only the records
/// after it. A registry keeps at most one snapshot; saving replaces it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub registry_id: RegistryId,
    pub aggregate_type: String,

    /// Version of the last record folded into `state`.
    pub version: Version,

    pub taken_at: DateTime<Utc>,
    pub state: serde_json::Value,
}

impl StateSnapshot {
    /// Serializes `state` into a snapshot taken now.
    pub fn capture<T: Serialize>(
        registry_id: RegistryId,
        aggregate_type: impl Into<String>,
        version: Version,
        state: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            registry_id,
            aggregate_type: aggregate_type.into(),
            version,
            taken_at: Utc::now(),
            state: serde_json::to_value(state)?,
        })
    }

    /// Deserializes the captured state.
    pub fn restore<T: for<'de> Deserialize<'de>>(self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Counters {
        parcel_count: u64,
        officers: Vec<String>,
    }

    #[test]
    fn capture_then_restore() {
        let id = RegistryId::new();
        let original = Counters {
            parcel_count: 7,
            officers: vec!["0x01".to_string()],
        };

        let snapshot = StateSnapshot::capture(id, "Registry", Version::new(12), &original).unwrap();
        assert_eq!(snapshot.registry_id, id);
        assert_eq!(snapshot.version, Version::new(12));

        let restored: Counters = snapshot.restore().unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn restore_into_wrong_shape_fails() {
        let snapshot = StateSnapshot::capture(
            RegistryId::new(),
            "Registry",
            Version::first(),
            &serde_json::json!({"unexpected": true}),
        )
        .unwrap();

        let restored: Result<Counters, _> = snapshot.restore();
        assert!(restored.is_err());
    }
}
