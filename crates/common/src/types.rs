use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a registry instance.
///
/// A deployment usually hosts a single registry, but the audit log keys
/// every record by registry so several can share one store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistryId(Uuid);

impl RegistryId {
    /// Creates a new random registry ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a registry ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RegistryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RegistryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RegistryId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<RegistryId> for Uuid {
    fn from(id: RegistryId) -> Self {
        id.0
    }
}

/// Sequential parcel number.
///
/// Registered parcels are numbered from 1. The value 0 never names a
/// registered parcel; it is the id carried by the default record returned
/// for unknown lookups.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ParcelId(u64);

impl ParcelId {
    /// Creates a parcel ID from a raw value.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// The first id handed out by a registry.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the id following this one.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ParcelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ParcelId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<ParcelId> for u64 {
    fn from(id: ParcelId) -> Self {
        id.0
    }
}
