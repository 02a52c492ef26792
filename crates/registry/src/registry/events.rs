//! Registry domain events.

use chrono::{DateTime, Utc};
use common::{Identity, ParcelId, RegistryId};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

/// Events recorded for a registry, in emission order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum RegistryEvent {
    RegistryCreated(RegistryCreatedData),

    /// The administrator role changed hands. `new` is the null identity
    /// when the role was renounced, `previous` is null at creation.
    AdministrationTransferred(AdministrationTransferredData),

    OfficerAdded(OfficerAddedData),

    ParcelRegistered(ParcelRegisteredData),

    ParcelOwnershipTransferred(ParcelOwnershipTransferredData),
}

impl DomainEvent for RegistryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RegistryEvent::RegistryCreated(_) => "RegistryCreated",
            RegistryEvent::AdministrationTransferred(_) => "AdministrationTransferred",
            RegistryEvent::OfficerAdded(_) => "OfficerAdded",
            RegistryEvent::ParcelRegistered(_) => "ParcelRegistered",
            RegistryEvent::ParcelOwnershipTransferred(_) => "ParcelOwnershipTransferred",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryCreatedData {
    pub registry_id: RegistryId,
    pub name: String,
    pub administrator: Identity,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdministrationTransferredData {
    pub previous: Identity,
    pub new: Identity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfficerAddedData {
    pub identity: Identity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParcelRegisteredData {
    pub parcel_id: ParcelId,

    /// Owner named by the registering officer.
    pub owner: Identity,

    pub location: String,

    /// Area in the registry's unit, zero allowed.
    pub area: u64,

    /// Officer that registered the parcel.
    pub registered_by: Identity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParcelOwnershipTransferredData {
    pub parcel_id: ParcelId,
    pub previous_owner: Identity,
    pub new_owner: Identity,
}

impl RegistryEvent {
    pub fn registry_created(
        registry_id: RegistryId,
        name: impl Into<String>,
        administrator: Identity,
    ) -> Self {
        RegistryEvent::RegistryCreated(RegistryCreatedData {
            registry_id,
            name: name.into(),
            administrator,
            created_at: Utc::now(),
        })
    }

    pub fn administration_transferred(previous: Identity, new: Identity) -> Self {
        RegistryEvent::AdministrationTransferred(AdministrationTransferredData { previous, new })
    }

    pub fn officer_added(identity: Identity) -> Self {
        RegistryEvent::OfficerAdded(OfficerAddedData { identity })
    }

    pub fn parcel_registered(
        parcel_id: ParcelId,
        owner: Identity,
        location: impl Into<String>,
        area: u64,
        registered_by: Identity,
    ) -> Self {
        RegistryEvent::ParcelRegistered(ParcelRegisteredData {
            parcel_id,
            owner,
            location: location.into(),
            area,
            registered_by,
        })
    }

    pub fn parcel_ownership_transferred(
        parcel_id: ParcelId,
        previous_owner: Identity,
        new_owner: Identity,
    ) -> Self {
        RegistryEvent::ParcelOwnershipTransferred(ParcelOwnershipTransferredData {
            parcel_id,
            previous_owner,
            new_owner,
        })
    }

    /// Parcel the event concerns, if any.
    pub fn parcel_id(&self) -> Option<ParcelId> {
        match self {
            RegistryEvent::ParcelRegistered(data) => Some(data.parcel_id),
            RegistryEvent::ParcelOwnershipTransferred(data) => Some(data.parcel_id),
            _ => None,
        }
    }
}
