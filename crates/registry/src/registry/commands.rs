//! Registry commands.
//!
//! Each command names the registry it targets and the caller it runs for.

use common::{Identity, ParcelId, RegistryId};

use crate::command::Command;

use super::{DEFAULT_REGISTRY_NAME, Registry};

#[derive(Debug, Clone)]
pub struct CreateRegistry {
    pub registry_id: RegistryId,
    pub name: String,

    /// First administrator; also recorded as the caller.
    pub administrator: Identity,
}

impl CreateRegistry {
    pub fn new(registry_id: RegistryId, name: impl Into<String>, administrator: Identity) -> Self {
        Self {
            registry_id,
            name: name.into(),
            administrator,
        }
    }

    /// A registry with the default name and a fresh id.
    pub fn with_default_name(administrator: Identity) -> Self {
        Self::new(RegistryId::new(), DEFAULT_REGISTRY_NAME, administrator)
    }
}

impl Command for CreateRegistry {
    type Aggregate = Registry;

    fn registry_id(&self) -> RegistryId {
        self.registry_id
    }

    fn caller(&self) -> Identity {
        self.administrator
    }
}

#[derive(Debug, Clone)]
pub struct AddOfficer {
    pub registry_id: RegistryId,
    pub caller: Identity,
    pub officer: Identity,
}

impl AddOfficer {
    pub fn new(registry_id: RegistryId, caller: Identity, officer: Identity) -> Self {
        Self {
            registry_id,
            caller,
            officer,
        }
    }
}

impl Command for AddOfficer {
    type Aggregate = Registry;

    fn registry_id(&self) -> RegistryId {
        self.registry_id
    }

    fn caller(&self) -> Identity {
        self.caller
    }
}

#[derive(Debug, Clone)]
pub struct TransferAdministration {
    pub registry_id: RegistryId,
    pub caller: Identity,
    pub new_administrator: Identity,
}

impl TransferAdministration {
    pub fn new(registry_id: RegistryId, caller: Identity, new_administrator: Identity) -> Self {
        Self {
            registry_id,
            caller,
            new_administrator,
        }
    }
}

impl Command for TransferAdministration {
    type Aggregate = Registry;

    fn registry_id(&self) -> RegistryId {
        self.registry_id
    }

    fn caller(&self) -> Identity {
        self.caller
    }
}

#[derive(Debug, Clone)]
pub struct RenounceAdministration {
    pub registry_id: RegistryId,
    pub caller: Identity,
}

impl RenounceAdministration {
    pub fn new(registry_id: RegistryId, caller: Identity) -> Self {
        Self {
            registry_id,
            caller,
        }
    }
}

impl Command for RenounceAdministration {
    type Aggregate = Registry;

    fn registry_id(&self) -> RegistryId {
        self.registry_id
    }

    fn caller(&self) -> Identity {
        self.caller
    }
}

#[derive(Debug, Clone)]
pub struct RegisterParcel {
    pub registry_id: RegistryId,

    /// Registering officer.
    pub caller: Identity,

    pub owner: Identity,
    pub location: String,
    pub area: u64,
}

impl RegisterParcel {
    pub fn new(
        registry_id: RegistryId,
        caller: Identity,
        owner: Identity,
        location: impl Into<String>,
        area: u64,
    ) -> Self {
        Self {
            registry_id,
            caller,
            owner,
            location: location.into(),
            area,
        }
    }
}

impl Command for RegisterParcel {
    type Aggregate = Registry;

    fn registry_id(&self) -> RegistryId {
        self.registry_id
    }

    fn caller(&self) -> Identity {
        self.caller
    }
}

#[derive(Debug, Clone)]
pub struct TransferParcel {
    pub registry_id: RegistryId,

    /// Must be the parcel's current owner.
    pub caller: Identity,

    pub parcel_id: ParcelId,
    pub new_owner: Identity,
}

impl TransferParcel {
    pub fn new(
        registry_id: RegistryId,
        caller: Identity,
        parcel_id: ParcelId,
        new_owner: Identity,
    ) -> Self {
        Self {
            registry_id,
            caller,
            parcel_id,
            new_owner,
        }
    }
}

impl Command for TransferParcel {
    type Aggregate = Registry;

    fn registry_id(&self) -> RegistryId {
        self.registry_id
    }

    fn caller(&self) -> Identity {
        self.caller
    }
}
