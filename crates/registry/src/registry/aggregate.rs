//! Registry aggregate implementation.

use audit_log::Version;
use common::{Identity, ParcelId, RegistryId};
use serde::{Deserialize, Serialize};

use crate::aggregate::{Aggregate, SnapshotCapable};

use super::{
    Parcel, ParcelLedger, RegistryError, RegistryEvent, Roles, TransferContext, TransferProtocol,
    events::{ParcelOwnershipTransferredData, ParcelRegisteredData, RegistryCreatedData},
};

/// Name given to a registry when none is configured.
pub const DEFAULT_REGISTRY_NAME: &str = "BhuChain Land Registry";

/// Registry aggregate root.
///
/// Owns the roles and the parcel ledger. Commands check their rules
/// against the current state and return the events to record; state only
/// changes when those events are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registry {
    id: Option<RegistryId>,

    #[serde(default)]
    version: Version,

    name: String,
    roles: Roles,
    ledger: ParcelLedger,
}

impl Aggregate for Registry {
    type Event = RegistryEvent;
    type Error = RegistryError;

    fn aggregate_type() -> &'static str {
        "Registry"
    }

    fn id(&self) -> Option<RegistryId> {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            RegistryEvent::RegistryCreated(data) => self.apply_registry_created(data),
            RegistryEvent::AdministrationTransferred(data) => {
                self.roles.set_administrator(data.new);
            }
            RegistryEvent::OfficerAdded(data) => {
                self.roles.insert_officer(data.identity);
            }
            RegistryEvent::ParcelRegistered(data) => self.apply_parcel_registered(data),
            RegistryEvent::ParcelOwnershipTransferred(data) => {
                self.apply_ownership_transferred(data)
            }
        }
    }
}

impl SnapshotCapable for Registry {}

// Query methods
impl Registry {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current administrator, the null identity once renounced.
    pub fn administrator(&self) -> Identity {
        self.roles.administrator()
    }

    pub fn is_officer(&self, identity: Identity) -> bool {
        self.roles.is_officer(identity)
    }

    /// Returns the parcel, or the default record for an unknown id.
    pub fn parcel(&self, parcel_id: ParcelId) -> Parcel {
        self.ledger.parcel(parcel_id)
    }

    pub fn parcel_count(&self) -> u64 {
        self.ledger.parcel_count()
    }

    pub fn roles(&self) -> &Roles {
        &self.roles
    }

    pub fn ledger(&self) -> &ParcelLedger {
        &self.ledger
    }

    pub fn is_created(&self) -> bool {
        self.id.is_some()
    }
}

// Command methods
impl Registry {
    /// Creates the registry with `administrator` as its first administrator.
    pub fn create(
        &self,
        registry_id: RegistryId,
        name: impl Into<String>,
        administrator: Identity,
    ) -> Result<Vec<RegistryEvent>, RegistryError> {
        if self.is_created() {
            return Err(RegistryError::AlreadyCreated);
        }
        if administrator.is_null() {
            return Err(RegistryError::InvalidIdentity {
                context: "administrator",
            });
        }

        Ok(vec![
            RegistryEvent::registry_created(registry_id, name, administrator),
            RegistryEvent::administration_transferred(Identity::NULL, administrator),
        ])
    }

    pub fn add_officer(
        &self,
        caller: Identity,
        officer: Identity,
    ) -> Result<Vec<RegistryEvent>, RegistryError> {
        self.ensure_created()?;
        Ok(vec![self.roles.add_officer(caller, officer)?])
    }

    pub fn transfer_administration(
        &self,
        caller: Identity,
        new_administrator: Identity,
    ) -> Result<Vec<RegistryEvent>, RegistryError> {
        self.ensure_created()?;
        Ok(vec![
            self.roles
                .transfer_administration(caller, new_administrator)?,
        ])
    }

    /// Leaves the registry without an administrator, permanently.
    ///
    /// No officer can be added and administration can never be transferred
    /// again. Existing officers keep registering parcels.
    pub fn renounce_administration(
        &self,
        caller: Identity,
    ) -> Result<Vec<RegistryEvent>, RegistryError> {
        self.ensure_created()?;
        Ok(vec![self.roles.renounce_administration(caller)?])
    }

    pub fn register_parcel(
        &self,
        caller: Identity,
        owner: Identity,
        location: impl Into<String>,
        area: u64,
    ) -> Result<Vec<RegistryEvent>, RegistryError> {
        self.ensure_created()?;
        Ok(vec![
            self.ledger
                .register(&self.roles, caller, owner, location, area)?,
        ])
    }

    pub fn transfer_parcel(
        &self,
        caller: Identity,
        parcel_id: ParcelId,
        new_owner: Identity,
    ) -> Result<Vec<RegistryEvent>, RegistryError> {
        self.transfer_parcel_with(caller, parcel_id, new_owner, |_| Ok(()))
    }

    /// Transfers a parcel, running `side_effects` while it is locked.
    ///
    /// The transfer runs against a copy of the ledger, so a failure leaves
    /// this registry untouched, including any nested transfers the side
    /// effects made before failing.
    pub fn transfer_parcel_with<F>(
        &self,
        caller: Identity,
        parcel_id: ParcelId,
        new_owner: Identity,
        side_effects: F,
    ) -> Result<Vec<RegistryEvent>, RegistryError>
    where
        F: FnOnce(&mut TransferContext<'_>) -> Result<(), RegistryError>,
    {
        self.ensure_created()?;

        let mut working = self.ledger.clone();
        TransferProtocol::transfer_with(&mut working, caller, parcel_id, new_owner, side_effects)
    }

    fn ensure_created(&self) -> Result<(), RegistryError> {
        if self.is_created() {
            Ok(())
        } else {
            Err(RegistryError::NotCreated)
        }
    }
}

// Event application
impl Registry {
    fn apply_registry_created(&mut self, data: RegistryCreatedData) {
        self.id = Some(data.registry_id);
        self.name = data.name;
        self.roles = Roles::new(data.administrator);
    }

    fn apply_parcel_registered(&mut self, data: ParcelRegisteredData) {
        self.ledger.insert(Parcel::new(
            data.parcel_id,
            data.owner,
            data.location,
            data.area,
        ));
    }

    fn apply_ownership_transferred(&mut self, data: ParcelOwnershipTransferredData) {
        if let Some(parcel) = self.ledger.get_mut(data.parcel_id) {
            parcel.owner = data.new_owner;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Role, TransferState};

    fn identity(last: u8) -> Identity {
        let mut bytes = [0u8; 20];
        bytes[19] = last;
        Identity::from_bytes(bytes)
    }

    const ADMIN: u8 = 1;
    const OFFICER: u8 = 2;

    fn execute(
        registry: &mut Registry,
        command: impl FnOnce(&Registry) -> Result<Vec<RegistryEvent>, RegistryError>,
    ) -> Result<Vec<RegistryEvent>, RegistryError> {
        let events = command(registry)?;
        registry.apply_events(events.clone());
        Ok(events)
    }

    fn created_registry() -> Registry {
        let mut registry = Registry::default();
        execute(&mut registry, |r| {
            r.create(RegistryId::new(), DEFAULT_REGISTRY_NAME, identity(ADMIN))
        })
        .unwrap();
        execute(&mut registry, |r| {
            r.add_officer(identity(ADMIN), identity(OFFICER))
        })
        .unwrap();
        registry
    }

    fn registry_with_parcel(owner: Identity) -> Registry {
        let mut registry = created_registry();
        execute(&mut registry, |r| {
            r.register_parcel(identity(OFFICER), owner, "Kathmandu", 500)
        })
        .unwrap();
        registry
    }

    #[test]
    fn create_announces_initial_administrator() {
        let registry = Registry::default();
        let id = RegistryId::new();

        let events = registry.create(id, "Test Registry", identity(ADMIN)).unwrap();

        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[0],
            RegistryEvent::RegistryCreated(data)
                if data.registry_id == id && data.name == "Test Registry"
        ));
        assert_eq!(
            events[1],
            RegistryEvent::administration_transferred(Identity::NULL, identity(ADMIN))
        );
    }

    #[test]
    fn create_rejects_null_administrator() {
        let err = Registry::default()
            .create(RegistryId::new(), "Test", Identity::NULL)
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidIdentity { .. }));
    }

    #[test]
    fn create_twice_fails() {
        let registry = created_registry();
        let err = registry
            .create(RegistryId::new(), "Again", identity(ADMIN))
            .unwrap_err();
        assert_eq!(err, RegistryError::AlreadyCreated);
    }

    #[test]
    fn commands_on_uncreated_registry_fail() {
        let registry = Registry::default();
        assert_eq!(
            registry.add_officer(identity(ADMIN), identity(OFFICER)),
            Err(RegistryError::NotCreated)
        );
        assert_eq!(
            registry.transfer_parcel(identity(ADMIN), ParcelId::first(), identity(3)),
            Err(RegistryError::NotCreated)
        );
    }

    #[test]
    fn officer_registers_for_named_owner() {
        let registry = registry_with_parcel(identity(10));

        let parcel = registry.parcel(ParcelId::first());
        assert_eq!(parcel.id, ParcelId::first());
        assert_eq!(parcel.location, "Kathmandu");
        assert_eq!(parcel.area, 500);
        assert_eq!(parcel.owner, identity(10));
        assert_ne!(parcel.owner, identity(OFFICER));
        assert_eq!(parcel.state, TransferState::Unlocked);
        assert_eq!(registry.parcel_count(), 1);
    }

    #[test]
    fn administrator_alone_cannot_register() {
        let registry = created_registry();
        let err = registry
            .register_parcel(identity(ADMIN), identity(10), "Kathmandu", 500)
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Unauthorized {
                required: Role::Officer,
                ..
            }
        ));
    }

    #[test]
    fn transfer_by_owner() {
        let mut registry = registry_with_parcel(identity(10));

        let events = execute(&mut registry, |r| {
            r.transfer_parcel(identity(10), ParcelId::first(), identity(11))
        })
        .unwrap();

        assert_eq!(
            events,
            vec![RegistryEvent::parcel_ownership_transferred(
                ParcelId::first(),
                identity(10),
                identity(11)
            )]
        );
        let parcel = registry.parcel(ParcelId::first());
        assert_eq!(parcel.owner, identity(11));
        assert!(!parcel.is_locked());
    }

    #[test]
    fn transfer_by_stranger_leaves_parcel_alone() {
        let registry = registry_with_parcel(identity(10));
        let before = registry.clone();

        let err = registry
            .transfer_parcel(identity(11), ParcelId::first(), identity(11))
            .unwrap_err();

        assert!(matches!(err, RegistryError::NotOwner { .. }));
        assert_eq!(registry, before);
    }

    #[test]
    fn failed_nested_transfer_leaves_registry_untouched() {
        let mut registry = registry_with_parcel(identity(10));
        execute(&mut registry, |r| {
            r.register_parcel(identity(OFFICER), identity(10), "Lalitpur", 20)
        })
        .unwrap();
        let before = registry.clone();

        let err = registry
            .transfer_parcel_with(identity(10), ParcelId::new(1), identity(11), |ctx| {
                ctx.transfer(identity(10), ParcelId::new(2), identity(12))?;
                ctx.transfer(identity(11), ParcelId::new(1), identity(12))
            })
            .unwrap_err();

        assert!(matches!(err, RegistryError::ReentrantTransfer { .. }));
        assert_eq!(registry, before);
    }

    #[test]
    fn nested_transfers_apply_in_order() {
        let mut registry = registry_with_parcel(identity(10));
        execute(&mut registry, |r| {
            r.register_parcel(identity(OFFICER), identity(10), "Lalitpur", 20)
        })
        .unwrap();

        let events = execute(&mut registry, |r| {
            r.transfer_parcel_with(identity(10), ParcelId::new(1), identity(11), |ctx| {
                ctx.transfer(identity(10), ParcelId::new(2), identity(12))
            })
        })
        .unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].parcel_id(), Some(ParcelId::new(2)));
        assert_eq!(events[1].parcel_id(), Some(ParcelId::new(1)));
        assert_eq!(registry.parcel(ParcelId::new(1)).owner, identity(11));
        assert_eq!(registry.parcel(ParcelId::new(2)).owner, identity(12));
    }

    #[test]
    fn renounce_is_terminal() {
        let mut registry = created_registry();
        execute(&mut registry, |r| r.renounce_administration(identity(ADMIN))).unwrap();

        assert!(registry.administrator().is_null());
        for caller in [identity(ADMIN), Identity::NULL, identity(OFFICER)] {
            assert!(registry.add_officer(caller, identity(5)).is_err());
            assert!(registry.transfer_administration(caller, identity(5)).is_err());
            assert!(registry.renounce_administration(caller).is_err());
        }

        // officers keep working
        assert!(
            registry
                .register_parcel(identity(OFFICER), identity(10), "Kathmandu", 1)
                .is_ok()
        );
    }

    #[test]
    fn transfer_administration_moves_the_role() {
        let mut registry = created_registry();
        execute(&mut registry, |r| {
            r.transfer_administration(identity(ADMIN), identity(5))
        })
        .unwrap();

        assert_eq!(registry.administrator(), identity(5));
        assert!(
            registry
                .add_officer(identity(ADMIN), identity(6))
                .is_err()
        );
        assert!(registry.add_officer(identity(5), identity(6)).is_ok());
    }

    #[test]
    fn snapshot_state_round_trips() {
        let registry = registry_with_parcel(identity(10));
        let json = serde_json::to_value(&registry).unwrap();
        let restored: Registry = serde_json::from_value(json).unwrap();
        assert_eq!(restored, registry);
    }
}
