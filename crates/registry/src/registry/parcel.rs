//! Parcel records and the ledger that owns them.

use common::{Identity, ParcelId};
use serde::{Deserialize, Serialize};

use super::{RegistryError, RegistryEvent, Roles, TransferState};

/// A registered parcel.
///
/// The default value (id 0, empty location, zero area, null owner,
/// unlocked) is what lookups of unknown ids return.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parcel {
    pub id: ParcelId,
    pub location: String,
    pub area: u64,
    pub owner: Identity,
    #[serde(default)]
    pub state: TransferState,
}

impl Parcel {
    pub fn new(id: ParcelId, owner: Identity, location: impl Into<String>, area: u64) -> Self {
        Self {
            id,
            location: location.into(),
            area,
            owner,
            state: TransferState::Unlocked,
        }
    }

    /// True while a transfer of this parcel is in progress.
    pub fn is_locked(&self) -> bool {
        self.state.is_locked()
    }

    /// False for the default record returned for unknown ids.
    pub fn is_registered(&self) -> bool {
        self.id != ParcelId::default()
    }
}

/// All parcels ever registered, indexed by id.
///
/// Ids are assigned sequentially from 1 and parcels are never removed, so
/// parcel `n` lives at index `n - 1` and the parcel count is the length.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParcelLedger {
    parcels: Vec<Parcel>,
}

impl ParcelLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the parcel, or the default record if `id` is not registered.
    pub fn parcel(&self, id: ParcelId) -> Parcel {
        self.get(id).cloned().unwrap_or_default()
    }

    pub fn get(&self, id: ParcelId) -> Option<&Parcel> {
        let index = Self::index_of(id)?;
        self.parcels.get(index)
    }

    pub(crate) fn get_mut(&mut self, id: ParcelId) -> Option<&mut Parcel> {
        let index = Self::index_of(id)?;
        self.parcels.get_mut(index)
    }

    /// Number of parcels ever registered.
    pub fn parcel_count(&self) -> u64 {
        self.parcels.len() as u64
    }

    /// Id the next registration will receive.
    pub fn next_id(&self) -> ParcelId {
        ParcelId::new(self.parcel_count() + 1)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parcel> {
        self.parcels.iter()
    }

    /// Registers a parcel on behalf of `owner`.
    ///
    /// Only officers may register. The owner is whoever the officer names,
    /// not the officer. Location and area are taken as given.
    pub fn register(
        &self,
        roles: &Roles,
        caller: Identity,
        owner: Identity,
        location: impl Into<String>,
        area: u64,
    ) -> Result<RegistryEvent, RegistryError> {
        roles.ensure_officer(caller, "register parcels")?;

        Ok(RegistryEvent::parcel_registered(
            self.next_id(),
            owner,
            location,
            area,
            caller,
        ))
    }

    pub(crate) fn insert(&mut self, parcel: Parcel) {
        debug_assert_eq!(parcel.id, self.next_id());
        self.parcels.push(parcel);
    }

    fn index_of(id: ParcelId) -> Option<usize> {
        let index = id.as_u64().checked_sub(1)?;
        usize::try_from(index).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(last: u8) -> Identity {
        let mut bytes = [0u8; 20];
        bytes[19] = last;
        Identity::from_bytes(bytes)
    }

    fn roles_with_officer() -> Roles {
        let mut roles = Roles::new(identity(1));
        roles.insert_officer(identity(2));
        roles
    }

    #[test]
    fn unknown_parcel_is_default_record() {
        let ledger = ParcelLedger::new();

        for id in [0, 1, 42, u64::MAX] {
            let parcel = ledger.parcel(ParcelId::new(id));
            assert_eq!(parcel, Parcel::default());
            assert!(!parcel.is_registered());
            assert!(parcel.owner.is_null());
            assert!(!parcel.is_locked());
        }
    }

    #[test]
    fn register_names_the_owner_not_the_officer() {
        let ledger = ParcelLedger::new();
        let event = ledger
            .register(&roles_with_officer(), identity(2), identity(7), "Kathmandu", 500)
            .unwrap();

        assert_eq!(
            event,
            RegistryEvent::parcel_registered(
                ParcelId::first(),
                identity(7),
                "Kathmandu",
                500,
                identity(2)
            )
        );
    }

    #[test]
    fn register_requires_officer() {
        let ledger = ParcelLedger::new();
        let roles = roles_with_officer();

        // the administrator is not an officer unless added
        for caller in [identity(1), identity(9), Identity::NULL] {
            let err = ledger
                .register(&roles, caller, identity(7), "Lalitpur", 1)
                .unwrap_err();
            assert!(matches!(
                err,
                RegistryError::Unauthorized {
                    required: crate::registry::Role::Officer,
                    ..
                }
            ));
        }
    }

    #[test]
    fn ids_follow_the_count() {
        let mut ledger = ParcelLedger::new();
        assert_eq!(ledger.next_id(), ParcelId::first());

        ledger.insert(Parcel::new(ParcelId::new(1), identity(3), "A", 0));
        ledger.insert(Parcel::new(ParcelId::new(2), identity(4), "B", 10));

        assert_eq!(ledger.parcel_count(), 2);
        assert_eq!(ledger.next_id(), ParcelId::new(3));
        assert_eq!(ledger.parcel(ParcelId::new(2)).owner, identity(4));
        assert_eq!(ledger.parcel(ParcelId::new(1)).area, 0);
    }

    #[test]
    fn ledger_serializes_round_trip() {
        let mut ledger = ParcelLedger::new();
        ledger.insert(Parcel::new(ParcelId::new(1), identity(3), "Bhaktapur", 250));

        let json = serde_json::to_string(&ledger).unwrap();
        let restored: ParcelLedger = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, ledger);
    }
}
