//! Ownership transfer of a single parcel.
//!
//! A transfer locks the parcel, swaps the owner, runs any side effects and
//! unlocks again. The lock exists to catch a transfer of the same parcel
//! started from inside those side effects:
//!
//! ```text
//! Unlocked ──transfer──► Locked ──done / failed──► Unlocked
//!                          │
//!                          └── nested transfer of same parcel ──► ReentrantTransfer
//! ```

use common::{Identity, ParcelId};
use serde::{Deserialize, Serialize};

use super::{Parcel, ParcelLedger, RegistryError, RegistryEvent};

/// Transfer state of a parcel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TransferState {
    #[default]
    Unlocked,

    /// A transfer is in progress.
    Locked,
}

impl TransferState {
    pub fn can_begin_transfer(&self) -> bool {
        matches!(self, TransferState::Unlocked)
    }

    pub fn is_locked(&self) -> bool {
        matches!(self, TransferState::Locked)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferState::Unlocked => "Unlocked",
            TransferState::Locked => "Locked",
        }
    }
}

impl std::fmt::Display for TransferState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Holds a parcel locked for the duration of a transfer.
///
/// Dropping the guard always unlocks the parcel. Unless the transfer was
/// committed it also puts the previous owner back.
struct TransferLock<'a> {
    ledger: &'a mut ParcelLedger,
    parcel_id: ParcelId,
    previous_owner: Identity,
    committed: bool,
}

impl<'a> TransferLock<'a> {
    fn acquire(ledger: &'a mut ParcelLedger, parcel_id: ParcelId) -> Option<Self> {
        let parcel = ledger.get_mut(parcel_id)?;
        parcel.state = TransferState::Locked;
        let previous_owner = parcel.owner;

        Some(Self {
            ledger,
            parcel_id,
            previous_owner,
            committed: false,
        })
    }

    fn set_owner(&mut self, owner: Identity) {
        if let Some(parcel) = self.ledger.get_mut(self.parcel_id) {
            parcel.owner = owner;
        }
    }

    fn ledger(&mut self) -> &mut ParcelLedger {
        self.ledger
    }

    /// Keeps the new owner and returns the previous one.
    fn commit(mut self) -> Identity {
        self.committed = true;
        self.previous_owner
    }
}

impl Drop for TransferLock<'_> {
    fn drop(&mut self) {
        if let Some(parcel) = self.ledger.get_mut(self.parcel_id) {
            if !self.committed {
                parcel.owner = self.previous_owner;
            }
            parcel.state = TransferState::Unlocked;
        }
    }
}

/// What transfer side effects can see and do while the parcel is locked.
pub struct TransferContext<'a> {
    ledger: &'a mut ParcelLedger,
    events: Vec<RegistryEvent>,
}

impl TransferContext<'_> {
    pub fn parcel(&self, parcel_id: ParcelId) -> Parcel {
        self.ledger.parcel(parcel_id)
    }

    /// Starts a nested transfer.
    ///
    /// A nested transfer of the parcel already being transferred fails with
    /// [`RegistryError::ReentrantTransfer`].
    pub fn transfer(
        &mut self,
        caller: Identity,
        parcel_id: ParcelId,
        new_owner: Identity,
    ) -> Result<(), RegistryError> {
        let events = TransferProtocol::transfer(self.ledger, caller, parcel_id, new_owner)?;
        self.events.extend(events);
        Ok(())
    }
}

/// The ownership transfer state machine.
pub struct TransferProtocol;

impl TransferProtocol {
    /// Transfers `parcel_id` from `caller` to `new_owner`.
    ///
    /// The new owner is not validated: self-transfers and transfers to the
    /// null identity go through.
    pub fn transfer(
        ledger: &mut ParcelLedger,
        caller: Identity,
        parcel_id: ParcelId,
        new_owner: Identity,
    ) -> Result<Vec<RegistryEvent>, RegistryError> {
        Self::transfer_with(ledger, caller, parcel_id, new_owner, |_| Ok(()))
    }

    /// Transfers `parcel_id` and runs `side_effects` while it is locked.
    ///
    /// On success the returned events hold those of nested transfers first,
    /// then this transfer's. If `side_effects` fails, the parcel is unlocked
    /// and keeps its previous owner. Nested transfers that already succeeded
    /// stay applied to `ledger`; callers that need all-or-nothing run this
    /// against a copy.
    pub fn transfer_with<F>(
        ledger: &mut ParcelLedger,
        caller: Identity,
        parcel_id: ParcelId,
        new_owner: Identity,
        side_effects: F,
    ) -> Result<Vec<RegistryEvent>, RegistryError>
    where
        F: FnOnce(&mut TransferContext<'_>) -> Result<(), RegistryError>,
    {
        let not_owner = RegistryError::NotOwner { caller, parcel_id };

        match ledger.get(parcel_id) {
            Some(parcel) if parcel.is_locked() => {
                return Err(RegistryError::ReentrantTransfer { parcel_id });
            }
            Some(parcel) if !caller.is_null() && parcel.owner == caller => {}
            _ => return Err(not_owner),
        }

        let mut lock = TransferLock::acquire(ledger, parcel_id).ok_or(not_owner)?;
        lock.set_owner(new_owner);

        let mut context = TransferContext {
            ledger: lock.ledger(),
            events: Vec::new(),
        };
        side_effects(&mut context)?;
        let mut events = context.events;

        let previous_owner = lock.commit();
        events.push(RegistryEvent::parcel_ownership_transferred(
            parcel_id,
            previous_owner,
            new_owner,
        ));

        Ok(events)
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

    /// Ledger with parcel 1 owned by identity(1) and parcel 2 by identity(2).
    fn ledger() -> ParcelLedger {
        let mut ledger = ParcelLedger::new();
        ledger.insert(Parcel::new(ParcelId::new(1), identity(1), "Kathmandu", 500));
        ledger.insert(Parcel::new(ParcelId::new(2), identity(2), "Pokhara", 300));
        ledger
    }

    #[test]
    fn owner_transfers() {
        let mut ledger = ledger();

        let events =
            TransferProtocol::transfer(&mut ledger, identity(1), ParcelId::new(1), identity(3))
                .unwrap();

        assert_eq!(
            events,
            vec![RegistryEvent::parcel_ownership_transferred(
                ParcelId::new(1),
                identity(1),
                identity(3)
            )]
        );
        let parcel = ledger.parcel(ParcelId::new(1));
        assert_eq!(parcel.owner, identity(3));
        assert!(!parcel.is_locked());
    }

    #[test]
    fn non_owner_is_rejected_without_change() {
        let mut ledger = ledger();
        let before = ledger.clone();

        let err =
            TransferProtocol::transfer(&mut ledger, identity(2), ParcelId::new(1), identity(2))
                .unwrap_err();

        assert_eq!(
            err,
            RegistryError::NotOwner {
                caller: identity(2),
                parcel_id: ParcelId::new(1)
            }
        );
        assert_eq!(ledger, before);
    }

    #[test]
    fn unregistered_parcel_is_not_owned() {
        let mut ledger = ledger();

        for caller in [identity(1), Identity::NULL] {
            let err =
                TransferProtocol::transfer(&mut ledger, caller, ParcelId::new(99), identity(3))
                    .unwrap_err();
            assert!(matches!(err, RegistryError::NotOwner { .. }));
        }
    }

    #[test]
    fn null_owned_parcel_cannot_be_moved_by_null_caller() {
        let mut ledger = ledger();
        TransferProtocol::transfer(&mut ledger, identity(1), ParcelId::new(1), Identity::NULL)
            .unwrap();

        let err =
            TransferProtocol::transfer(&mut ledger, Identity::NULL, ParcelId::new(1), identity(1))
                .unwrap_err();
        assert!(matches!(err, RegistryError::NotOwner { .. }));
    }

    #[test]
    fn self_transfer_is_allowed() {
        let mut ledger = ledger();

        let events =
            TransferProtocol::transfer(&mut ledger, identity(1), ParcelId::new(1), identity(1))
                .unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(ledger.parcel(ParcelId::new(1)).owner, identity(1));
    }

    #[test]
    fn parcel_is_locked_during_side_effects() {
        let mut ledger = ledger();

        TransferProtocol::transfer_with(
            &mut ledger,
            identity(1),
            ParcelId::new(1),
            identity(3),
            |ctx| {
                let parcel = ctx.parcel(ParcelId::new(1));
                assert!(parcel.is_locked());
                assert_eq!(parcel.owner, identity(3));
                Ok(())
            },
        )
        .unwrap();

        assert!(!ledger.parcel(ParcelId::new(1)).is_locked());
    }

    #[test]
    fn nested_transfer_of_same_parcel_is_reentrant() {
        let mut ledger = ledger();

        let err = TransferProtocol::transfer_with(
            &mut ledger,
            identity(1),
            ParcelId::new(1),
            identity(3),
            // the new owner tries to move it on before the first transfer ends
            |ctx| ctx.transfer(identity(3), ParcelId::new(1), identity(4)),
        )
        .unwrap_err();

        assert_eq!(
            err,
            RegistryError::ReentrantTransfer {
                parcel_id: ParcelId::new(1)
            }
        );
        let parcel = ledger.parcel(ParcelId::new(1));
        assert_eq!(parcel.owner, identity(1));
        assert!(!parcel.is_locked());
    }

    #[test]
    fn failed_side_effect_restores_owner_and_unlocks() {
        let mut ledger = ledger();

        let err = TransferProtocol::transfer_with(
            &mut ledger,
            identity(1),
            ParcelId::new(1),
            identity(3),
            |_| {
                Err(RegistryError::InvalidIdentity {
                    context: "side effect",
                })
            },
        )
        .unwrap_err();

        assert!(matches!(err, RegistryError::InvalidIdentity { .. }));
        let parcel = ledger.parcel(ParcelId::new(1));
        assert_eq!(parcel.owner, identity(1));
        assert_eq!(parcel.state, TransferState::Unlocked);
    }

    #[test]
    fn nested_transfer_events_come_first() {
        let mut ledger = ledger();

        let events = TransferProtocol::transfer_with(
            &mut ledger,
            identity(1),
            ParcelId::new(1),
            identity(2),
            |ctx| ctx.transfer(identity(2), ParcelId::new(2), identity(1)),
        )
        .unwrap();

        assert_eq!(
            events,
            vec![
                RegistryEvent::parcel_ownership_transferred(
                    ParcelId::new(2),
                    identity(2),
                    identity(1)
                ),
                RegistryEvent::parcel_ownership_transferred(
                    ParcelId::new(1),
                    identity(1),
                    identity(2)
                ),
            ]
        );
        assert_eq!(ledger.parcel(ParcelId::new(1)).owner, identity(2));
        assert_eq!(ledger.parcel(ParcelId::new(2)).owner, identity(1));
    }

    #[test]
    fn locked_parcel_reports_reentrant_before_ownership() {
        let mut ledger = ledger();
        if let Some(parcel) = ledger.get_mut(ParcelId::new(2)) {
            parcel.state = TransferState::Locked;
        }

        // caller is not the owner, but the lock check comes first
        let err =
            TransferProtocol::transfer(&mut ledger, identity(9), ParcelId::new(2), identity(9))
                .unwrap_err();
        assert!(matches!(err, RegistryError::ReentrantTransfer { .. }));
    }
}
