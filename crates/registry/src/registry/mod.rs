//! The parcel registry aggregate and its parts.

mod aggregate;
mod commands;
mod events;
mod parcel;
mod roles;
mod service;
mod transfer;

pub use aggregate::{DEFAULT_REGISTRY_NAME, Registry};
pub use commands::*;
pub use events::{
    AdministrationTransferredData, OfficerAddedData, ParcelOwnershipTransferredData,
    ParcelRegisteredData, RegistryCreatedData, RegistryEvent,
};
pub use parcel::{Parcel, ParcelLedger};
pub use roles::{Role, Roles};
pub use service::RegistryService;
pub use transfer::{TransferContext, TransferProtocol, TransferState};

use common::{Identity, ParcelId};
use thiserror::Error;

/// Rule violations raised by registry operations.
///
/// Every variant is raised before any state changes, so a rejected
/// operation has no effect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The caller lacks the role the operation requires.
    #[error("Unauthorized: only {required} can {action} (caller {caller})")]
    Unauthorized {
        caller: Identity,
        required: Role,
        action: &'static str,
    },

    #[error("You are not the owner of this parcel (parcel {parcel_id}, caller {caller})")]
    NotOwner {
        caller: Identity,
        parcel_id: ParcelId,
    },

    /// The null identity was supplied where a real one is required.
    #[error("Invalid identity: {context} cannot be the null identity")]
    InvalidIdentity { context: &'static str },

    /// A transfer of a parcel was attempted while that parcel was mid-transfer.
    #[error("Reentrant transfer: parcel {parcel_id} is locked by a transfer in progress")]
    ReentrantTransfer { parcel_id: ParcelId },

    #[error("Registry already created")]
    AlreadyCreated,

    #[error("Registry has not been created")]
    NotCreated,
}
