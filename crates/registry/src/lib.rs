//! Role-gated parcel registry.
//!
//! This crate holds the registry's domain logic:
//! - [`Roles`]: the administrator and the officer set
//! - [`ParcelLedger`]: parcel records and the parcel counter
//! - [`TransferProtocol`]: the lock-guarded ownership transfer
//! - [`Registry`]: the event-sourced aggregate tying them together
//! - [`CommandHandler`] and [`RegistryService`] for running commands
//!   against an [`audit_log::AuditLog`]

pub mod aggregate;
pub mod command;
pub mod error;
pub mod registry;

pub use aggregate::{Aggregate, DomainEvent, SnapshotCapable};
pub use command::{Command, CommandHandler, CommandResult, DEFAULT_SNAPSHOT_INTERVAL};
pub use error::DomainError;
pub use registry::{
    AddOfficer, CreateRegistry, DEFAULT_REGISTRY_NAME, Parcel, ParcelLedger, RegisterParcel,
    Registry, RegistryError, RegistryEvent, RegistryService, RenounceAdministration, Role, Roles,
    TransferAdministration, TransferContext, TransferParcel, TransferProtocol, TransferState,
};
