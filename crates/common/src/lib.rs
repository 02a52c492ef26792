//! Shared value types for the parcel registry workspace.

pub mod identity;
pub mod types;

pub use identity::{Identity, ParseIdentityError};
pub use types::{ParcelId, RegistryId};
