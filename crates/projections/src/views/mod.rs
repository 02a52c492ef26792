//! Read model views.

pub mod owner_parcels;
pub mod parcel_history;

pub use owner_parcels::OwnerParcelsView;
pub use parcel_history::{OwnershipEntry, ParcelHistory, ParcelHistoryView};
