//! Read models fed from the registry's audit log.
//!
//! - [`Projection`] turns audit records into a read model
//! - [`ReadModel`] gives query access to the result
//! - [`ProjectionProcessor`] feeds records from the log to projections
//! - Views: parcels per owner and per-parcel ownership history

pub mod error;
pub mod processor;
pub mod projection;
pub mod read_model;
pub mod views;

pub use error::{ProjectionError, Result};
pub use processor::ProjectionProcessor;
pub use projection::{Projection, ProjectionPosition};
pub use read_model::ReadModel;
pub use views::{OwnerParcelsView, OwnershipEntry, ParcelHistory, ParcelHistoryView};
