//! HTTP route handlers.

pub mod health;
pub mod metrics;
pub mod parcels;
pub mod registry;

use std::sync::Arc;

use audit_log::{AuditLog, RegistryId};
use common::{Identity, ParcelId};
use projections::{OwnerParcelsView, ParcelHistoryView, ProjectionProcessor};
use ::registry::RegistryService;
use serde::Serialize;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
///
/// A server fronts exactly one registry, chosen at start-up.
pub struct AppState<S: AuditLog> {
    pub service: RegistryService<S>,
    pub registry_id: RegistryId,
    pub log: S,
    pub owners: OwnerParcelsView,
    pub history: ParcelHistoryView,
    pub projection_processor: Arc<ProjectionProcessor<S>>,
}

impl<S: AuditLog> AppState<S> {
    /// Brings the read models up to date with the audit log.
    pub async fn catch_up(&self) -> Result<(), ApiError> {
        self.projection_processor.run_catch_up().await?;
        Ok(())
    }
}

/// Acknowledges a mutation with the registry version it produced.
#[derive(Serialize)]
pub struct CommandAccepted {
    pub registry_id: String,
    pub version: i64,
}

pub(crate) fn parse_identity(field: &str, value: &str) -> Result<Identity, ApiError> {
    value
        .trim()
        .parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid {field}: {e}")))
}

pub(crate) fn parse_parcel_id(value: &str) -> Result<ParcelId, ApiError> {
    value
        .parse::<u64>()
        .map(ParcelId::new)
        .map_err(|e| ApiError::BadRequest(format!("Invalid parcel id: {e}")))
}
