//! Per-parcel ownership history.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use audit_log::{AuditRecord, Version};
use chrono::{DateTime, Utc};
use common::{Identity, ParcelId, RegistryId};
use registry::{Aggregate, Registry, RegistryEvent};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::Result;
use crate::projection::{Projection, ProjectionPosition};
use crate::read_model::ReadModel;

/// One link in a parcel's chain of owners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnershipEntry {
    pub owner: Identity,

    /// When the owner acquired the parcel, taken from the audit record.
    pub acquired_at: DateTime<Utc>,

    /// Registry version of the acquiring record.
    pub version: Version,
}

/// A parcel with every owner it has had, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParcelHistory {
    pub registry_id: RegistryId,
    pub parcel_id: ParcelId,
    pub location: String,
    pub area: u64,
    pub registered_by: Identity,
    pub owners: Vec<OwnershipEntry>,
}

impl ParcelHistory {
    pub fn current_owner(&self) -> Option<Identity> {
        self.owners.last().map(|entry| entry.owner)
    }

    pub fn transfer_count(&self) -> usize {
        self.owners.len().saturating_sub(1)
    }
}

struct ParcelHistoryState {
    parcels: HashMap<(RegistryId, ParcelId), ParcelHistory>,
    position: ProjectionPosition,
}

/// Ownership chains keyed by registry and parcel.
#[derive(Clone)]
pub struct ParcelHistoryView {
    state: Arc<RwLock<ParcelHistoryState>>,
}

impl ParcelHistoryView {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(ParcelHistoryState {
                parcels: HashMap::new(),
                position: ProjectionPosition::zero(),
            })),
        }
    }

    pub async fn history(
        &self,
        registry_id: RegistryId,
        parcel_id: ParcelId,
    ) -> Option<ParcelHistory> {
        self.state
            .read()
            .await
            .parcels
            .get(&(registry_id, parcel_id))
            .cloned()
    }
}

impl Default for ParcelHistoryView {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Projection for ParcelHistoryView {
    fn name(&self) -> &'static str {
        "ParcelHistoryView"
    }

    async fn handle(&self, record: &AuditRecord) -> Result<()> {
        let mut state = self.state.write().await;
        if state.position.covers(record) {
            return Ok(());
        }
        if record.aggregate_type != Registry::aggregate_type() {
            state.position.advance(record);
            return Ok(());
        }

        let event: RegistryEvent = record.decode()?;
        let registry_id = record.registry_id;

        match event {
            RegistryEvent::ParcelRegistered(data) => {
                state.parcels.insert(
                    (registry_id, data.parcel_id),
                    ParcelHistory {
                        registry_id,
                        parcel_id: data.parcel_id,
                        location: data.location,
                        area: data.area,
                        registered_by: data.registered_by,
                        owners: vec![OwnershipEntry {
                            owner: data.owner,
                            acquired_at: record.recorded_at,
                            version: record.version,
                        }],
                    },
                );
            }
            RegistryEvent::ParcelOwnershipTransferred(data) => {
                if let Some(history) = state.parcels.get_mut(&(registry_id, data.parcel_id)) {
                    history.owners.push(OwnershipEntry {
                        owner: data.new_owner,
                        acquired_at: record.recorded_at,
                        version: record.version,
                    });
                } else {
                    tracing::warn!(
                        %registry_id,
                        parcel_id = %data.parcel_id,
                        "transfer recorded for a parcel with no registration"
                    );
                }
            }
            RegistryEvent::RegistryCreated(_)
            | RegistryEvent::AdministrationTransferred(_)
            | RegistryEvent::OfficerAdded(_) => {}
        }

        state.position.advance(record);
        Ok(())
    }

    async fn position(&self) -> ProjectionPosition {
        self.state.read().await.position.clone()
    }

    async fn reset(&self) -> Result<()> {
        let mut state = self.state.write().await;
        state.parcels.clear();
        state.position = ProjectionPosition::zero();
        Ok(())
    }
}

#[async_trait]
impl ReadModel for ParcelHistoryView {
    fn name(&self) -> &'static str {
        "ParcelHistoryView"
    }

    async fn count(&self) -> usize {
        self.state.read().await.parcels.len()
    }
}
