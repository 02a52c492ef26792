//! Parcels per owner: which parcels does an identity currently own?

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use audit_log::AuditRecord;
use common::{Identity, ParcelId, RegistryId};
use registry::{Aggregate, Registry, RegistryEvent};
use tokio::sync::RwLock;

use crate::Result;
use crate::projection::{Projection, ProjectionPosition};
use crate::read_model::ReadModel;

struct OwnerParcelsState {
    owners: HashMap<(RegistryId, Identity), BTreeSet<ParcelId>>,
    position: ProjectionPosition,
}

/// Current parcel holdings keyed by registry and owner.
#[derive(Clone)]
pub struct OwnerParcelsView {
    state: Arc<RwLock<OwnerParcelsState>>,
}

impl OwnerParcelsView {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(OwnerParcelsState {
                owners: HashMap::new(),
                position: ProjectionPosition::zero(),
            })),
        }
    }

    /// Parcels `owner` holds in the registry, in id order.
    pub async fn parcels_of(&self, registry_id: RegistryId, owner: Identity) -> Vec<ParcelId> {
        self.state
            .read()
            .await
            .owners
            .get(&(registry_id, owner))
            .map(|parcels| parcels.iter().copied().collect())
            .unwrap_or_default()
    }

    pub async fn owns(
        &self,
        registry_id: RegistryId,
        owner: Identity,
        parcel_id: ParcelId,
    ) -> bool {
        self.state
            .read()
            .await
            .owners
            .get(&(registry_id, owner))
            .is_some_and(|parcels| parcels.contains(&parcel_id))
    }
}

impl Default for OwnerParcelsView {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Projection for OwnerParcelsView {
    fn name(&self) -> &'static str {
        "OwnerParcelsView"
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
                state
                    .owners
                    .entry((registry_id, data.owner))
                    .or_default()
                    .insert(data.parcel_id);
            }
            RegistryEvent::ParcelOwnershipTransferred(data) => {
                let key = (registry_id, data.previous_owner);
                if let Some(parcels) = state.owners.get_mut(&key) {
                    parcels.remove(&data.parcel_id);
                    if parcels.is_empty() {
                        state.owners.remove(&key);
                    }
                }
                state
                    .owners
                    .entry((registry_id, data.new_owner))
                    .or_default()
                    .insert(data.parcel_id);
            }
            // roles don't change holdings
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
        state.owners.clear();
        state.position = ProjectionPosition::zero();
        Ok(())
    }
}

#[async_trait]
impl ReadModel for OwnerParcelsView {
    fn name(&self) -> &'static str {
        "OwnerParcelsView"
    }

    async fn count(&self) -> usize {
        self.state.read().await.owners.len()
    }
}
