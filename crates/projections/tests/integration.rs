//! Integration tests: RegistryService commands → ProjectionProcessor → views.

use audit_log::InMemoryAuditLog;
use common::{Identity, ParcelId, RegistryId};
use projections::{OwnerParcelsView, ParcelHistoryView, ProjectionProcessor};
use registry::{AddOfficer, CreateRegistry, RegisterParcel, RegistryService, TransferParcel};

fn identity(last: u8) -> Identity {
    let mut bytes = [0u8; 20];
    bytes[19] = last;
    Identity::from_bytes(bytes)
}

const ADMIN: u8 = 1;
const OFFICER: u8 = 2;

struct Fixture {
    service: RegistryService<InMemoryAuditLog>,
    processor: ProjectionProcessor<InMemoryAuditLog>,
    owners: OwnerParcelsView,
    history: ParcelHistoryView,
    registry_id: RegistryId,
}

async fn setup() -> Fixture {
    let log = InMemoryAuditLog::new();
    let service = RegistryService::new(log.clone());

    let cmd = CreateRegistry::with_default_name(identity(ADMIN));
    let registry_id = cmd.registry_id;
    service.create_registry(cmd).await.unwrap();
    service
        .add_officer(AddOfficer::new(registry_id, identity(ADMIN), identity(OFFICER)))
        .await
        .unwrap();

    let owners = OwnerParcelsView::new();
    let history = ParcelHistoryView::new();
    let mut processor = ProjectionProcessor::new(log);
    processor.register(Box::new(owners.clone()));
    processor.register(Box::new(history.clone()));

    Fixture {
        service,
        processor,
        owners,
        history,
        registry_id,
    }
}

impl Fixture {
    async fn register(&self, owner: u8, location: &str) -> ParcelId {
        let (parcel_id, _) = self
            .service
            .register_parcel(RegisterParcel::new(
                self.registry_id,
                identity(OFFICER),
                identity(owner),
                location,
                100,
            ))
            .await
            .unwrap();
        parcel_id
    }

    async fn transfer(&self, from: u8, parcel_id: ParcelId, to: u8) {
        self.service
            .transfer_parcel(TransferParcel::new(
                self.registry_id,
                identity(from),
                parcel_id,
                identity(to),
            ))
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn views_follow_registrations_and_transfers() {
    let fx = setup().await;

    let first = fx.register(10, "Kathmandu").await;
    let second = fx.register(10, "Lalitpur").await;
    fx.transfer(10, first, 11).await;
    fx.transfer(11, first, 12).await;

    fx.processor.run_catch_up().await.unwrap();

    assert_eq!(
        fx.owners.parcels_of(fx.registry_id, identity(10)).await,
        vec![second]
    );
    assert!(
        fx.owners
            .parcels_of(fx.registry_id, identity(11))
            .await
            .is_empty()
    );
    assert_eq!(
        fx.owners.parcels_of(fx.registry_id, identity(12)).await,
        vec![first]
    );

    let history = fx.history.history(fx.registry_id, first).await.unwrap();
    let chain: Vec<_> = history.owners.iter().map(|e| e.owner).collect();
    assert_eq!(chain, vec![identity(10), identity(11), identity(12)]);
    assert_eq!(history.registered_by, identity(OFFICER));
}

#[tokio::test]
async fn rejected_commands_leave_views_alone() {
    let fx = setup().await;
    let parcel_id = fx.register(10, "Kathmandu").await;

    let rejected = fx
        .service
        .transfer_parcel(TransferParcel::new(
            fx.registry_id,
            identity(11),
            parcel_id,
            identity(11),
        ))
        .await;
    assert!(rejected.is_err());

    fx.processor.run_catch_up().await.unwrap();

    assert!(fx.owners.owns(fx.registry_id, identity(10), parcel_id).await);
    let history = fx.history.history(fx.registry_id, parcel_id).await.unwrap();
    assert_eq!(history.transfer_count(), 0);
}

#[tokio::test]
async fn incremental_catch_up_matches_rebuild() {
    let fx = setup().await;

    let parcel_id = fx.register(10, "Bhaktapur").await;
    fx.processor.run_catch_up().await.unwrap();

    fx.transfer(10, parcel_id, 11).await;
    fx.register(11, "Pokhara").await;
    fx.processor.run_catch_up().await.unwrap();

    let incremental = fx.owners.parcels_of(fx.registry_id, identity(11)).await;

    fx.processor.rebuild_all().await.unwrap();
    let rebuilt = fx.owners.parcels_of(fx.registry_id, identity(11)).await;

    assert_eq!(incremental, rebuilt);
    assert_eq!(rebuilt, vec![ParcelId::new(1), ParcelId::new(2)]);
}
