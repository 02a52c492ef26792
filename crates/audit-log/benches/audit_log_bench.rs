use audit_log::{
    AppendOptions, AuditLog, AuditLogExt, AuditQuery, AuditRecord, InMemoryAuditLog, RegistryId,
    StateSnapshot, Version,
};
use criterion::{Criterion, criterion_group, criterion_main};

const CALLER: &str = "0x00000000000000000000000000000000000000aa";

fn parcel_record(registry_id: RegistryId, version: i64) -> AuditRecord {
    AuditRecord::builder()
        .registry_id(registry_id)
        .aggregate_type("Registry")
        .event_type("ParcelRegistered")
        .version(Version::new(version))
        .payload_raw(serde_json::json!({
            "type": "ParcelRegistered",
            "data": {
                "parcel_id": version,
                "owner": "0x00000000000000000000000000000000000000c1",
                "location": "Kathmandu",
                "area": 500,
                "registered_by": CALLER
            }
        }))
        .metadata("caller", serde_json::json!(CALLER))
        .build()
        .unwrap()
}

fn populated(rt: &tokio::runtime::Runtime, records: i64) -> (InMemoryAuditLog, RegistryId) {
    let log = InMemoryAuditLog::new();
    let registry_id = RegistryId::new();
    rt.block_on(async {
        let batch: Vec<AuditRecord> = (1..=records)
            .map(|v| parcel_record(registry_id, v))
            .collect();
        log.append(batch, AppendOptions::new()).await.unwrap();
    });
    (log, registry_id)
}

fn bench_append_with_version_check(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("audit_log/append_with_version_check", |b| {
        b.iter(|| {
            rt.block_on(async {
                let log = InMemoryAuditLog::new();
                let record = parcel_record(RegistryId::new(), 1);
                log.append(vec![record], AppendOptions::expect_new())
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_append_batch_10(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("audit_log/append_batch_10", |b| {
        b.iter(|| {
            rt.block_on(async {
                let log = InMemoryAuditLog::new();
                let registry_id = RegistryId::new();
                let batch: Vec<AuditRecord> =
                    (1..=10).map(|v| parcel_record(registry_id, v)).collect();
                log.append(batch, AppendOptions::new()).await.unwrap();
            });
        });
    });
}

fn bench_records_for_registry(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (log, registry_id) = populated(&rt, 100);

    c.bench_function("audit_log/records_for_registry_100", |b| {
        b.iter(|| {
            rt.block_on(async {
                log.records_for_registry(registry_id).await.unwrap();
            });
        });
    });
}

fn bench_load_history_after_snapshot(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (log, registry_id) = populated(&rt, 100);

    // Snapshot at 90 leaves ten records to replay
    rt.block_on(async {
        let snapshot = StateSnapshot::capture(
            registry_id,
            "Registry",
            Version::new(90),
            &serde_json::json!({"parcel_count": 90}),
        )
        .unwrap();
        log.save_snapshot(snapshot).await.unwrap();
    });

    c.bench_function("audit_log/load_history_snapshot_90_of_100", |b| {
        b.iter(|| {
            rt.block_on(async {
                log.load_history(registry_id).await.unwrap();
            });
        });
    });
}

fn bench_query_by_type(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (log, registry_id) = populated(&rt, 100);

    c.bench_function("audit_log/query_type_and_version", |b| {
        b.iter(|| {
            rt.block_on(async {
                log.query(
                    AuditQuery::for_registry(registry_id)
                        .event_type("ParcelRegistered")
                        .from_version(Version::new(50)),
                )
                .await
                .unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_append_with_version_check,
    bench_append_batch_10,
    bench_records_for_registry,
    bench_load_history_after_snapshot,
    bench_query_by_type,
);
criterion_main!(benches);
