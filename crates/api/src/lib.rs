//! HTTP API server with observability for the parcel registry.
//!
//! Exposes one registry's role, parcel and transfer operations over REST,
//! with structured logging (tracing) and Prometheus metrics.

pub mod caller;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use audit_log::{AuditLog, RegistryId};
use axum::Router;
use axum::routing::{get, post};
use common::Identity;
use metrics_exporter_prometheus::PrometheusHandle;
use projections::{OwnerParcelsView, ParcelHistoryView, Projection, ProjectionProcessor};
use registry::{CreateRegistry, DomainError, RegistryService};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: AuditLog + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<S>))
        .route("/registry", get(routes::registry::info::<S>))
        .route("/registry/events", get(routes::registry::events::<S>))
        .route("/registry/officers", post(routes::registry::add_officer::<S>))
        .route(
            "/registry/officers/{identity}",
            get(routes::registry::officer_status::<S>),
        )
        .route(
            "/registry/administration/transfer",
            post(routes::registry::transfer_administration::<S>),
        )
        .route(
            "/registry/administration/renounce",
            post(routes::registry::renounce_administration::<S>),
        )
        .route("/parcels", post(routes::parcels::register::<S>))
        .route("/parcels/count", get(routes::parcels::count::<S>))
        .route("/parcels/{id}", get(routes::parcels::get::<S>))
        .route("/parcels/{id}/transfer", post(routes::parcels::transfer::<S>))
        .route("/parcels/{id}/history", get(routes::parcels::history::<S>))
        .route(
            "/owners/{identity}/parcels",
            get(routes::parcels::owned_by::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state for the configured registry.
///
/// The first registry found in the log is reused; an empty log gets a new
/// registry named and administered as `config` says.
pub async fn create_default_state<S: AuditLog + Clone + 'static>(
    log: S,
    config: &Config,
) -> Result<(Arc<AppState<S>>, Arc<ProjectionProcessor<S>>), DomainError> {
    let service =
        RegistryService::new(log.clone()).with_snapshot_interval(config.snapshot_interval);

    let registry_id = bootstrap_registry(
        &service,
        &log,
        &config.registry_name,
        config.registry_admin,
    )
    .await?;

    let owners = OwnerParcelsView::new();
    let history = ParcelHistoryView::new();

    let mut processor = ProjectionProcessor::new(log.clone());
    processor.register(Box::new(owners.clone()) as Box<dyn Projection>);
    processor.register(Box::new(history.clone()) as Box<dyn Projection>);
    let processor = Arc::new(processor);

    let state = Arc::new(AppState {
        service,
        registry_id,
        log,
        owners,
        history,
        projection_processor: processor.clone(),
    });

    Ok((state, processor))
}

/// Returns the registry this server fronts, creating it on first start.
pub async fn bootstrap_registry<S: AuditLog>(
    service: &RegistryService<S>,
    log: &S,
    name: &str,
    administrator: Identity,
) -> Result<RegistryId, DomainError> {
    let created = log.records_by_type("RegistryCreated").await?;
    if let Some(record) = created.first() {
        tracing::info!(registry_id = %record.registry_id, "using existing registry");
        return Ok(record.registry_id);
    }

    let registry_id = RegistryId::new();
    service
        .create_registry(CreateRegistry::new(registry_id, name, administrator))
        .await?;
    tracing::info!(%registry_id, %administrator, name, "created registry");

    Ok(registry_id)
}
