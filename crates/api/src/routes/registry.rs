//! Registry-wide endpoints: roles, administration and the audit trail.

use std::sync::Arc;

use audit_log::AuditLog;
use axum::Json;
use axum::extract::{Path, State};
use registry::{AddOfficer, CommandResult, Registry, RenounceAdministration, TransferAdministration};
use serde::{Deserialize, Serialize};

use super::{AppState, CommandAccepted, parse_identity};
use crate::caller::Caller;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct AddOfficerRequest {
    pub identity: String,
}

#[derive(Deserialize)]
pub struct TransferAdministrationRequest {
    pub new_administrator: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct RegistryResponse {
    pub registry_id: String,
    pub name: String,
    pub administrator: String,
    pub renounced: bool,
    pub officer_count: usize,
    pub parcel_count: u64,
}

#[derive(Serialize)]
pub struct OfficerStatusResponse {
    pub identity: String,
    pub is_officer: bool,
}

/// Response type for audit record data.
#[derive(Serialize)]
pub struct AuditRecordResponse {
    pub record_id: String,
    pub event_type: String,
    pub version: i64,
    pub recorded_at: String,
    pub caller: Option<String>,
    pub payload: serde_json::Value,
}

// -- Handlers --

/// `GET /registry`: name, administrator and counters.
#[tracing::instrument(skip(state))]
pub async fn info<S: AuditLog + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<RegistryResponse>, ApiError> {
    let registry = state.service.get_registry(state.registry_id).await?;

    Ok(Json(RegistryResponse {
        registry_id: state.registry_id.to_string(),
        name: registry.name().to_string(),
        administrator: registry.administrator().to_string(),
        renounced: registry.roles().is_renounced(),
        officer_count: registry.roles().officer_count(),
        parcel_count: registry.parcel_count(),
    }))
}

/// `POST /registry/officers`: authorize an officer.
#[tracing::instrument(skip(state, req))]
pub async fn add_officer<S: AuditLog + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(caller): Caller,
    Json(req): Json<AddOfficerRequest>,
) -> Result<Json<CommandAccepted>, ApiError> {
    let officer = parse_identity("identity", &req.identity)?;

    let result = state
        .service
        .add_officer(AddOfficer::new(state.registry_id, caller, officer))
        .await?;

    Ok(Json(accepted(&state, &result)))
}

/// `GET /registry/officers/{identity}`: officer membership check.
#[tracing::instrument(skip(state))]
pub async fn officer_status<S: AuditLog + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(identity): Path<String>,
) -> Result<Json<OfficerStatusResponse>, ApiError> {
    let identity = parse_identity("identity", &identity)?;
    let is_officer = state
        .service
        .is_officer(state.registry_id, identity)
        .await?;

    Ok(Json(OfficerStatusResponse {
        identity: identity.to_string(),
        is_officer,
    }))
}

/// `POST /registry/administration/transfer`: hand the administrator role on.
#[tracing::instrument(skip(state, req))]
pub async fn transfer_administration<S: AuditLog + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(caller): Caller,
    Json(req): Json<TransferAdministrationRequest>,
) -> Result<Json<CommandAccepted>, ApiError> {
    let new_administrator = parse_identity("new_administrator", &req.new_administrator)?;

    let result = state
        .service
        .transfer_administration(TransferAdministration::new(
            state.registry_id,
            caller,
            new_administrator,
        ))
        .await?;

    Ok(Json(accepted(&state, &result)))
}

/// `POST /registry/administration/renounce`: vacate the administrator role
/// permanently. No administrator-gated call succeeds afterwards.
#[tracing::instrument(skip(state))]
pub async fn renounce_administration<S: AuditLog + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(caller): Caller,
) -> Result<Json<CommandAccepted>, ApiError> {
    let result = state
        .service
        .renounce_administration(RenounceAdministration::new(state.registry_id, caller))
        .await?;

    tracing::warn!(%caller, "registry administration renounced");
    Ok(Json(accepted(&state, &result)))
}

/// `GET /registry/events`: every audit record of the registry, oldest first.
#[tracing::instrument(skip(state))]
pub async fn events<S: AuditLog + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<AuditRecordResponse>>, ApiError> {
    let records = state.log.records_for_registry(state.registry_id).await?;

    let responses: Vec<AuditRecordResponse> = records
        .into_iter()
        .map(|r| AuditRecordResponse {
            record_id: r.record_id.to_string(),
            caller: r
                .metadata
                .get("caller")
                .and_then(|v| v.as_str())
                .map(String::from),
            event_type: r.event_type,
            version: r.version.as_i64(),
            recorded_at: r.recorded_at.to_rfc3339(),
            payload: r.payload,
        })
        .collect();

    Ok(Json(responses))
}

fn accepted<S: AuditLog>(state: &AppState<S>, result: &CommandResult<Registry>) -> CommandAccepted {
    CommandAccepted {
        registry_id: state.registry_id.to_string(),
        version: result.new_version.as_i64(),
    }
}
