//! Parcel registration, lookup and transfer endpoints.

use std::sync::Arc;

use audit_log::AuditLog;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use projections::ParcelHistory;
use registry::{Parcel, RegisterParcel, TransferParcel};
use serde::{Deserialize, Serialize};

use super::{AppState, parse_identity, parse_parcel_id};
use crate::caller::Caller;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct RegisterParcelRequest {
    pub owner: String,
    pub location: String,
    pub area: u64,
}

#[derive(Deserialize)]
pub struct TransferParcelRequest {
    pub new_owner: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct ParcelResponse {
    pub id: u64,
    pub location: String,
    pub area: u64,
    pub owner: String,
    pub locked: bool,
}

impl From<Parcel> for ParcelResponse {
    fn from(parcel: Parcel) -> Self {
        Self {
            id: parcel.id.as_u64(),
            locked: parcel.is_locked(),
            owner: parcel.owner.to_string(),
            location: parcel.location,
            area: parcel.area,
        }
    }
}

#[derive(Serialize)]
pub struct ParcelRegisteredResponse {
    pub parcel_id: u64,
    pub version: i64,
}

#[derive(Serialize)]
pub struct ParcelCountResponse {
    pub parcel_count: u64,
}

#[derive(Serialize)]
pub struct OwnerParcelsResponse {
    pub owner: String,
    pub parcels: Vec<u64>,
}

// -- Handlers --

/// `POST /parcels`: register a parcel on behalf of its owner.
#[tracing::instrument(skip(state, req))]
pub async fn register<S: AuditLog + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(caller): Caller,
    Json(req): Json<RegisterParcelRequest>,
) -> Result<(StatusCode, Json<ParcelRegisteredResponse>), ApiError> {
    let owner = parse_identity("owner", &req.owner)?;

    let (parcel_id, result) = state
        .service
        .register_parcel(RegisterParcel::new(
            state.registry_id,
            caller,
            owner,
            req.location,
            req.area,
        ))
        .await?;

    let response = ParcelRegisteredResponse {
        parcel_id: parcel_id.as_u64(),
        version: result.new_version.as_i64(),
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// `GET /parcels/count`: number of parcels ever registered.
#[tracing::instrument(skip(state))]
pub async fn count<S: AuditLog + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<ParcelCountResponse>, ApiError> {
    let parcel_count = state.service.parcel_count(state.registry_id).await?;
    Ok(Json(ParcelCountResponse { parcel_count }))
}

/// `GET /parcels/{id}`: the parcel record.
///
/// An unknown id answers with the zero-valued record (null owner), not 404.
#[tracing::instrument(skip(state))]
pub async fn get<S: AuditLog + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ParcelResponse>, ApiError> {
    let parcel_id = parse_parcel_id(&id)?;
    let parcel = state
        .service
        .get_parcel(state.registry_id, parcel_id)
        .await?;

    Ok(Json(parcel.into()))
}

/// `POST /parcels/{id}/transfer`: move ownership to a new identity.
#[tracing::instrument(skip(state, req))]
pub async fn transfer<S: AuditLog + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(caller): Caller,
    Path(id): Path<String>,
    Json(req): Json<TransferParcelRequest>,
) -> Result<Json<ParcelResponse>, ApiError> {
    let parcel_id = parse_parcel_id(&id)?;
    let new_owner = parse_identity("new_owner", &req.new_owner)?;

    let result = state
        .service
        .transfer_parcel(TransferParcel::new(
            state.registry_id,
            caller,
            parcel_id,
            new_owner,
        ))
        .await?;

    Ok(Json(result.aggregate.parcel(parcel_id).into()))
}

/// `GET /parcels/{id}/history`: every owner the parcel has had.
#[tracing::instrument(skip(state))]
pub async fn history<S: AuditLog + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ParcelHistory>, ApiError> {
    let parcel_id = parse_parcel_id(&id)?;

    // Run catch-up to ensure the read model includes latest records
    state.catch_up().await?;

    let history = state
        .history
        .history(state.registry_id, parcel_id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Parcel {parcel_id} not registered")))?;

    Ok(Json(history))
}

/// `GET /owners/{identity}/parcels`: parcels currently held by an identity.
#[tracing::instrument(skip(state))]
pub async fn owned_by<S: AuditLog + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(identity): Path<String>,
) -> Result<Json<OwnerParcelsResponse>, ApiError> {
    let owner = parse_identity("owner", &identity)?;

    state.catch_up().await?;

    let parcels = state
        .owners
        .parcels_of(state.registry_id, owner)
        .await
        .into_iter()
        .map(|id| id.as_u64())
        .collect();

    Ok(Json(OwnerParcelsResponse {
        owner: owner.to_string(),
        parcels,
    }))
}
