//! Driver availability and proximity endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use common::DriverId;
use dispatch::{DEFAULT_NEARBY_LIMIT, DriverStatus, GeoRegistry};
use serde::{Deserialize, Serialize};
use trip_store::TripStore;

use crate::error::ApiError;
use crate::routes::trips::{AppState, CoordinatesRequest, validated_point};

// -- Request types --

#[derive(Deserialize)]
pub struct StatusChangeRequest {
    pub status: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Deserialize)]
pub struct NearbyQuery {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: f64,
    pub limit: Option<usize>,
}

// -- Response types --

#[derive(Serialize)]
pub struct DriverStatusResponse {
    pub driver_id: DriverId,
    pub status: String,
}

#[derive(Serialize)]
pub struct NearbyDriverResponse {
    pub driver_id: DriverId,
    pub latitude: f64,
    pub longitude: f64,
    pub distance_km: f64,
}

// -- Handlers --

/// PUT /drivers/{id}/status — change a driver's availability.
///
/// Going ONLINE requires coordinates; a driver with no known position
/// cannot be dispatched. BUSY takes them optionally, OFFLINE ignores
/// them.
#[tracing::instrument(skip(state, req))]
pub async fn set_status<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    Path(id): Path<String>,
    Json(req): Json<StatusChangeRequest>,
) -> Result<Json<DriverStatusResponse>, ApiError>
where
    S: TripStore + 'static,
    G: GeoRegistry + 'static,
{
    let driver_id = parse_driver_id(&id)?;
    let status: DriverStatus = req.status.parse().map_err(ApiError::BadRequest)?;

    let position = match (req.latitude, req.longitude) {
        (Some(latitude), Some(longitude)) => Some(validated_point(&CoordinatesRequest {
            latitude,
            longitude,
        })?),
        (None, None) => None,
        _ => {
            return Err(ApiError::BadRequest(
                "latitude and longitude must be supplied together".to_string(),
            ));
        }
    };

    match status {
        DriverStatus::Online => {
            let position = position.ok_or_else(|| {
                ApiError::BadRequest("going ONLINE requires latitude and longitude".to_string())
            })?;
            state.registry.set_online(driver_id, position).await?;
        }
        DriverStatus::Offline => state.registry.set_offline(driver_id).await?,
        DriverStatus::Busy => state.registry.set_busy(driver_id, position).await?,
    }

    metrics::counter!("driver_status_changes_total", "status" => status.as_str()).increment(1);
    Ok(Json(DriverStatusResponse {
        driver_id,
        status: status.to_string(),
    }))
}

/// GET /drivers/{id}/status — read a driver's availability.
#[tracing::instrument(skip(state))]
pub async fn get_status<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    Path(id): Path<String>,
) -> Result<Json<DriverStatusResponse>, ApiError>
where
    S: TripStore + 'static,
    G: GeoRegistry + 'static,
{
    let driver_id = parse_driver_id(&id)?;
    let status = state.registry.status(driver_id).await?;
    Ok(Json(DriverStatusResponse {
        driver_id,
        status: status.to_string(),
    }))
}

/// GET /drivers/nearby — ONLINE drivers within a radius, nearest first.
#[tracing::instrument(skip(state, query))]
pub async fn nearby<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    Query(query): Query<NearbyQuery>,
) -> Result<Json<Vec<NearbyDriverResponse>>, ApiError>
where
    S: TripStore + 'static,
    G: GeoRegistry + 'static,
{
    let center = validated_point(&CoordinatesRequest {
        latitude: query.latitude,
        longitude: query.longitude,
    })?;
    if query.radius_km <= 0.0 {
        return Err(ApiError::BadRequest(format!(
            "radius_km must be positive: {}",
            query.radius_km
        )));
    }
    let limit = query.limit.unwrap_or(DEFAULT_NEARBY_LIMIT);

    let hits = state
        .registry
        .find_nearby(center, query.radius_km, limit)
        .await?;

    let responses = hits
        .into_iter()
        .map(|hit| NearbyDriverResponse {
            driver_id: hit.driver_id,
            latitude: hit.position.latitude,
            longitude: hit.position.longitude,
            distance_km: hit.distance_km,
        })
        .collect();

    Ok(Json(responses))
}

fn parse_driver_id(id: &str) -> Result<DriverId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))?;
    Ok(DriverId::from_uuid(uuid))
}
