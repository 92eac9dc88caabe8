//! Trip lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use chrono::{DateTime, Utc};
use common::{DriverId, GeoPoint, PassengerId, TripId};
use dispatch::GeoRegistry;
use domain::{FareCategory, Trip};
use rust_decimal::Decimal;
use saga::TripService;
use serde::{Deserialize, Serialize};
use trip_store::TripStore;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: TripStore, G: GeoRegistry> {
    pub trips: TripService<S>,
    pub registry: G,
}

// -- Request types --

#[derive(Deserialize)]
pub struct CreateTripRequest {
    pub passenger_id: Option<String>,
    pub start: CoordinatesRequest,
    pub end: CoordinatesRequest,
    pub category: Option<String>,
}

#[derive(Deserialize)]
pub struct CoordinatesRequest {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Deserialize)]
pub struct AcceptTripRequest {
    pub driver_id: String,
}

#[derive(Deserialize)]
pub struct CancelTripRequest {
    pub reason: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct TripResponse {
    pub id: TripId,
    pub passenger_id: PassengerId,
    pub driver_id: Option<DriverId>,
    pub status: String,
    pub category: String,
    pub start: GeoPoint,
    pub end: GeoPoint,
    pub fare: Option<Decimal>,
    pub requested_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl From<&Trip> for TripResponse {
    fn from(trip: &Trip) -> Self {
        Self {
            id: trip.id(),
            passenger_id: trip.passenger_id(),
            driver_id: trip.driver_id(),
            status: trip.status().to_string(),
            category: trip.category().to_string(),
            start: trip.start_point(),
            end: trip.end(),
            fare: trip.fare(),
            requested_at: trip.requested_at(),
            started_at: trip.started_at(),
            ended_at: trip.ended_at(),
        }
    }
}

// -- Handlers --

/// POST /trips — request a new trip.
#[tracing::instrument(skip(state, req))]
pub async fn create<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    Json(req): Json<CreateTripRequest>,
) -> Result<(axum::http::StatusCode, Json<TripResponse>), ApiError>
where
    S: TripStore + 'static,
    G: GeoRegistry + 'static,
{
    let passenger_id = match &req.passenger_id {
        Some(id_str) => {
            let uuid = uuid::Uuid::parse_str(id_str)
                .map_err(|e| ApiError::BadRequest(format!("Invalid passenger_id: {e}")))?;
            PassengerId::from_uuid(uuid)
        }
        None => PassengerId::new(),
    };

    let start = validated_point(&req.start)?;
    let end = validated_point(&req.end)?;
    let category = req
        .category
        .as_deref()
        .map(FareCategory::from_tag)
        .unwrap_or_default();

    let trip = state
        .trips
        .request_trip(passenger_id, start, end, category)
        .await?;

    Ok((axum::http::StatusCode::CREATED, Json((&trip).into())))
}

/// GET /trips/{id} — load a trip by id.
#[tracing::instrument(skip(state))]
pub async fn get<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    Path(id): Path<String>,
) -> Result<Json<TripResponse>, ApiError>
where
    S: TripStore + 'static,
    G: GeoRegistry + 'static,
{
    let trip_id = parse_trip_id(&id)?;
    let trip = state
        .trips
        .get_trip(trip_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Trip {id} not found")))?;

    Ok(Json((&trip).into()))
}

/// POST /trips/{id}/accept — a driver accepts the trip.
///
/// Under contention, only one acceptor gets 200; the rest get 409.
#[tracing::instrument(skip(state, req))]
pub async fn accept<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    Path(id): Path<String>,
    Json(req): Json<AcceptTripRequest>,
) -> Result<Json<TripResponse>, ApiError>
where
    S: TripStore + 'static,
    G: GeoRegistry + 'static,
{
    let trip_id = parse_trip_id(&id)?;
    let driver_uuid = uuid::Uuid::parse_str(&req.driver_id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid driver_id: {e}")))?;
    let driver_id = DriverId::from_uuid(driver_uuid);

    let trip = state.trips.accept(trip_id, driver_id).await?;

    // The accepting driver is no longer dispatchable.
    state.registry.set_busy(driver_id, None).await?;

    Ok(Json((&trip).into()))
}

/// POST /trips/{id}/start — the passenger is picked up.
#[tracing::instrument(skip(state))]
pub async fn start<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    Path(id): Path<String>,
) -> Result<Json<TripResponse>, ApiError>
where
    S: TripStore + 'static,
    G: GeoRegistry + 'static,
{
    let trip_id = parse_trip_id(&id)?;
    let trip = state.trips.start(trip_id).await?;
    Ok(Json((&trip).into()))
}

/// POST /trips/{id}/complete — the ride ends and the fare is computed.
#[tracing::instrument(skip(state))]
pub async fn complete<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    Path(id): Path<String>,
) -> Result<Json<TripResponse>, ApiError>
where
    S: TripStore + 'static,
    G: GeoRegistry + 'static,
{
    let trip_id = parse_trip_id(&id)?;
    let trip = state.trips.complete(trip_id).await?;
    Ok(Json((&trip).into()))
}

/// POST /trips/{id}/cancel — cancel a trip before completion.
///
/// The body is optional; when present, its reason is recorded on the
/// published TRIP_CANCELLED event.
#[tracing::instrument(skip(state, body))]
pub async fn cancel<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    Path(id): Path<String>,
    body: Option<Json<CancelTripRequest>>,
) -> Result<Json<TripResponse>, ApiError>
where
    S: TripStore + 'static,
    G: GeoRegistry + 'static,
{
    let trip_id = parse_trip_id(&id)?;
    let reason = body.and_then(|Json(req)| req.reason);
    let trip = state.trips.cancel(trip_id, reason).await?;
    Ok(Json((&trip).into()))
}

fn parse_trip_id(id: &str) -> Result<TripId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))?;
    Ok(TripId::from_uuid(uuid))
}

pub(crate) fn validated_point(req: &CoordinatesRequest) -> Result<GeoPoint, ApiError> {
    if !(-90.0..=90.0).contains(&req.latitude) {
        return Err(ApiError::BadRequest(format!(
            "latitude out of range: {}",
            req.latitude
        )));
    }
    if !(-180.0..=180.0).contains(&req.longitude) {
        return Err(ApiError::BadRequest(format!(
            "longitude out of range: {}",
            req.longitude
        )));
    }
    Ok(GeoPoint::new(req.latitude, req.longitude))
}
