//! HTTP API server with observability for the trip lifecycle system.
//!
//! Provides REST endpoints for trip transitions and driver availability,
//! with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use dispatch::{GeoRegistry, InMemoryGeoRegistry};
use metrics_exporter_prometheus::PrometheusHandle;
use saga::TripService;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use trip_store::{InMemoryTripStore, TripStore};

use routes::trips::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, G>(state: Arc<AppState<S, G>>, metrics_handle: PrometheusHandle) -> Router
where
    S: TripStore + 'static,
    G: GeoRegistry + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/trips", post(routes::trips::create::<S, G>))
        .route("/trips/{id}", get(routes::trips::get::<S, G>))
        .route("/trips/{id}/accept", post(routes::trips::accept::<S, G>))
        .route("/trips/{id}/start", post(routes::trips::start::<S, G>))
        .route(
            "/trips/{id}/complete",
            post(routes::trips::complete::<S, G>),
        )
        .route("/trips/{id}/cancel", post(routes::trips::cancel::<S, G>))
        .route(
            "/drivers/{id}/status",
            put(routes::drivers::set_status::<S, G>).get(routes::drivers::get_status::<S, G>),
        )
        .route("/drivers/nearby", get(routes::drivers::nearby::<S, G>))
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

/// Creates application state over the given store and registry.
pub fn create_state<S, G>(store: S, registry: G) -> Arc<AppState<S, G>>
where
    S: TripStore + 'static,
    G: GeoRegistry + 'static,
{
    Arc::new(AppState {
        trips: TripService::new(store),
        registry,
    })
}

/// Creates fully in-memory application state, for local runs and tests.
pub fn create_default_state() -> Arc<AppState<InMemoryTripStore, InMemoryGeoRegistry>> {
    create_state(InMemoryTripStore::new(), InMemoryGeoRegistry::new())
}
