//! Shared types used across the ride lifecycle services.

pub mod geo;
pub mod ids;

pub use geo::GeoPoint;
pub use ids::{DriverId, MessageId, PassengerId, TripId};
