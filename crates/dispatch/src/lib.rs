//! Driver availability and geo-dispatch registry.
//!
//! Tracks each driver's availability status and last known position, and
//! answers "who is near (lat, lon) and available". Only ONLINE drivers are
//! dispatch targets; BUSY drivers keep a position for operational
//! visibility but never show up in proximity results.

mod error;
mod memory;
mod redis_registry;
mod registry;

pub use error::{RegistryError, Result};
pub use memory::InMemoryGeoRegistry;
pub use redis_registry::RedisGeoRegistry;
pub use registry::{DEFAULT_NEARBY_LIMIT, DriverStatus, GeoRegistry, NearbyDriver};
