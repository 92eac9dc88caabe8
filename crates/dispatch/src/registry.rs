//! The geo registry port.

use async_trait::async_trait;
use common::{DriverId, GeoPoint};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default result cap for proximity queries.
pub const DEFAULT_NEARBY_LIMIT: usize = 10;

/// Availability status of a driver.
///
/// OFFLINE is never stored: going offline deletes the status key and both
/// geo entries, so an absent status reads back as offline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DriverStatus {
    /// Available for dispatch.
    Online,

    /// Not registered or signed off.
    Offline,

    /// On a trip; visible operationally but not dispatchable.
    Busy,
}

impl DriverStatus {
    /// Returns the status in its wire form.
    pub fn as_str(&self) -> &'static str {
        match self {
            DriverStatus::Online => "ONLINE",
            DriverStatus::Offline => "OFFLINE",
            DriverStatus::Busy => "BUSY",
        }
    }
}

impl std::fmt::Display for DriverStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DriverStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "ONLINE" => Ok(DriverStatus::Online),
            "OFFLINE" => Ok(DriverStatus::Offline),
            "BUSY" => Ok(DriverStatus::Busy),
            other => Err(format!("unknown driver status: {other}")),
        }
    }
}

/// A proximity query hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearbyDriver {
    pub driver_id: DriverId,
    pub position: GeoPoint,
    pub distance_km: f64,
}

/// Availability registry backing proximity search.
///
/// Updates to different drivers are fully independent; updates to the
/// same driver are last-writer-wins, since a driver has one authoritative
/// location source at a time.
#[async_trait]
pub trait GeoRegistry: Send + Sync {
    /// Marks a driver available for dispatch at the given position.
    /// Removes any stale entry from the busy set.
    async fn set_online(&self, driver_id: DriverId, position: GeoPoint) -> Result<()>;

    /// Removes the driver from the registry entirely.
    async fn set_offline(&self, driver_id: DriverId) -> Result<()>;

    /// Marks a driver busy, removing it from the online set. A supplied
    /// position is recorded in the busy set for operational visibility.
    async fn set_busy(&self, driver_id: DriverId, position: Option<GeoPoint>) -> Result<()>;

    /// Returns the driver's status; `Offline` when not registered.
    async fn status(&self, driver_id: DriverId) -> Result<DriverStatus>;

    /// Returns up to `limit` ONLINE drivers within `radius_km` of
    /// `center`, ascending by distance. This is the dispatch-eligibility
    /// filter: drivers in any other status are invisible here.
    async fn find_nearby(
        &self,
        center: GeoPoint,
        radius_km: f64,
        limit: usize,
    ) -> Result<Vec<NearbyDriver>>;

    /// Ingests a position update. Only ONLINE drivers are dispatch
    /// targets, so updates for drivers in any other status are discarded.
    async fn update_location(&self, driver_id: DriverId, position: GeoPoint) -> Result<()>;
}
