//! Redis-backed geo registry.
//!
//! Key layout:
//! - `driver:status:{driverId}` → `ONLINE` | `BUSY` (deleted on offline)
//! - `online_drivers_locations` — geo set of dispatchable drivers
//! - `busy_drivers_locations` — geo set kept for operational visibility

use std::str::FromStr;

use async_trait::async_trait;
use common::{DriverId, GeoPoint};
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use redis::geo::{Coord, RadiusOptions, RadiusOrder, RadiusSearchResult, Unit};
use uuid::Uuid;

use crate::error::{RegistryError, Result};
use crate::registry::{DriverStatus, GeoRegistry, NearbyDriver};

const ONLINE_GEO_KEY: &str = "online_drivers_locations";
const BUSY_GEO_KEY: &str = "busy_drivers_locations";

fn status_key(driver_id: DriverId) -> String {
    format!("driver:status:{driver_id}")
}

/// Geo registry backed by Redis GEO commands.
///
/// Every operation is a short sequence of single-round-trip commands;
/// there is no cross-driver locking, and same-driver updates are
/// last-writer-wins.
#[derive(Clone)]
pub struct RedisGeoRegistry {
    conn: ConnectionManager,
}

impl RedisGeoRegistry {
    /// Creates a registry over an established connection manager.
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    /// Connects to Redis at the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self::new(conn))
    }
}

#[async_trait]
impl GeoRegistry for RedisGeoRegistry {
    async fn set_online(&self, driver_id: DriverId, position: GeoPoint) -> Result<()> {
        let mut con = self.conn.clone();
        let member = driver_id.to_string();

        let _: () = con
            .set(status_key(driver_id), DriverStatus::Online.as_str())
            .await?;
        let _: () = con
            .geo_add(
                ONLINE_GEO_KEY,
                (
                    Coord::lon_lat(position.longitude, position.latitude),
                    member.as_str(),
                ),
            )
            .await?;
        let _: () = con.zrem(BUSY_GEO_KEY, member.as_str()).await?;
        Ok(())
    }

    async fn set_offline(&self, driver_id: DriverId) -> Result<()> {
        let mut con = self.conn.clone();
        let member = driver_id.to_string();

        let _: () = con.del(status_key(driver_id)).await?;
        let _: () = con.zrem(ONLINE_GEO_KEY, member.as_str()).await?;
        let _: () = con.zrem(BUSY_GEO_KEY, member.as_str()).await?;
        Ok(())
    }

    async fn set_busy(&self, driver_id: DriverId, position: Option<GeoPoint>) -> Result<()> {
        let mut con = self.conn.clone();
        let member = driver_id.to_string();

        let _: () = con
            .set(status_key(driver_id), DriverStatus::Busy.as_str())
            .await?;
        let _: () = con.zrem(ONLINE_GEO_KEY, member.as_str()).await?;
        if let Some(position) = position {
            let _: () = con
                .geo_add(
                    BUSY_GEO_KEY,
                    (
                        Coord::lon_lat(position.longitude, position.latitude),
                        member.as_str(),
                    ),
                )
                .await?;
        }
        Ok(())
    }

    async fn status(&self, driver_id: DriverId) -> Result<DriverStatus> {
        let mut con = self.conn.clone();
        let status: Option<String> = con.get(status_key(driver_id)).await?;
        match status {
            None => Ok(DriverStatus::Offline),
            Some(s) => DriverStatus::from_str(&s).map_err(RegistryError::UnknownStatus),
        }
    }

    async fn find_nearby(
        &self,
        center: GeoPoint,
        radius_km: f64,
        limit: usize,
    ) -> Result<Vec<NearbyDriver>> {
        let mut con = self.conn.clone();
        let options = RadiusOptions::default()
            .with_coord()
            .with_dist()
            .order(RadiusOrder::Asc)
            .limit(limit);

        let results: Vec<RadiusSearchResult> = con
            .geo_radius(
                ONLINE_GEO_KEY,
                center.longitude,
                center.latitude,
                radius_km,
                Unit::Kilometers,
                options,
            )
            .await?;

        let hits = results
            .into_iter()
            .filter_map(|result| {
                let driver_id = Uuid::parse_str(&result.name).ok().map(DriverId::from_uuid)?;
                let coord = result.coord?;
                Some(NearbyDriver {
                    driver_id,
                    position: GeoPoint::new(coord.latitude, coord.longitude),
                    distance_km: result.dist.unwrap_or_default(),
                })
            })
            .collect();

        Ok(hits)
    }

    async fn update_location(&self, driver_id: DriverId, position: GeoPoint) -> Result<()> {
        if self.status(driver_id).await? != DriverStatus::Online {
            tracing::trace!(%driver_id, "discarding location update for non-online driver");
            return Ok(());
        }

        let mut con = self.conn.clone();
        let _: () = con
            .geo_add(
                ONLINE_GEO_KEY,
                (
                    Coord::lon_lat(position.longitude, position.latitude),
                    driver_id.to_string(),
                ),
            )
            .await?;
        Ok(())
    }
}
