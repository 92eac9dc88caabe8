use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{DriverId, GeoPoint};
use tokio::sync::RwLock;

use crate::error::Result;
use crate::registry::{DriverStatus, GeoRegistry, NearbyDriver};

#[derive(Debug, Default)]
struct Inner {
    statuses: HashMap<DriverId, DriverStatus>,
    online: HashMap<DriverId, GeoPoint>,
    busy: HashMap<DriverId, GeoPoint>,
}

/// In-memory geo registry for testing and local runs.
///
/// Mirrors the Redis layout: a status entry per driver plus separate
/// online and busy position sets.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGeoRegistry {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryGeoRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the position recorded in the busy set, if any.
    pub async fn busy_position(&self, driver_id: DriverId) -> Option<GeoPoint> {
        self.inner.read().await.busy.get(&driver_id).copied()
    }
}

#[async_trait]
impl GeoRegistry for InMemoryGeoRegistry {
    async fn set_online(&self, driver_id: DriverId, position: GeoPoint) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.statuses.insert(driver_id, DriverStatus::Online);
        inner.online.insert(driver_id, position);
        inner.busy.remove(&driver_id);
        Ok(())
    }

    async fn set_offline(&self, driver_id: DriverId) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.statuses.remove(&driver_id);
        inner.online.remove(&driver_id);
        inner.busy.remove(&driver_id);
        Ok(())
    }

    async fn set_busy(&self, driver_id: DriverId, position: Option<GeoPoint>) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.statuses.insert(driver_id, DriverStatus::Busy);
        inner.online.remove(&driver_id);
        if let Some(position) = position {
            inner.busy.insert(driver_id, position);
        }
        Ok(())
    }

    async fn status(&self, driver_id: DriverId) -> Result<DriverStatus> {
        Ok(self
            .inner
            .read()
            .await
            .statuses
            .get(&driver_id)
            .copied()
            .unwrap_or(DriverStatus::Offline))
    }

    async fn find_nearby(
        &self,
        center: GeoPoint,
        radius_km: f64,
        limit: usize,
    ) -> Result<Vec<NearbyDriver>> {
        let inner = self.inner.read().await;
        let mut hits: Vec<NearbyDriver> = inner
            .online
            .iter()
            .filter_map(|(driver_id, position)| {
                let distance_km = center.distance_km(position);
                (distance_km <= radius_km).then_some(NearbyDriver {
                    driver_id: *driver_id,
                    position: *position,
                    distance_km,
                })
            })
            .collect();

        hits.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn update_location(&self, driver_id: DriverId, position: GeoPoint) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.statuses.get(&driver_id) == Some(&DriverStatus::Online) {
            inner.online.insert(driver_id, position);
        } else {
            tracing::trace!(%driver_id, "discarding location update for non-online driver");
        }
        Ok(())
    }
}
