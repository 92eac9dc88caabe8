use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{MessageId, TripId};
use domain::{Trip, TripStatus};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::records::{InboxRecord, OutboxRecord};
use crate::store::TripStore;

#[derive(Default)]
struct Inner {
    trips: HashMap<TripId, Trip>,
    outbox: Vec<OutboxRecord>,
    inbox: HashMap<MessageId, InboxRecord>,
}

/// In-memory trip store for testing and local runs.
///
/// The single write lock makes each guarded update atomic, which is the
/// same property the PostgreSQL implementation gets from its transaction
/// plus conditional UPDATE.
#[derive(Clone, Default)]
pub struct InMemoryTripStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryTripStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of outbox rows, processed or not.
    pub async fn outbox_count(&self) -> usize {
        self.inner.read().await.outbox.len()
    }

    /// Returns all outbox rows for one aggregate, oldest first.
    pub async fn outbox_for(&self, aggregate_id: Uuid) -> Vec<OutboxRecord> {
        self.inner
            .read()
            .await
            .outbox
            .iter()
            .filter(|r| r.aggregate_id == aggregate_id)
            .cloned()
            .collect()
    }

    fn check_and_put(
        inner: &mut Inner,
        trip: &Trip,
        expected: TripStatus,
        outbox: Vec<OutboxRecord>,
    ) -> Result<()> {
        let stored = inner
            .trips
            .get(&trip.id())
            .ok_or(StoreError::NotFound(trip.id()))?;

        if stored.status() != expected {
            return Err(StoreError::StatusConflict {
                trip_id: trip.id(),
                expected,
                actual: stored.status(),
            });
        }

        inner.trips.insert(trip.id(), trip.clone());
        inner.outbox.extend(outbox);
        Ok(())
    }
}

#[async_trait]
impl TripStore for InMemoryTripStore {
    async fn insert(&self, trip: &Trip) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.trips.contains_key(&trip.id()) {
            return Err(StoreError::DuplicateTrip(trip.id()));
        }
        inner.trips.insert(trip.id(), trip.clone());
        Ok(())
    }

    async fn get(&self, trip_id: TripId) -> Result<Option<Trip>> {
        Ok(self.inner.read().await.trips.get(&trip_id).cloned())
    }

    async fn update(
        &self,
        trip: &Trip,
        expected: TripStatus,
        outbox: Vec<OutboxRecord>,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        Self::check_and_put(&mut inner, trip, expected, outbox)
    }

    async fn update_with_inbox(
        &self,
        trip: &Trip,
        expected: TripStatus,
        inbox: InboxRecord,
        outbox: Vec<OutboxRecord>,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.inbox.contains_key(&inbox.message_id) {
            return Err(StoreError::DuplicateMessage(inbox.message_id));
        }
        Self::check_and_put(&mut inner, trip, expected, outbox)?;
        inner.inbox.insert(inbox.message_id, inbox);
        Ok(())
    }

    async fn is_processed(&self, message_id: MessageId) -> Result<bool> {
        Ok(self.inner.read().await.inbox.contains_key(&message_id))
    }

    async fn fetch_unprocessed_outbox(&self, limit: i64) -> Result<Vec<OutboxRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .outbox
            .iter()
            .filter(|r| !r.processed)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn mark_outbox_processed(&self, ids: &[Uuid]) -> Result<()> {
        let mut inner = self.inner.write().await;
        for record in inner.outbox.iter_mut() {
            if ids.contains(&record.id) {
                record.processed = true;
            }
        }
        Ok(())
    }
}
