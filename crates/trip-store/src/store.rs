//! The trip store port.

use async_trait::async_trait;
use common::{MessageId, TripId};
use domain::{Trip, TripStatus};
use uuid::Uuid;

use crate::error::Result;
use crate::records::{InboxRecord, OutboxRecord};

/// Persistence port for trips, their outbox and their inbox.
///
/// The guarded update methods are the serializing mechanism behind the
/// state machine: the new trip state is persisted only if the stored
/// status still equals `expected`, and any outbox (and inbox) rows are
/// committed in the same transaction. A lost compare-and-swap surfaces as
/// [`StoreError::StatusConflict`](crate::StoreError::StatusConflict), so
/// at most one of several concurrent acceptors observes success.
#[async_trait]
pub trait TripStore: Send + Sync {
    /// Inserts a freshly requested trip.
    async fn insert(&self, trip: &Trip) -> Result<()>;

    /// Loads a trip by id.
    async fn get(&self, trip_id: TripId) -> Result<Option<Trip>>;

    /// Persists `trip` if the stored status still equals `expected`,
    /// appending `outbox` rows atomically with the state change.
    async fn update(
        &self,
        trip: &Trip,
        expected: TripStatus,
        outbox: Vec<OutboxRecord>,
    ) -> Result<()>;

    /// Same compare-and-swap update, additionally recording `inbox` in
    /// the same transaction. Fails with `DuplicateMessage` if an inbox
    /// row for that message id already exists, leaving the trip and
    /// outbox untouched.
    async fn update_with_inbox(
        &self,
        trip: &Trip,
        expected: TripStatus,
        inbox: InboxRecord,
        outbox: Vec<OutboxRecord>,
    ) -> Result<()>;

    /// Returns true if an inbox row exists for the message id.
    async fn is_processed(&self, message_id: MessageId) -> Result<bool>;

    /// Returns up to `limit` unprocessed outbox rows, oldest first.
    /// This is the read half of the contract the external relay drains.
    async fn fetch_unprocessed_outbox(&self, limit: i64) -> Result<Vec<OutboxRecord>>;

    /// Marks outbox rows processed after the relay's publish acknowledges.
    async fn mark_outbox_processed(&self, ids: &[Uuid]) -> Result<()>;
}
