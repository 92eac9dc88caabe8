//! Saga coordinator: the read side of every service boundary.

use common::GeoPoint;
use dispatch::GeoRegistry;
use trip_store::TripStore;

use crate::envelope::{self, DriverLocationUpdate, TransportMessage};
use crate::error::{Result, SagaError};
use crate::trips::TripService;

/// What happened to a consumed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consumed {
    /// The event's effects were applied and the inbox row recorded.
    Applied,

    /// An inbox row already existed; the delivery was a no-op.
    Duplicate,
}

/// Consumes inbound events and dispatches them to the trip state machine
/// or the geo registry.
///
/// Handlers are safe under concurrent invocation for different trips and
/// mutually exclusive for the same trip: the inbox insert and the status
/// compare-and-swap both happen inside the store's transaction.
pub struct SagaCoordinator<S: TripStore, G: GeoRegistry> {
    store: S,
    trips: TripService<S>,
    registry: G,
}

impl<S: TripStore + Clone, G: GeoRegistry> SagaCoordinator<S, G> {
    /// Creates a coordinator over a trip store and a geo registry.
    pub fn new(store: S, registry: G) -> Self {
        let trips = TripService::new(store.clone());
        Self {
            store,
            trips,
            registry,
        }
    }

    /// Handles one delivery from the `payment_events` topic.
    ///
    /// Duplicate deliveries (same message id) return `Duplicate` without
    /// touching anything. Infrastructure errors propagate so the
    /// transport redelivers; no inbox row is written in that case.
    #[tracing::instrument(
        skip(self, message),
        fields(message_id = %message.id, event_type = %message.event_type)
    )]
    pub async fn handle_payment_event(&self, message: &TransportMessage) -> Result<Consumed> {
        metrics::counter!("payment_events_received_total").increment(1);

        if self.store.is_processed(message.id).await? {
            metrics::counter!("payment_events_duplicate_total").increment(1);
            tracing::debug!("duplicate delivery, skipping");
            return Ok(Consumed::Duplicate);
        }

        let event = envelope::unwrap_payment_event(&message.body)?;

        match self.trips.apply_payment_outcome(message.id, &event).await {
            Ok(_) => Ok(Consumed::Applied),
            // Lost the inbox insert race against a concurrent delivery
            // of the same message; its effects are already in place.
            Err(SagaError::DuplicateDelivery(_)) => {
                metrics::counter!("payment_events_duplicate_total").increment(1);
                Ok(Consumed::Duplicate)
            }
            Err(e) => Err(e),
        }
    }

    /// Handles one delivery from the `driver_location_updates` topic.
    ///
    /// Position ingestion is last-writer-wins and naturally idempotent,
    /// so there is no inbox involvement here.
    #[tracing::instrument(skip(self, message), fields(message_id = %message.id))]
    pub async fn handle_location_update(&self, message: &TransportMessage) -> Result<()> {
        let update: DriverLocationUpdate = serde_json::from_str(&message.body)?;
        self.registry
            .update_location(
                update.driver_id,
                GeoPoint::new(update.latitude, update.longitude),
            )
            .await?;
        Ok(())
    }

    /// Returns the write-side trip service sharing this coordinator's
    /// store.
    pub fn trips(&self) -> &TripService<S> {
        &self.trips
    }

    /// Returns the geo registry.
    pub fn registry(&self) -> &G {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{DriverId, MessageId, PassengerId, TripId};
    use dispatch::InMemoryGeoRegistry;
    use domain::{FareCategory, Trip, TripStatus};
    use trip_store::InMemoryTripStore;

    fn coordinator() -> (
        SagaCoordinator<InMemoryTripStore, InMemoryGeoRegistry>,
        InMemoryTripStore,
        InMemoryGeoRegistry,
    ) {
        let store = InMemoryTripStore::new();
        let registry = InMemoryGeoRegistry::new();
        (
            SagaCoordinator::new(store.clone(), registry.clone()),
            store,
            registry,
        )
    }

    async fn completed_trip(
        coordinator: &SagaCoordinator<InMemoryTripStore, InMemoryGeoRegistry>,
    ) -> Trip {
        let trip = coordinator
            .trips()
            .request_trip(
                PassengerId::new(),
                GeoPoint::new(41.0082, 28.9784),
                GeoPoint::new(41.0200, 28.9900),
                FareCategory::Standard,
            )
            .await
            .unwrap();
        coordinator
            .trips()
            .accept(trip.id(), DriverId::new())
            .await
            .unwrap();
        coordinator.trips().start(trip.id()).await.unwrap();
        coordinator.trips().complete(trip.id()).await.unwrap()
    }

    fn payment_message(trip: &Trip, event_type: &str, message_id: MessageId) -> TransportMessage {
        let inner = serde_json::json!({
            "tripId": trip.id(),
            "passengerId": trip.passenger_id(),
            "amount": trip.fare().unwrap_or_default().to_string(),
            "eventType": event_type,
            "failureReason": if event_type == "PAYMENT_FAILED" { Some("card declined") } else { None },
        });
        let body = serde_json::json!({ "payload": inner.to_string() }).to_string();
        TransportMessage::new(message_id, event_type, body)
    }

    #[tokio::test]
    async fn test_successful_payment_marks_trip_paid() {
        let (coordinator, store, _) = coordinator();
        let trip = completed_trip(&coordinator).await;

        let message = payment_message(&trip, "PAYMENT_SUCCESSFUL", MessageId::new());
        let consumed = coordinator.handle_payment_event(&message).await.unwrap();

        assert_eq!(consumed, Consumed::Applied);
        let stored = store.get(trip.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), TripStatus::Paid);
    }

    #[tokio::test]
    async fn test_failed_payment_rolls_trip_back() {
        let (coordinator, store, _) = coordinator();
        let trip = completed_trip(&coordinator).await;

        let message = payment_message(&trip, "PAYMENT_FAILED", MessageId::new());
        coordinator.handle_payment_event(&message).await.unwrap();

        let stored = store.get(trip.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), TripStatus::PaymentFailed);
        let rows = store.outbox_for(trip.id().as_uuid()).await;
        assert_eq!(
            rows.last().unwrap().event_type,
            "TRIP_CANCELLATION_REQUESTED"
        );
    }

    #[tokio::test]
    async fn test_redelivery_is_a_noop() {
        let (coordinator, store, _) = coordinator();
        let trip = completed_trip(&coordinator).await;
        let message_id = MessageId::new();

        let message = payment_message(&trip, "PAYMENT_FAILED", message_id);
        let first = coordinator.handle_payment_event(&message).await.unwrap();
        assert_eq!(first, Consumed::Applied);
        let outbox_after_first = store.outbox_for(trip.id().as_uuid()).await.len();

        // Same message id delivered again.
        let second = coordinator.handle_payment_event(&message).await.unwrap();
        assert_eq!(second, Consumed::Duplicate);

        // Exactly one status mutation and one compensating write.
        let stored = store.get(trip.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), TripStatus::PaymentFailed);
        assert_eq!(
            store.outbox_for(trip.id().as_uuid()).await.len(),
            outbox_after_first
        );
    }

    #[tokio::test]
    async fn test_payment_for_unknown_trip_propagates() {
        let (coordinator, store, _) = coordinator();
        let ghost = Trip::request(
            TripId::new(),
            PassengerId::new(),
            GeoPoint::new(41.0, 29.0),
            GeoPoint::new(41.1, 29.1),
            FareCategory::Standard,
            chrono::Utc::now(),
        );

        let message = payment_message(&ghost, "PAYMENT_SUCCESSFUL", MessageId::new());
        let result = coordinator.handle_payment_event(&message).await;
        assert!(matches!(result, Err(SagaError::TripNotFound(_))));
        // No inbox row was recorded, so a later redelivery can still apply.
        assert!(!store.is_processed(message.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_malformed_body_propagates_without_inbox_row() {
        let (coordinator, store, _) = coordinator();
        let message = TransportMessage::new(MessageId::new(), "PAYMENT_SUCCESSFUL", "not json");

        let result = coordinator.handle_payment_event(&message).await;
        assert!(matches!(result, Err(SagaError::Serialization(_))));
        assert!(!store.is_processed(message.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_location_update_moves_online_driver() {
        let (coordinator, _, registry) = coordinator();
        let driver = DriverId::new();
        registry
            .set_online(driver, GeoPoint::new(41.0, 29.0))
            .await
            .unwrap();

        let body = serde_json::json!({
            "driverId": driver,
            "latitude": 41.2,
            "longitude": 29.2,
            "timestamp": chrono::Utc::now(),
        })
        .to_string();
        let message = TransportMessage::new(MessageId::new(), "DRIVER_LOCATION_UPDATED", body);
        coordinator.handle_location_update(&message).await.unwrap();

        let hits = registry
            .find_nearby(GeoPoint::new(41.2, 29.2), 1.0, 10)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].driver_id, driver);
    }

    #[tokio::test]
    async fn test_location_update_for_offline_driver_is_discarded() {
        let (coordinator, _, registry) = coordinator();
        let driver = DriverId::new();

        let body = serde_json::json!({
            "driverId": driver,
            "latitude": 41.2,
            "longitude": 29.2,
            "timestamp": chrono::Utc::now(),
        })
        .to_string();
        let message = TransportMessage::new(MessageId::new(), "DRIVER_LOCATION_UPDATED", body);
        coordinator.handle_location_update(&message).await.unwrap();

        assert!(
            registry
                .find_nearby(GeoPoint::new(41.2, 29.2), 5.0, 10)
                .await
                .unwrap()
                .is_empty()
        );
    }
}
