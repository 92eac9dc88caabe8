//! Integration tests for the trip saga: concurrency properties and the
//! full lifecycle across the write and read sides.

use std::sync::Arc;

use common::{DriverId, GeoPoint, MessageId, PassengerId};
use dispatch::{GeoRegistry, InMemoryGeoRegistry};
use domain::{FareCategory, TripStatus};
use rust_decimal_macros::dec;
use saga::{Consumed, SagaCoordinator, TransportMessage, TripService};
use tokio::sync::Barrier;
use trip_store::{InMemoryTripStore, TripStore};

fn payment_body(trip_id: common::TripId, passenger_id: PassengerId, event_type: &str) -> String {
    let inner = serde_json::json!({
        "tripId": trip_id,
        "passengerId": passenger_id,
        "amount": "224.00",
        "eventType": event_type,
        "failureReason": null,
    });
    serde_json::json!({ "payload": inner.to_string() }).to_string()
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_accept_has_exactly_one_winner() {
    let store = InMemoryTripStore::new();
    let service = Arc::new(TripService::new(store.clone()));

    let trip = service
        .request_trip(
            PassengerId::new(),
            GeoPoint::new(41.0082, 28.9784),
            GeoPoint::new(41.0200, 28.9900),
            FareCategory::Standard,
        )
        .await
        .unwrap();

    let driver_a = DriverId::new();
    let driver_b = DriverId::new();
    let barrier = Arc::new(Barrier::new(2));

    let mut handles = Vec::new();
    for driver in [driver_a, driver_b] {
        let service = service.clone();
        let barrier = barrier.clone();
        let trip_id = trip.id();
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            service.accept(trip_id, driver).await.map(|t| (driver, t))
        }));
    }

    let mut winners = Vec::new();
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok((driver, _)) => winners.push(driver),
            Err(e) => {
                assert!(e.is_conflict(), "loser must see a conflict, got: {e}");
                conflicts += 1;
            }
        }
    }

    assert_eq!(winners.len(), 1);
    assert_eq!(conflicts, 1);

    // The persisted driver is the winner's, and only one acceptance event
    // was announced.
    let stored = store.get(trip.id()).await.unwrap().unwrap();
    assert_eq!(stored.status(), TripStatus::Accepted);
    assert_eq!(stored.driver_id(), Some(winners[0]));
    let accepted_rows: Vec<_> = store
        .outbox_for(trip.id().as_uuid())
        .await
        .into_iter()
        .filter(|r| r.event_type == "TRIP_ACCEPTED")
        .collect();
    assert_eq!(accepted_rows.len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_redelivery_applies_effects_once() {
    let store = InMemoryTripStore::new();
    let registry = InMemoryGeoRegistry::new();
    let coordinator = Arc::new(SagaCoordinator::new(store.clone(), registry));

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
    coordinator.trips().complete(trip.id()).await.unwrap();
    let outbox_before = store.outbox_for(trip.id().as_uuid()).await.len();

    // The same message delivered concurrently on two consumer tasks.
    let message_id = MessageId::new();
    let body = payment_body(trip.id(), trip.passenger_id(), "PAYMENT_FAILED");
    let barrier = Arc::new(Barrier::new(2));

    let mut handles = Vec::new();
    for _ in 0..2 {
        let coordinator = coordinator.clone();
        let message = TransportMessage::new(message_id, "PAYMENT_FAILED", body.clone());
        let barrier = barrier.clone();
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            coordinator.handle_payment_event(&message).await
        }));
    }

    let mut applied = 0;
    let mut duplicates = 0;
    for handle in handles {
        match handle.await.unwrap().unwrap() {
            Consumed::Applied => applied += 1,
            Consumed::Duplicate => duplicates += 1,
        }
    }
    assert_eq!(applied, 1);
    assert_eq!(duplicates, 1);

    // One status mutation, one compensating write.
    let stored = store.get(trip.id()).await.unwrap().unwrap();
    assert_eq!(stored.status(), TripStatus::PaymentFailed);
    assert_eq!(
        store.outbox_for(trip.id().as_uuid()).await.len(),
        outbox_before + 1
    );
}

#[tokio::test]
async fn full_lifecycle_with_dispatch_and_payment() {
    let store = InMemoryTripStore::new();
    let registry = InMemoryGeoRegistry::new();
    let coordinator = SagaCoordinator::new(store.clone(), registry);

    // A driver comes online near the pickup point.
    let driver = DriverId::new();
    coordinator
        .registry()
        .set_online(driver, GeoPoint::new(41.008, 28.978))
        .await
        .unwrap();

    // Passenger requests a trip and we find the driver nearby.
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
    let nearby = coordinator
        .registry()
        .find_nearby(trip.start_point(), 5.0, 10)
        .await
        .unwrap();
    assert_eq!(nearby.len(), 1);
    assert_eq!(nearby[0].driver_id, driver);

    // The driver accepts and goes busy; dispatch no longer sees them.
    coordinator.trips().accept(trip.id(), driver).await.unwrap();
    coordinator
        .registry()
        .set_busy(driver, Some(GeoPoint::new(41.008, 28.978)))
        .await
        .unwrap();
    assert!(
        coordinator
            .registry()
            .find_nearby(trip.start_point(), 5.0, 10)
            .await
            .unwrap()
            .is_empty()
    );

    // Ride runs to completion; fare clears the minimum.
    coordinator.trips().start(trip.id()).await.unwrap();
    let completed = coordinator.trips().complete(trip.id()).await.unwrap();
    assert!(completed.fare().unwrap() >= dec!(175.00));

    // Payment settles and the trip is paid.
    let message = TransportMessage::new(
        MessageId::new(),
        "PAYMENT_SUCCESSFUL",
        payment_body(trip.id(), trip.passenger_id(), "PAYMENT_SUCCESSFUL"),
    );
    let consumed = coordinator.handle_payment_event(&message).await.unwrap();
    assert_eq!(consumed, Consumed::Applied);

    let stored = store.get(trip.id()).await.unwrap().unwrap();
    assert_eq!(stored.status(), TripStatus::Paid);

    // The relay contract sees every announcement exactly once.
    let pending = store.fetch_unprocessed_outbox(100).await.unwrap();
    let types: Vec<&str> = pending.iter().map(|r| r.event_type.as_str()).collect();
    assert_eq!(
        types,
        vec!["TRIP_ACCEPTED", "TRIP_STARTED", "TRIP_COMPLETED"]
    );
}
