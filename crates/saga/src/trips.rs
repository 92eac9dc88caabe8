//! Trip service: the write side of the saga.
//!
//! Each operation loads the trip, runs the aggregate's guarded
//! transition, and persists the result with a compare-and-swap on the
//! status it read, appending the emitted event to the outbox in the same
//! transaction. A lost swap means a concurrent caller won; the loser gets
//! a conflict and nothing is written.

use chrono::Utc;
use common::{DriverId, GeoPoint, MessageId, PassengerId, TripId};
use domain::{FareCategory, PricingResolver, Trip, TripEvent};
use trip_store::{InboxRecord, OutboxRecord, TripStore};

use crate::envelope::PaymentOutcomeEvent;
use crate::error::{Result, SagaError};

/// Service for driving trip transitions.
pub struct TripService<S: TripStore> {
    store: S,
    pricing: PricingResolver,
}

impl<S: TripStore> TripService<S> {
    /// Creates a trip service with the built-in pricing policies.
    pub fn new(store: S) -> Self {
        Self {
            store,
            pricing: PricingResolver::new(),
        }
    }

    /// Creates a trip service with a custom pricing resolver.
    pub fn with_resolver(store: S, pricing: PricingResolver) -> Self {
        Self { store, pricing }
    }

    fn outbox_row(event: &TripEvent) -> Result<Vec<OutboxRecord>> {
        Ok(vec![OutboxRecord::for_trip_event(event)?])
    }

    async fn load(&self, trip_id: TripId) -> Result<Trip> {
        self.store
            .get(trip_id)
            .await?
            .ok_or(SagaError::TripNotFound(trip_id))
    }

    /// Creates a trip in Requested status.
    #[tracing::instrument(skip(self))]
    pub async fn request_trip(
        &self,
        passenger_id: PassengerId,
        start: GeoPoint,
        end: GeoPoint,
        category: FareCategory,
    ) -> Result<Trip> {
        let trip = Trip::request(
            TripId::new(),
            passenger_id,
            start,
            end,
            category,
            Utc::now(),
        );
        self.store.insert(&trip).await?;

        metrics::counter!("trips_requested_total").increment(1);
        tracing::info!(trip_id = %trip.id(), "trip requested");
        Ok(trip)
    }

    /// Loads a trip by id.
    pub async fn get_trip(&self, trip_id: TripId) -> Result<Option<Trip>> {
        Ok(self.store.get(trip_id).await?)
    }

    /// Accepts a trip on behalf of a driver.
    ///
    /// At most one of several concurrent acceptors succeeds; the rest see
    /// a conflict from the status compare-and-swap.
    #[tracing::instrument(skip(self))]
    pub async fn accept(&self, trip_id: TripId, driver_id: DriverId) -> Result<Trip> {
        let mut trip = self.load(trip_id).await?;
        let expected = trip.status();

        let event = trip.accept(driver_id, Utc::now())?;
        self.store
            .update(&trip, expected, Self::outbox_row(&event)?)
            .await?;

        metrics::counter!("trip_transitions_total", "transition" => "accept").increment(1);
        tracing::info!(%trip_id, %driver_id, "trip accepted");
        Ok(trip)
    }

    /// Marks the passenger picked up.
    #[tracing::instrument(skip(self))]
    pub async fn start(&self, trip_id: TripId) -> Result<Trip> {
        let mut trip = self.load(trip_id).await?;
        let expected = trip.status();

        let event = trip.start(Utc::now())?;
        self.store
            .update(&trip, expected, Self::outbox_row(&event)?)
            .await?;

        metrics::counter!("trip_transitions_total", "transition" => "start").increment(1);
        tracing::info!(%trip_id, "trip started");
        Ok(trip)
    }

    /// Ends the ride and computes the fare from the trip's category
    /// policy.
    #[tracing::instrument(skip(self))]
    pub async fn complete(&self, trip_id: TripId) -> Result<Trip> {
        let mut trip = self.load(trip_id).await?;
        let expected = trip.status();

        let policy = self.pricing.resolve(trip.category());
        let event = trip.complete(policy, Utc::now())?;
        self.store
            .update(&trip, expected, Self::outbox_row(&event)?)
            .await?;

        metrics::counter!("trip_transitions_total", "transition" => "complete").increment(1);
        tracing::info!(%trip_id, fare = %event.fare, "trip completed");
        Ok(trip)
    }

    /// Cancels a trip from any pre-completion status. The caller's
    /// reason, when supplied, is recorded on the published event.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, trip_id: TripId, reason: Option<String>) -> Result<Trip> {
        let mut trip = self.load(trip_id).await?;
        let expected = trip.status();

        let event = trip.cancel(reason, Utc::now())?;
        self.store
            .update(&trip, expected, Self::outbox_row(&event)?)
            .await?;

        metrics::counter!("trip_transitions_total", "transition" => "cancel").increment(1);
        tracing::info!(%trip_id, "trip cancelled");
        Ok(trip)
    }

    /// Applies a payment outcome delivered through the saga's inbound
    /// path.
    ///
    /// The inbox row for `message_id`, the status change, and any
    /// compensating outbox event commit in one transaction, so a
    /// redelivered message either finds the inbox row or loses the
    /// insert race; either way its effects apply exactly once.
    #[tracing::instrument(skip(self, event), fields(trip_id = %event.trip_id))]
    pub async fn apply_payment_outcome(
        &self,
        message_id: MessageId,
        event: &PaymentOutcomeEvent,
    ) -> Result<Trip> {
        let mut trip = self.load(event.trip_id).await?;
        let expected = trip.status();

        let mut compensation = trip.apply_payment_outcome(event.succeeded(), Utc::now())?;
        let outbox = match compensation.as_mut() {
            Some(comp) => {
                comp.reason = event.failure_reason.clone();
                Self::outbox_row(comp)?
            }
            None => Vec::new(),
        };
        let inbox = InboxRecord::processed(message_id, event.event_type.as_str());

        self.store
            .update_with_inbox(&trip, expected, inbox, outbox)
            .await?;

        if event.succeeded() {
            metrics::counter!("trip_payments_total", "outcome" => "paid").increment(1);
            tracing::info!(trip_id = %trip.id(), "payment settled, trip paid");
        } else {
            metrics::counter!("trip_payments_total", "outcome" => "failed").increment(1);
            tracing::warn!(
                trip_id = %trip.id(),
                reason = event.failure_reason.as_deref().unwrap_or("unknown"),
                "payment failed, cancellation requested"
            );
        }
        Ok(trip)
    }
}
