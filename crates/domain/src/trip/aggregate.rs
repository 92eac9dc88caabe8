//! Trip aggregate implementation.

use chrono::{DateTime, Utc};
use common::{DriverId, GeoPoint, PassengerId, TripId};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::{Deserialize, Serialize};

use crate::pricing::{FareCategory, PricingPolicy};

use super::{TripError, TripEvent, TripStatus};

/// Trip aggregate root.
///
/// Owns the lifecycle from request to payment outcome. Every mutation goes
/// through a guarded transition that checks the current status first; the
/// store layer makes the read-check-write atomic with a compare-and-swap
/// on the persisted status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    id: TripId,
    passenger_id: PassengerId,
    driver_id: Option<DriverId>,
    start: GeoPoint,
    end: GeoPoint,
    #[serde(default)]
    category: FareCategory,
    status: TripStatus,
    fare: Option<Decimal>,
    requested_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
}

// Query methods
impl Trip {
    /// Returns the trip id.
    pub fn id(&self) -> TripId {
        self.id
    }

    /// Returns the passenger who requested the trip.
    pub fn passenger_id(&self) -> PassengerId {
        self.passenger_id
    }

    /// Returns the assigned driver, if any.
    pub fn driver_id(&self) -> Option<DriverId> {
        self.driver_id
    }

    /// Returns the pickup point.
    pub fn start_point(&self) -> GeoPoint {
        self.start
    }

    /// Returns the drop-off point.
    pub fn end(&self) -> GeoPoint {
        self.end
    }

    /// Returns the fare category.
    pub fn category(&self) -> FareCategory {
        self.category
    }

    /// Returns the current status.
    pub fn status(&self) -> TripStatus {
        self.status
    }

    /// Returns the computed fare, set on completion.
    pub fn fare(&self) -> Option<Decimal> {
        self.fare
    }

    /// Returns when the trip was requested.
    pub fn requested_at(&self) -> DateTime<Utc> {
        self.requested_at
    }

    /// Returns the start timestamp (acceptance time until pickup, then
    /// pickup time).
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Returns when the trip ended (completion or cancellation).
    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    /// Returns true if the trip is in a terminal status.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

// Guarded transitions
impl Trip {
    /// Creates a trip in Requested status.
    ///
    /// Geometry is assumed validated by the request boundary.
    pub fn request(
        id: TripId,
        passenger_id: PassengerId,
        start: GeoPoint,
        end: GeoPoint,
        category: FareCategory,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            passenger_id,
            driver_id: None,
            start,
            end,
            category,
            status: TripStatus::Requested,
            fare: None,
            requested_at: at,
            started_at: None,
            ended_at: None,
        }
    }

    /// Assigns a driver and moves the trip to Accepted.
    ///
    /// The driver id is set exactly once, here. Under concurrent acceptors
    /// the store's compare-and-swap on status lets at most one caller
    /// persist this transition.
    pub fn accept(&mut self, driver_id: DriverId, at: DateTime<Utc>) -> Result<TripEvent, TripError> {
        if !self.status.can_accept() {
            return Err(TripError::InvalidStateTransition {
                current_status: self.status,
                action: "accept",
            });
        }

        self.driver_id = Some(driver_id);
        self.status = TripStatus::Accepted;
        self.started_at = Some(at);

        Ok(TripEvent::accepted(self, at))
    }

    /// Marks the passenger picked up and the ride underway.
    pub fn start(&mut self, at: DateTime<Utc>) -> Result<TripEvent, TripError> {
        if !self.status.can_start() {
            return Err(TripError::InvalidStateTransition {
                current_status: self.status,
                action: "start",
            });
        }

        self.status = TripStatus::InProgress;
        self.started_at = Some(at);

        Ok(TripEvent::started(self, at))
    }

    /// Ends the ride, computes the fare and moves the trip to Completed.
    pub fn complete(
        &mut self,
        policy: &PricingPolicy,
        at: DateTime<Utc>,
    ) -> Result<TripEvent, TripError> {
        if !self.status.can_complete() {
            return Err(TripError::InvalidStateTransition {
                current_status: self.status,
                action: "complete",
            });
        }
        if self.started_at.is_none() {
            return Err(TripError::NotStarted);
        }

        self.ended_at = Some(at);
        self.status = TripStatus::Completed;
        self.fare = Some(self.fare_quote(policy));

        Ok(TripEvent::completed(self, at))
    }

    /// Cancels the trip from any pre-completion status. The reason, when
    /// supplied, is recorded on the emitted event.
    pub fn cancel(
        &mut self,
        reason: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<TripEvent, TripError> {
        if !self.status.can_cancel() {
            return Err(TripError::InvalidStateTransition {
                current_status: self.status,
                action: "cancel",
            });
        }

        self.status = TripStatus::Cancelled;
        self.ended_at = Some(at);

        Ok(TripEvent::cancelled(self, reason, at))
    }

    /// Applies the payment outcome for a completed trip.
    ///
    /// On failure the trip moves to PaymentFailed and the compensating
    /// cancellation-request event is returned for the outbox.
    pub fn apply_payment_outcome(
        &mut self,
        succeeded: bool,
        at: DateTime<Utc>,
    ) -> Result<Option<TripEvent>, TripError> {
        if !self.status.can_apply_payment() {
            return Err(TripError::InvalidStateTransition {
                current_status: self.status,
                action: "apply payment outcome",
            });
        }

        if succeeded {
            self.status = TripStatus::Paid;
            Ok(None)
        } else {
            self.status = TripStatus::PaymentFailed;
            Ok(Some(TripEvent::cancellation_requested(self, at)))
        }
    }

    /// Computes the fare for the completed ride.
    ///
    /// Returns zero unless the trip actually reached Completed with both
    /// timestamps stamped.
    pub fn fare_quote(&self, policy: &PricingPolicy) -> Decimal {
        if self.status != TripStatus::Completed {
            return Decimal::ZERO;
        }
        let (Some(started), Some(ended)) = (self.started_at, self.ended_at) else {
            return Decimal::ZERO;
        };

        let distance_km =
            Decimal::from_f64(self.start.distance_km(&self.end)).unwrap_or(Decimal::ZERO);
        let elapsed_minutes =
            Decimal::from((ended - started).num_seconds().max(0)) / Decimal::from(60);

        policy.fare(distance_km, elapsed_minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn requested() -> Trip {
        Trip::request(
            TripId::new(),
            PassengerId::new(),
            GeoPoint::new(41.0082, 28.9784),
            GeoPoint::new(41.0200, 28.9900),
            FareCategory::Standard,
            Utc::now(),
        )
    }

    fn in_progress(started_at: DateTime<Utc>) -> Trip {
        let mut trip = requested();
        trip.accept(DriverId::new(), started_at).unwrap();
        trip.start(started_at).unwrap();
        trip
    }

    #[test]
    fn test_full_lifecycle_to_paid() {
        let t0 = Utc::now();
        let mut trip = requested();
        let driver = DriverId::new();

        trip.accept(driver, t0).unwrap();
        assert_eq!(trip.status(), TripStatus::Accepted);
        assert_eq!(trip.driver_id(), Some(driver));
        assert_eq!(trip.started_at(), Some(t0));

        trip.start(t0 + Duration::minutes(3)).unwrap();
        assert_eq!(trip.status(), TripStatus::InProgress);

        trip.complete(&PricingPolicy::standard(), t0 + Duration::minutes(18))
            .unwrap();
        assert_eq!(trip.status(), TripStatus::Completed);
        assert!(trip.fare().is_some());
        assert!(trip.ended_at().is_some());

        let compensation = trip.apply_payment_outcome(true, Utc::now()).unwrap();
        assert!(compensation.is_none());
        assert_eq!(trip.status(), TripStatus::Paid);
    }

    #[test]
    fn test_accept_twice_is_a_conflict() {
        let mut trip = requested();
        let winner = DriverId::new();
        trip.accept(winner, Utc::now()).unwrap();

        let result = trip.accept(DriverId::new(), Utc::now());
        assert!(matches!(
            result,
            Err(TripError::InvalidStateTransition {
                current_status: TripStatus::Accepted,
                action: "accept",
            })
        ));
        // The winner's assignment is untouched.
        assert_eq!(trip.driver_id(), Some(winner));
    }

    #[test]
    fn test_start_requires_acceptance() {
        let mut trip = requested();
        let result = trip.start(Utc::now());
        assert!(matches!(
            result,
            Err(TripError::InvalidStateTransition { .. })
        ));
        assert_eq!(trip.status(), TripStatus::Requested);
    }

    #[test]
    fn test_complete_requires_in_progress() {
        let mut trip = requested();
        trip.accept(DriverId::new(), Utc::now()).unwrap();
        let result = trip.complete(&PricingPolicy::standard(), Utc::now());
        assert!(matches!(
            result,
            Err(TripError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn test_cancel_from_each_pre_completion_state() {
        let mut trip = requested();
        trip.cancel(None, Utc::now()).unwrap();
        assert_eq!(trip.status(), TripStatus::Cancelled);

        let mut trip = requested();
        trip.accept(DriverId::new(), Utc::now()).unwrap();
        trip.cancel(None, Utc::now()).unwrap();
        assert_eq!(trip.status(), TripStatus::Cancelled);

        let mut trip = in_progress(Utc::now());
        trip.cancel(None, Utc::now()).unwrap();
        assert_eq!(trip.status(), TripStatus::Cancelled);
    }

    #[test]
    fn test_cancel_records_reason_on_event() {
        let mut trip = requested();
        let event = trip
            .cancel(Some("passenger no-show".to_string()), Utc::now())
            .unwrap();
        assert_eq!(event.reason.as_deref(), Some("passenger no-show"));
    }

    #[test]
    fn test_cancel_after_completion_is_a_conflict() {
        let t0 = Utc::now();
        let mut trip = in_progress(t0);
        trip.complete(&PricingPolicy::standard(), t0 + Duration::minutes(10))
            .unwrap();

        let result = trip.cancel(None, Utc::now());
        assert!(matches!(
            result,
            Err(TripError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn test_cancel_twice_is_a_conflict() {
        let mut trip = requested();
        trip.cancel(None, Utc::now()).unwrap();
        assert!(trip.cancel(None, Utc::now()).is_err());
    }

    #[test]
    fn test_short_trip_hits_minimum_fare() {
        let t0 = Utc::now();
        let mut trip = Trip::request(
            TripId::new(),
            PassengerId::new(),
            GeoPoint::new(41.0, 29.0),
            GeoPoint::new(41.001, 29.001),
            FareCategory::Standard,
            t0,
        );
        trip.accept(DriverId::new(), t0).unwrap();
        trip.start(t0).unwrap();
        trip.complete(&PricingPolicy::standard(), t0 + Duration::seconds(45))
            .unwrap();

        assert_eq!(trip.fare(), Some(dec!(175.00)));
    }

    #[test]
    fn test_fare_is_deterministic_for_same_geometry_and_elapsed() {
        let t0 = Utc::now();
        let policy = PricingPolicy::standard();

        let mut a = in_progress(t0);
        a.complete(&policy, t0 + Duration::minutes(20)).unwrap();
        let mut b = in_progress(t0);
        b.complete(&policy, t0 + Duration::minutes(20)).unwrap();

        assert_eq!(a.fare(), b.fare());
    }

    #[test]
    fn test_fare_quote_is_zero_off_the_completed_path() {
        let trip = requested();
        assert_eq!(trip.fare_quote(&PricingPolicy::standard()), Decimal::ZERO);

        let trip = in_progress(Utc::now());
        assert_eq!(trip.fare_quote(&PricingPolicy::standard()), Decimal::ZERO);
    }

    #[test]
    fn test_payment_failure_requests_compensation() {
        let t0 = Utc::now();
        let mut trip = in_progress(t0);
        trip.complete(&PricingPolicy::standard(), t0 + Duration::minutes(10))
            .unwrap();
        let fare = trip.fare().unwrap();

        let event = trip
            .apply_payment_outcome(false, Utc::now())
            .unwrap()
            .expect("compensating event");
        assert_eq!(trip.status(), TripStatus::PaymentFailed);
        assert_eq!(event.event_type(), "TRIP_CANCELLATION_REQUESTED");
        assert_eq!(event.fare, fare);
    }

    #[test]
    fn test_payment_outcome_requires_completed() {
        let mut trip = requested();
        assert!(trip.apply_payment_outcome(true, Utc::now()).is_err());

        let mut trip = in_progress(Utc::now());
        assert!(trip.apply_payment_outcome(false, Utc::now()).is_err());
    }

    #[test]
    fn test_fare_present_iff_status_expects_it() {
        let t0 = Utc::now();
        let mut trip = in_progress(t0);
        assert!(trip.fare().is_none());

        trip.complete(&PricingPolicy::standard(), t0 + Duration::minutes(5))
            .unwrap();
        assert!(trip.status().has_fare());
        assert!(trip.fare().is_some());

        trip.apply_payment_outcome(false, Utc::now()).unwrap();
        assert!(trip.status().has_fare());
        assert!(trip.fare().is_some());
    }

    #[test]
    fn test_serialization_roundtrip() {
        let mut trip = in_progress(Utc::now());
        trip.complete(&PricingPolicy::premium(), Utc::now()).unwrap();

        let json = serde_json::to_string(&trip).unwrap();
        let back: Trip = serde_json::from_str(&json).unwrap();
        assert_eq!(back, trip);
    }
}
