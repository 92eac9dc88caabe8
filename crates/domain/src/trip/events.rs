//! Trip domain events in their wire format.
//!
//! Events serialize to the flat JSON published on the `trip_events` topic:
//! camelCase fields, `eventType` tags like `TRIP_ACCEPTED`, `fare` zero
//! when not applicable, and `currentLatitude`/`currentLongitude` present
//! only on geo-relevant transitions.

use chrono::{DateTime, Utc};
use common::{DriverId, PassengerId, TripId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Trip;

/// Discriminator for trip events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TripEventKind {
    #[serde(rename = "TRIP_ACCEPTED")]
    Accepted,

    #[serde(rename = "TRIP_STARTED")]
    Started,

    #[serde(rename = "TRIP_COMPLETED")]
    Completed,

    #[serde(rename = "TRIP_CANCELLED")]
    Cancelled,

    /// Compensating event asking downstream consumers to unwind a trip
    /// whose payment failed.
    #[serde(rename = "TRIP_CANCELLATION_REQUESTED")]
    CancellationRequested,
}

impl TripEventKind {
    /// Returns the event type tag in its wire form.
    pub fn as_str(&self) -> &'static str {
        match self {
            TripEventKind::Accepted => "TRIP_ACCEPTED",
            TripEventKind::Started => "TRIP_STARTED",
            TripEventKind::Completed => "TRIP_COMPLETED",
            TripEventKind::Cancelled => "TRIP_CANCELLED",
            TripEventKind::CancellationRequested => "TRIP_CANCELLATION_REQUESTED",
        }
    }
}

impl std::fmt::Display for TripEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An event emitted by a trip transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripEvent {
    /// What happened.
    pub event_type: TripEventKind,

    /// The trip this event belongs to; also the partition key.
    pub trip_id: TripId,

    /// Assigned driver, absent until acceptance.
    pub driver_id: Option<DriverId>,

    /// Passenger who requested the trip.
    pub passenger_id: PassengerId,

    /// When the transition happened.
    pub timestamp: DateTime<Utc>,

    /// Computed fare; zero for transitions that carry none.
    pub fare: Decimal,

    /// Position relevant to the transition, when there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_latitude: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_longitude: Option<f64>,

    /// Why the trip was unwound, on cancellation-flavored events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl TripEvent {
    fn base(kind: TripEventKind, trip: &Trip, at: DateTime<Utc>) -> Self {
        Self {
            event_type: kind,
            trip_id: trip.id(),
            driver_id: trip.driver_id(),
            passenger_id: trip.passenger_id(),
            timestamp: at,
            fare: trip.fare().unwrap_or(Decimal::ZERO),
            current_latitude: None,
            current_longitude: None,
            reason: None,
        }
    }

    /// Creates a TRIP_ACCEPTED event carrying the pickup position.
    pub fn accepted(trip: &Trip, at: DateTime<Utc>) -> Self {
        let mut event = Self::base(TripEventKind::Accepted, trip, at);
        event.current_latitude = Some(trip.start_point().latitude);
        event.current_longitude = Some(trip.start_point().longitude);
        event
    }

    /// Creates a TRIP_STARTED event carrying the pickup position.
    pub fn started(trip: &Trip, at: DateTime<Utc>) -> Self {
        let mut event = Self::base(TripEventKind::Started, trip, at);
        event.current_latitude = Some(trip.start_point().latitude);
        event.current_longitude = Some(trip.start_point().longitude);
        event
    }

    /// Creates a TRIP_COMPLETED event carrying the fare and drop-off position.
    pub fn completed(trip: &Trip, at: DateTime<Utc>) -> Self {
        let mut event = Self::base(TripEventKind::Completed, trip, at);
        event.current_latitude = Some(trip.end().latitude);
        event.current_longitude = Some(trip.end().longitude);
        event
    }

    /// Creates a TRIP_CANCELLED event, carrying the caller's reason when
    /// one was given.
    pub fn cancelled(trip: &Trip, reason: Option<String>, at: DateTime<Utc>) -> Self {
        let mut event = Self::base(TripEventKind::Cancelled, trip, at);
        event.reason = reason;
        event
    }

    /// Creates the compensating TRIP_CANCELLATION_REQUESTED event written
    /// when a payment outcome comes back failed.
    pub fn cancellation_requested(trip: &Trip, at: DateTime<Utc>) -> Self {
        Self::base(TripEventKind::CancellationRequested, trip, at)
    }

    /// Returns the event type tag in its wire form.
    pub fn event_type(&self) -> &'static str {
        self.event_type.as_str()
    }
}
