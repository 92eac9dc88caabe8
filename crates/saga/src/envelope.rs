//! Transport envelopes and inbound event payloads.

use chrono::{DateTime, Utc};
use common::{DriverId, MessageId, PassengerId, TripId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A message as delivered by the event bus: `id` and `eventType` headers
/// plus a JSON body.
#[derive(Debug, Clone)]
pub struct TransportMessage {
    pub id: MessageId,
    pub event_type: String,
    pub body: String,
}

impl TransportMessage {
    /// Creates a message from its headers and body.
    pub fn new(id: MessageId, event_type: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id,
            event_type: event_type.into(),
            body: body.into(),
        }
    }
}

/// The outer layer of a payment-event body.
///
/// The publisher's outbox relay wraps the domain event in a JSON object
/// whose `payload` field is itself a serialized JSON string, so consuming
/// means deserializing twice. Preserved as-is for wire compatibility.
#[derive(Debug, Deserialize)]
struct RelayEnvelope {
    payload: String,
}

/// Outcome tag on a payment event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentEventKind {
    #[serde(rename = "PAYMENT_SUCCESSFUL")]
    Successful,

    #[serde(rename = "PAYMENT_FAILED")]
    Failed,
}

impl PaymentEventKind {
    /// Returns the event type tag in its wire form.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentEventKind::Successful => "PAYMENT_SUCCESSFUL",
            PaymentEventKind::Failed => "PAYMENT_FAILED",
        }
    }
}

/// A payment outcome consumed from the `payment_events` topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOutcomeEvent {
    pub trip_id: TripId,
    pub passenger_id: PassengerId,
    pub amount: Decimal,
    pub event_type: PaymentEventKind,
    #[serde(default)]
    pub failure_reason: Option<String>,
}

impl PaymentOutcomeEvent {
    /// Returns true if the payment settled.
    pub fn succeeded(&self) -> bool {
        self.event_type == PaymentEventKind::Successful
    }
}

/// Unwraps the double-nested payment envelope: once for the relay
/// wrapper, once for the embedded domain event.
pub fn unwrap_payment_event(body: &str) -> Result<PaymentOutcomeEvent, serde_json::Error> {
    let outer: RelayEnvelope = serde_json::from_str(body)?;
    serde_json::from_str(&outer.payload)
}

/// A position update consumed from the `driver_location_updates` topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverLocationUpdate {
    pub driver_id: DriverId,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
}
