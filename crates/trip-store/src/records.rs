//! Outbox and inbox rows.

use chrono::{DateTime, Utc};
use common::MessageId;
use domain::TripEvent;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Aggregate type tag written on trip outbox rows.
pub const TRIP_AGGREGATE_TYPE: &str = "Trip";

/// Inbox status written once an event's effects are durably applied.
const INBOX_PROCESSED: &str = "PROCESSED";

/// A row in the transactional outbox.
///
/// Written in the same transaction as the state change it announces; an
/// external relay drains unprocessed rows to the event bus and flips
/// `processed` after the publish acknowledges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxRecord {
    pub id: Uuid,
    pub aggregate_id: Uuid,
    pub aggregate_type: String,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub processed: bool,
}

impl OutboxRecord {
    /// Creates an unprocessed outbox row for a trip event.
    pub fn for_trip_event(event: &TripEvent) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: Uuid::new_v4(),
            aggregate_id: event.trip_id.as_uuid(),
            aggregate_type: TRIP_AGGREGATE_TYPE.to_string(),
            event_type: event.event_type().to_string(),
            payload: serde_json::to_value(event)?,
            created_at: event.timestamp,
            processed: false,
        })
    }
}

/// A row in the inbox, keyed by transport message id.
///
/// Existence of a row means the message's side effects were already
/// applied; redelivery with the same id is a no-op. Rows are never
/// updated or deleted here (retention is operational).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboxRecord {
    pub message_id: MessageId,
    pub event_type: String,
    pub processed_at: DateTime<Utc>,
    pub status: String,
}

impl InboxRecord {
    /// Creates a processed inbox row for a consumed message.
    pub fn processed(message_id: MessageId, event_type: impl Into<String>) -> Self {
        Self {
            message_id,
            event_type: event_type.into(),
            processed_at: Utc::now(),
            status: INBOX_PROCESSED.to_string(),
        }
    }
}
