use common::{MessageId, TripId};
use domain::TripStatus;
use thiserror::Error;

/// Errors that can occur when interacting with the trip store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The trip does not exist.
    #[error("Trip not found: {0}")]
    NotFound(TripId),

    /// The compare-and-swap on status lost: someone else transitioned the
    /// trip first.
    #[error("Status conflict for trip {trip_id}: expected {expected}, found {actual}")]
    StatusConflict {
        trip_id: TripId,
        expected: TripStatus,
        actual: TripStatus,
    },

    /// The stored status column does not parse as a known status. The
    /// row was written outside this store or the schema drifted.
    #[error("Corrupt status {status:?} for trip {trip_id}")]
    CorruptStatus { trip_id: TripId, status: String },

    /// A trip with this id already exists.
    #[error("Trip already exists: {0}")]
    DuplicateTrip(TripId),

    /// An inbox row for this message id already exists; the event's
    /// effects were applied by an earlier delivery.
    #[error("Message already processed: {0}")]
    DuplicateMessage(MessageId),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for trip store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
