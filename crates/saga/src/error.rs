//! Saga error types.

use common::{MessageId, TripId};
use dispatch::RegistryError;
use domain::{TripError, TripStatus};
use thiserror::Error;
use trip_store::StoreError;

/// Errors that can occur during saga operations.
#[derive(Debug, Error)]
pub enum SagaError {
    /// The referenced trip does not exist.
    #[error("Trip not found: {0}")]
    TripNotFound(TripId),

    /// The trip's current status forbids the requested transition.
    #[error("Trip error: {0}")]
    Trip(#[from] TripError),

    /// A concurrent caller transitioned the trip between our read and
    /// our conditional write.
    #[error("Concurrent transition on trip {trip_id}: expected {expected}, found {actual}")]
    ConcurrentTransition {
        trip_id: TripId,
        expected: TripStatus,
        actual: TripStatus,
    },

    /// The message was already consumed; its effects are in place.
    #[error("Message already processed: {0}")]
    DuplicateDelivery(MessageId),

    /// The store failed for infrastructure reasons. Propagated so the
    /// transport layer redelivers.
    #[error("Store error: {0}")]
    Store(StoreError),

    /// The geo registry failed.
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// The transport envelope or its nested payload was malformed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<StoreError> for SagaError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(trip_id) => SagaError::TripNotFound(trip_id),
            StoreError::StatusConflict {
                trip_id,
                expected,
                actual,
            } => SagaError::ConcurrentTransition {
                trip_id,
                expected,
                actual,
            },
            StoreError::DuplicateMessage(message_id) => SagaError::DuplicateDelivery(message_id),
            other => SagaError::Store(other),
        }
    }
}

impl SagaError {
    /// True for business-rule rejections that retrying cannot fix.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            SagaError::Trip(_) | SagaError::ConcurrentTransition { .. }
        )
    }
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
