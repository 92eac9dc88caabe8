//! Trip aggregate and related types.

mod aggregate;
mod events;
mod state;

pub use aggregate::Trip;
pub use events::{TripEvent, TripEventKind};
pub use state::TripStatus;

use thiserror::Error;

/// Errors that can occur during trip operations.
#[derive(Debug, Error)]
pub enum TripError {
    /// Trip is not in the expected state for the requested transition.
    #[error("Invalid state transition: cannot {action} from {current_status} status")]
    InvalidStateTransition {
        current_status: TripStatus,
        action: &'static str,
    },

    /// Completion was attempted before the trip was started.
    #[error("Trip has no start timestamp")]
    NotStarted,
}
