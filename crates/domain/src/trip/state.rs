//! Trip state machine.

use serde::{Deserialize, Serialize};

/// The status of a trip in its lifecycle.
///
/// State transitions:
/// ```text
/// Requested ──► Accepted ──► InProgress ──► Completed ──┬──► Paid
///     │             │             │                     └──► PaymentFailed
///     └─────────────┴─────────────┴──► Cancelled
/// ```
///
/// Completed, Paid, PaymentFailed and Cancelled admit no further
/// transitions (payment outcomes are applied only from Completed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TripStatus {
    /// Passenger requested a ride, no driver assigned yet.
    #[default]
    Requested,

    /// A driver won the acceptance race and is on the way.
    Accepted,

    /// Passenger picked up, ride underway.
    InProgress,

    /// Ride finished, fare computed, awaiting payment outcome.
    Completed,

    /// Trip was cancelled (terminal).
    Cancelled,

    /// Payment settled successfully (terminal).
    Paid,

    /// Payment failed; compensation has been requested (terminal).
    PaymentFailed,
}

impl TripStatus {
    /// Returns true if a driver can accept the trip in this status.
    pub fn can_accept(&self) -> bool {
        matches!(self, TripStatus::Requested)
    }

    /// Returns true if the ride can start in this status.
    pub fn can_start(&self) -> bool {
        matches!(self, TripStatus::Accepted)
    }

    /// Returns true if the ride can complete in this status.
    pub fn can_complete(&self) -> bool {
        matches!(self, TripStatus::InProgress)
    }

    /// Returns true if the trip can be cancelled in this status.
    pub fn can_cancel(&self) -> bool {
        matches!(
            self,
            TripStatus::Requested | TripStatus::Accepted | TripStatus::InProgress
        )
    }

    /// Returns true if a payment outcome can be applied in this status.
    pub fn can_apply_payment(&self) -> bool {
        matches!(self, TripStatus::Completed)
    }

    /// Returns true if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TripStatus::Cancelled | TripStatus::Paid | TripStatus::PaymentFailed
        )
    }

    /// Returns true if the fare must be present in this status.
    pub fn has_fare(&self) -> bool {
        matches!(
            self,
            TripStatus::Completed | TripStatus::Paid | TripStatus::PaymentFailed
        )
    }

    /// Returns the status name in its wire form.
    pub fn as_str(&self) -> &'static str {
        match self {
            TripStatus::Requested => "REQUESTED",
            TripStatus::Accepted => "ACCEPTED",
            TripStatus::InProgress => "IN_PROGRESS",
            TripStatus::Completed => "COMPLETED",
            TripStatus::Cancelled => "CANCELLED",
            TripStatus::Paid => "PAID",
            TripStatus::PaymentFailed => "PAYMENT_FAILED",
        }
    }
}

impl std::fmt::Display for TripStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TripStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "REQUESTED" => Ok(TripStatus::Requested),
            "ACCEPTED" => Ok(TripStatus::Accepted),
            "IN_PROGRESS" => Ok(TripStatus::InProgress),
            "COMPLETED" => Ok(TripStatus::Completed),
            "CANCELLED" => Ok(TripStatus::Cancelled),
            "PAID" => Ok(TripStatus::Paid),
            "PAYMENT_FAILED" => Ok(TripStatus::PaymentFailed),
            other => Err(format!("unknown trip status: {other}")),
        }
    }
}
