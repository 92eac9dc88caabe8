//! Saga coordination for the trip lifecycle.
//!
//! The write side ([`TripService`]) drives guarded trip transitions and
//! appends outbox rows in the same transaction as each state change. The
//! read side ([`SagaCoordinator`]) consumes transport messages: it
//! deduplicates via the inbox, unwraps the double-nested payment
//! envelope, and dispatches into the state machine or the geo registry.
//! The relay that drains the outbox to the event bus is external; only
//! the write-side contract it depends on lives here.

mod coordinator;
mod envelope;
mod error;
mod trips;

pub use coordinator::{Consumed, SagaCoordinator};
pub use envelope::{
    DriverLocationUpdate, PaymentEventKind, PaymentOutcomeEvent, TransportMessage,
    unwrap_payment_event,
};
pub use error::{Result, SagaError};
pub use trips::TripService;
