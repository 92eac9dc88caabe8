//! Trip persistence for the ride lifecycle saga.
//!
//! Defines the [`TripStore`] port plus the outbox/inbox record types that
//! make state changes and their announcements atomic, with two adapters:
//! an in-memory store for tests and local runs, and a PostgreSQL store
//! whose guarded update is a compare-and-swap on the persisted status.

mod error;
mod memory;
mod postgres;
mod records;
mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryTripStore;
pub use postgres::PostgresTripStore;
pub use records::{InboxRecord, OutboxRecord};
pub use store::TripStore;
