//! Domain layer for the ride lifecycle saga.
//!
//! This crate provides the core domain types:
//! - Trip aggregate with its guarded state machine
//! - Trip domain events in the wire format published to the event bus
//! - Fare categories, pricing policies and the pricing resolver
//!
//! Everything here is pure: no I/O, no store access. Persistence and
//! coordination live in the `trip-store` and `saga` crates.

pub mod pricing;
pub mod trip;

pub use pricing::{FareCategory, PricingPolicy, PricingResolver};
pub use trip::{Trip, TripError, TripEvent, TripEventKind, TripStatus};
