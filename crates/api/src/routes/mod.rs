//! HTTP route handlers.

pub mod drivers;
pub mod health;
pub mod metrics;
pub mod trips;
