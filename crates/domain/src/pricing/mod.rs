//! Fare categories, pricing policies and the pricing resolver.

mod policy;
mod resolver;

pub use policy::{FareCategory, PricingPolicy};
pub use resolver::PricingResolver;
