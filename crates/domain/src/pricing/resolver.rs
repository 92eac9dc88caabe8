//! Category-to-policy resolution.

use std::collections::HashMap;

use super::{FareCategory, PricingPolicy};

/// Maps fare categories to pricing policies.
///
/// Adding a category only requires registering a policy; the trip state
/// machine stays agnostic to which policy priced a completion. Lookups
/// for categories without a registered policy fall back to Standard.
#[derive(Debug, Clone)]
pub struct PricingResolver {
    policies: HashMap<FareCategory, PricingPolicy>,
    fallback: PricingPolicy,
}

impl PricingResolver {
    /// Creates a resolver with the built-in Standard and Premium policies.
    pub fn new() -> Self {
        let mut policies = HashMap::new();
        policies.insert(FareCategory::Standard, PricingPolicy::standard());
        policies.insert(FareCategory::Premium, PricingPolicy::premium());
        Self {
            policies,
            fallback: PricingPolicy::standard(),
        }
    }

    /// Registers or replaces the policy for a category.
    pub fn register(&mut self, category: FareCategory, policy: PricingPolicy) {
        self.policies.insert(category, policy);
    }

    /// Resolves the policy for a category, falling back to Standard.
    pub fn resolve(&self, category: FareCategory) -> &PricingPolicy {
        self.policies.get(&category).unwrap_or(&self.fallback)
    }
}

impl Default for PricingResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_resolves_registered_categories() {
        let resolver = PricingResolver::new();
        assert_eq!(
            resolver.resolve(FareCategory::Standard),
            &PricingPolicy::standard()
        );
        assert_eq!(
            resolver.resolve(FareCategory::Premium),
            &PricingPolicy::premium()
        );
    }

    #[test]
    fn test_register_replaces_policy() {
        let mut resolver = PricingResolver::new();
        let surge = PricingPolicy {
            opening_fee: dec!(190.00),
            per_km_fee: dec!(60.00),
            per_minute_fee: dec!(16.00),
            minimum_fee: dec!(350.00),
        };
        resolver.register(FareCategory::Premium, surge);
        assert_eq!(resolver.resolve(FareCategory::Premium), &surge);
        // Standard untouched
        assert_eq!(
            resolver.resolve(FareCategory::Standard),
            &PricingPolicy::standard()
        );
    }
}
