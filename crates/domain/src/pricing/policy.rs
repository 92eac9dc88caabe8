//! Pricing policy parameters and fare math.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Fare category tag selecting a pricing policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FareCategory {
    /// Regular ride.
    #[default]
    Standard,

    /// Larger or higher-end vehicle.
    Premium,
}

impl FareCategory {
    /// Parses a category tag, falling back to Standard for anything
    /// unrecognized. Unknown tags must not fail fare computation.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "PREMIUM" => FareCategory::Premium,
            _ => FareCategory::Standard,
        }
    }

    /// Returns the category tag in its wire form.
    pub fn as_str(&self) -> &'static str {
        match self {
            FareCategory::Standard => "STANDARD",
            FareCategory::Premium => "PREMIUM",
        }
    }
}

impl std::fmt::Display for FareCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Stateless fare parameters for one category.
///
/// A policy is just a parameter set feeding one formula; there is no
/// per-policy behavior beyond these numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingPolicy {
    /// Flat fee charged when the meter opens.
    pub opening_fee: Decimal,

    /// Fee per kilometer of great-circle distance.
    pub per_km_fee: Decimal,

    /// Fee per elapsed minute.
    pub per_minute_fee: Decimal,

    /// Floor applied to the computed total.
    pub minimum_fee: Decimal,
}

impl PricingPolicy {
    /// The standard-category policy.
    pub fn standard() -> Self {
        Self {
            opening_fee: dec!(95.00),
            per_km_fee: dec!(30.00),
            per_minute_fee: dec!(8.00),
            minimum_fee: dec!(175.00),
        }
    }

    /// The premium-category policy.
    pub fn premium() -> Self {
        Self {
            opening_fee: dec!(140.00),
            per_km_fee: dec!(45.00),
            per_minute_fee: dec!(12.00),
            minimum_fee: dec!(260.00),
        }
    }

    /// Computes the fare for a ride of the given distance and duration.
    ///
    /// `opening + per_km × km + per_minute × minutes`, floored at
    /// `minimum_fee` and rounded to two decimal places.
    pub fn fare(&self, distance_km: Decimal, elapsed_minutes: Decimal) -> Decimal {
        let metered = self.opening_fee
            + self.per_km_fee * distance_km
            + self.per_minute_fee * elapsed_minutes;
        metered.max(self.minimum_fee).round_dp(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_tag_parsing() {
        assert_eq!(FareCategory::from_tag("STANDARD"), FareCategory::Standard);
        assert_eq!(FareCategory::from_tag("PREMIUM"), FareCategory::Premium);
        assert_eq!(FareCategory::from_tag("LUXURY_XL"), FareCategory::Standard);
        assert_eq!(FareCategory::from_tag(""), FareCategory::Standard);
    }

    #[test]
    fn test_fare_formula() {
        let policy = PricingPolicy::standard();
        // 95 + 30*10 + 8*20 = 555
        let fare = policy.fare(dec!(10), dec!(20));
        assert_eq!(fare, dec!(555.00));
    }

    #[test]
    fn test_minimum_fee_floor() {
        let policy = PricingPolicy::standard();
        // 95 + 30*0.1 + 8*0.5 = 102, below the 175 floor
        let fare = policy.fare(dec!(0.1), dec!(0.5));
        assert_eq!(fare, dec!(175.00));
    }

    #[test]
    fn test_fare_is_deterministic() {
        let policy = PricingPolicy::premium();
        let a = policy.fare(dec!(7.25), dec!(13.5));
        let b = policy.fare(dec!(7.25), dec!(13.5));
        assert_eq!(a, b);
    }

    #[test]
    fn test_fare_rounds_to_cents() {
        let policy = PricingPolicy::standard();
        let fare = policy.fare(dec!(3.333), dec!(0));
        // 95 + 30*3.333 = 194.99
        assert_eq!(fare, dec!(194.99));
    }
}
