//! Money arithmetic and the offer sign convention
//!
//! An offer delta is added to the on-road price: a negative delta is a
//! discount, a positive delta a surge. The buyer-facing `discount` field is
//! always the negated delta.

use rust_decimal::prelude::*;

/// Whole rupees, half away from zero
pub fn round_rupees(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// `percent` % of `base`
pub fn percent_of(base: Decimal, percent: Decimal) -> Decimal {
    base * percent / Decimal::ONE_HUNDRED
}

/// Buyer-facing discount for an offer delta
pub fn discount_from_delta(delta: Decimal) -> Decimal {
    -delta
}

/// Offer delta recovered from a discount
pub fn delta_from_discount(discount: Decimal) -> Decimal {
    -discount
}

/// Offer price and discount after applying a dealer delta
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OfferPricing {
    pub offer_price: Decimal,
    pub discount: Decimal,
}

/// Apply a signed dealer delta on top of the on-road price
pub fn apply_offer_delta(on_road: Decimal, delta: Decimal) -> OfferPricing {
    OfferPricing {
        offer_price: on_road + delta,
        discount: discount_from_delta(delta),
    }
}
