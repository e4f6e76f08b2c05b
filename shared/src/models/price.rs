//! Authoritative per-state SKU price rows

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// District value of a state-wide default row
pub const DISTRICT_ALL: &str = "ALL";

/// Price of one SKU in one state (optionally one district)
///
/// For a given SKU and state a district-specific row takes precedence over the
/// `ALL` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct StatePriceRecord {
    /// SKU reference
    pub vehicle_color_id: String,
    pub state_code: String,
    /// District name or `ALL`
    pub district: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub ex_showroom_price: Decimal,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub rto_total: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub insurance_total: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub on_road_price: Option<Decimal>,
    pub is_active: bool,
}

impl StatePriceRecord {
    /// True for the state-wide default row
    pub fn is_state_wide(&self) -> bool {
        self.district.eq_ignore_ascii_case(DISTRICT_ALL)
    }

    /// On-road price, falling back to ex-showroom when the row has none
    pub fn on_road_or_ex_showroom(&self) -> Decimal {
        self.on_road_price.unwrap_or(self.ex_showroom_price)
    }
}
