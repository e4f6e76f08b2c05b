//! Per-state market summary (fast-path read model)

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Cheapest SKU per family per state, pre-aggregated by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct MarketSummaryRow {
    pub family_id: String,
    pub state_code: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub lowest_price: Decimal,
    pub image_url: Option<String>,
    pub slug: Option<String>,
    pub sku_count: i64,
}

/// Total number of SKUs covered by a set of summary rows
pub fn summary_sku_coverage(rows: &[MarketSummaryRow]) -> i64 {
    rows.iter().map(|r| r.sku_count.max(0)).sum()
}
