//! Catalog pipeline output models
//!
//! These are what presentation clients render. Money is serialized as JSON
//! numbers (camelCase keys).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::dealer::DealerRef;

/// Computed price of one item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPrice {
    #[serde(with = "rust_decimal::serde::float")]
    pub ex_showroom: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub rto: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub insurance: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub on_road: Decimal,
    /// `on_road` plus the dealer offer delta
    #[serde(with = "rust_decimal::serde::float")]
    pub offer_price: Decimal,
    /// Savings shown to the buyer; negative for a surge
    #[serde(with = "rust_decimal::serde::float")]
    pub discount: Decimal,
    /// Human-readable provenance, e.g. `"Pune, MH"`
    pub pricing_source: String,
    /// True until an authoritative price row has been applied
    pub is_estimate: bool,
}

/// Color swatch offered for an item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableColor {
    pub id: String,
    pub name: String,
    pub hex_code: Option<String>,
    pub sku_id: String,
    pub image_url: Option<String>,
}

/// One priced catalog entry (family + variant)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductVariant {
    /// Variant id
    pub id: String,
    pub family_id: String,
    pub family_name: String,
    pub variant_name: String,
    pub slug: String,
    pub brand_name: Option<String>,
    pub image_url: Option<String>,
    /// Primary SKU used for pricing
    pub sku_id: String,
    pub price: ProductPrice,
    pub available_colors: Vec<AvailableColor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dealer: Option<DealerRef>,
}

/// Catalog state exposed to presentation clients
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogState {
    pub items: Vec<ProductVariant>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub sku_count: i64,
}

impl CatalogState {
    /// State shown while a run is in flight; previous items stay visible
    pub fn loading(mut self) -> Self {
        self.is_loading = true;
        self
    }

    /// Fatal-failure state: no items, error set
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            items: Vec::new(),
            is_loading: false,
            error: Some(error.into()),
            sku_count: 0,
        }
    }
}
