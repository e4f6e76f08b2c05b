//! Catalog hierarchy models
//!
//! Family → Variant → Color → SKU, with media and per-state price rows hanging
//! off each SKU. Row types double as tree nodes: children are skipped when
//! decoding a flat row and filled in by the loader.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::price::StatePriceRecord;

/// Product category for sellable vehicles
pub const CATEGORY_VEHICLE: &str = "VEHICLE";
/// Status of a live catalog row
pub const STATUS_ACTIVE: &str = "ACTIVE";

/// Brand metadata (label only)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Brand {
    pub id: String,
    pub name: String,
    pub slug: Option<String>,
    pub logo_url: Option<String>,
}

/// Top-level vehicle line (e.g. "Activa")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct CatalogFamily {
    pub id: String,
    pub brand_id: Option<String>,
    pub brand_name: Option<String>,
    pub name: String,
    pub slug: String,
    pub category: String,
    pub status: String,
    pub image_url: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub price_base: Option<Decimal>,
    #[serde(default)]
    #[cfg_attr(feature = "db", sqlx(skip))]
    pub variants: Vec<CatalogVariant>,
}

impl CatalogFamily {
    pub fn is_active_vehicle(&self) -> bool {
        self.status == STATUS_ACTIVE && self.category == CATEGORY_VEHICLE
    }
}

/// Trim level (e.g. "Standard", "Deluxe")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct CatalogVariant {
    pub id: String,
    pub family_id: String,
    pub name: String,
    pub slug: String,
    pub position: i32,
    #[serde(default)]
    #[cfg_attr(feature = "db", sqlx(skip))]
    pub colors: Vec<CatalogColor>,
}

/// Paint option of a variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct CatalogColor {
    pub id: String,
    pub variant_id: String,
    pub name: String,
    pub hex_code: Option<String>,
    pub position: i32,
    #[serde(default)]
    #[cfg_attr(feature = "db", sqlx(skip))]
    pub skus: Vec<CatalogSku>,
}

/// Sellable unit: one variant in one color
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct CatalogSku {
    pub id: String,
    pub color_id: String,
    pub sku_code: String,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub price_base: Option<Decimal>,
    pub is_primary: bool,
    #[serde(default)]
    #[cfg_attr(feature = "db", sqlx(skip))]
    pub media: Vec<MediaAsset>,
    #[serde(default)]
    #[cfg_attr(feature = "db", sqlx(skip))]
    pub prices: Vec<StatePriceRecord>,
}

impl CatalogSku {
    /// Primary image, falling back to the first asset by position
    pub fn primary_image(&self) -> Option<&str> {
        self.media
            .iter()
            .find(|m| m.is_primary)
            .or_else(|| self.media.iter().min_by_key(|m| m.position))
            .map(|m| m.url.as_str())
    }
}

/// Image or video attached to a SKU
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct MediaAsset {
    pub id: String,
    pub sku_id: String,
    pub url: String,
    pub kind: String,
    pub is_primary: bool,
    pub position: i32,
}
