//! Catalog tree assembly from flat rows

use std::collections::HashMap;

use shared::models::{
    CatalogColor, CatalogFamily, CatalogSku, CatalogVariant, MediaAsset, StatePriceRecord,
};

/// Flat rows as read from the catalog tables
#[derive(Debug, Default, Clone)]
pub struct CatalogRows {
    pub families: Vec<CatalogFamily>,
    pub variants: Vec<CatalogVariant>,
    pub colors: Vec<CatalogColor>,
    pub skus: Vec<CatalogSku>,
    pub media: Vec<MediaAsset>,
    pub prices: Vec<StatePriceRecord>,
}

/// Build the Family → Variant → Color → SKU tree
///
/// Family order is preserved. Children are ordered by position (SKUs: primary
/// first, then by code). Rows whose parent is missing are dropped.
pub fn assemble_catalog_tree(rows: CatalogRows) -> Vec<CatalogFamily> {
    let CatalogRows {
        families,
        variants,
        colors,
        skus,
        media,
        prices,
    } = rows;

    let mut media_by_sku: HashMap<String, Vec<MediaAsset>> = HashMap::new();
    for asset in media {
        media_by_sku.entry(asset.sku_id.clone()).or_default().push(asset);
    }
    let mut prices_by_sku: HashMap<String, Vec<StatePriceRecord>> = HashMap::new();
    for price in prices {
        prices_by_sku
            .entry(price.vehicle_color_id.clone())
            .or_default()
            .push(price);
    }

    let mut skus_by_color: HashMap<String, Vec<CatalogSku>> = HashMap::new();
    for mut sku in skus {
        let mut assets = media_by_sku.remove(&sku.id).unwrap_or_default();
        assets.sort_by_key(|m| m.position);
        sku.media = assets;
        sku.prices = prices_by_sku.remove(&sku.id).unwrap_or_default();
        skus_by_color.entry(sku.color_id.clone()).or_default().push(sku);
    }

    let mut colors_by_variant: HashMap<String, Vec<CatalogColor>> = HashMap::new();
    for mut color in colors {
        let mut color_skus = skus_by_color.remove(&color.id).unwrap_or_default();
        color_skus.sort_by(|a, b| {
            b.is_primary
                .cmp(&a.is_primary)
                .then_with(|| a.sku_code.cmp(&b.sku_code))
        });
        color.skus = color_skus;
        colors_by_variant
            .entry(color.variant_id.clone())
            .or_default()
            .push(color);
    }

    let mut variants_by_family: HashMap<String, Vec<CatalogVariant>> = HashMap::new();
    for mut variant in variants {
        let mut variant_colors = colors_by_variant.remove(&variant.id).unwrap_or_default();
        variant_colors.sort_by_key(|c| c.position);
        variant.colors = variant_colors;
        variants_by_family
            .entry(variant.family_id.clone())
            .or_default()
            .push(variant);
    }

    let orphans = media_by_sku.len()
        + prices_by_sku.len()
        + skus_by_color.len()
        + colors_by_variant.len();

    let tree: Vec<CatalogFamily> = families
        .into_iter()
        .map(|mut family| {
            let mut family_variants = variants_by_family.remove(&family.id).unwrap_or_default();
            family_variants.sort_by_key(|v| v.position);
            family.variants = family_variants;
            family
        })
        .collect();

    let orphans = orphans + variants_by_family.len();
    if orphans > 0 {
        tracing::debug!(orphan_groups = orphans, "Dropped catalog rows without a parent");
    }

    tree
}
