//! Catalog mapper: raw hierarchy + rules + offers → `ProductVariant`s
//!
//! Each variant with at least one SKU becomes one item priced from its
//! primary SKU (first SKU of the first color). Nested state price rows are
//! used when present; otherwise the price is estimated from the registration
//! and insurance rules.

use rust_decimal::Decimal;
use shared::models::{
    AvailableColor, CatalogFamily, CatalogSku, CatalogVariant, ComponentKind, DealerRef,
    InsuranceRule, ProductPrice, ProductVariant, RegistrationRule,
};

use super::enrichment::{pick_state_price, pricing_source_label, row_applies};
use super::money::{apply_offer_delta, percent_of, round_rupees};
use super::offers::OfferIndex;

/// Mapper inputs besides the hierarchy and rules
#[derive(Debug, Clone, Copy)]
pub struct MapperContext<'a> {
    pub state_code: &'a str,
    pub user_lat: Option<f64>,
    pub user_lng: Option<f64>,
    pub user_district: Option<&'a str>,
    pub offers: &'a OfferIndex,
    /// Apply offer deltas only when a real dealer with offers is behind them
    pub require_eligibility: bool,
    pub dealer: Option<&'a DealerRef>,
}

/// Registration tax for an ex-showroom price
pub fn registration_total(ex_showroom: Decimal, rules: &[RegistrationRule]) -> Decimal {
    rules
        .iter()
        .flat_map(|r| r.components.iter())
        .map(|c| {
            let amount = match c.kind {
                ComponentKind::Percentage => percent_of(ex_showroom, c.value),
                ComponentKind::Fixed => c.value,
            };
            let amount = c.min_amount.map_or(amount, |min| amount.max(min));
            c.max_amount.map_or(amount, |max| amount.min(max))
        })
        .sum()
}

/// Insurance premium for an ex-showroom price, GST included
pub fn insurance_total(ex_showroom: Decimal, rule: Option<&InsuranceRule>) -> Decimal {
    let Some(rule) = rule else {
        return Decimal::ZERO;
    };
    let addons: Decimal = rule
        .addons
        .iter()
        .filter(|a| a.is_default)
        .map(|a| a.amount)
        .sum();
    let net = percent_of(ex_showroom, rule.od_rate_percent) + rule.tp_premium + addons;
    net + percent_of(net, rule.gst_percent)
}

/// Rule-based estimate for an ex-showroom price
pub fn estimate_price(
    ex_showroom: Decimal,
    registration: &[RegistrationRule],
    insurance: Option<&InsuranceRule>,
    state_code: &str,
) -> ProductPrice {
    let rto = registration_total(ex_showroom, registration);
    let insurance = insurance_total(ex_showroom, insurance);
    let on_road = round_rupees(ex_showroom + rto + insurance);
    ProductPrice {
        ex_showroom,
        rto: round_rupees(rto),
        insurance: round_rupees(insurance),
        on_road,
        offer_price: on_road,
        discount: Decimal::ZERO,
        pricing_source: format!("Estimated, {state_code}"),
        is_estimate: true,
    }
}

fn nested_price(sku: &CatalogSku, ctx: &MapperContext<'_>) -> Option<ProductPrice> {
    let record = pick_state_price(
        sku.prices
            .iter()
            .filter(|r| row_applies(r, ctx.state_code, ctx.user_district)),
    )?;
    let rto = record.rto_total.unwrap_or(Decimal::ZERO);
    let insurance = record.insurance_total.unwrap_or(Decimal::ZERO);
    // Nested rows may omit on_road; compose it rather than fall back to ex-showroom
    let on_road = record
        .on_road_price
        .unwrap_or(record.ex_showroom_price + rto + insurance);
    Some(ProductPrice {
        ex_showroom: record.ex_showroom_price,
        rto,
        insurance,
        on_road,
        offer_price: on_road,
        discount: Decimal::ZERO,
        pricing_source: pricing_source_label(ctx.user_district, ctx.state_code),
        is_estimate: false,
    })
}

fn available_colors(variant: &CatalogVariant) -> Vec<AvailableColor> {
    variant
        .colors
        .iter()
        .filter_map(|color| {
            let sku = color.skus.first()?;
            Some(AvailableColor {
                id: color.id.clone(),
                name: color.name.clone(),
                hex_code: color.hex_code.clone(),
                sku_id: sku.id.clone(),
                image_url: sku.primary_image().map(str::to_string),
            })
        })
        .collect()
}

fn map_variant(
    family: &CatalogFamily,
    variant: &CatalogVariant,
    registration: &[RegistrationRule],
    insurance: Option<&InsuranceRule>,
    ctx: &MapperContext<'_>,
) -> Option<ProductVariant> {
    let sku = variant
        .colors
        .iter()
        .find_map(|c| c.skus.first())?;

    let mut price = match nested_price(sku, ctx) {
        Some(price) => price,
        None => {
            let Some(ex_showroom) = sku.price_base.or(family.price_base) else {
                tracing::debug!(
                    family = %family.name,
                    variant = %variant.name,
                    sku_id = %sku.id,
                    "Skipping variant without a price"
                );
                return None;
            };
            estimate_price(ex_showroom, registration, insurance, ctx.state_code)
        }
    };

    let (delta, dealer) = if ctx.require_eligibility {
        (ctx.offers.delta(&sku.id), ctx.dealer.cloned())
    } else {
        (Decimal::ZERO, None)
    };
    let offer = apply_offer_delta(price.on_road, delta);
    price.offer_price = offer.offer_price;
    price.discount = offer.discount;

    Some(ProductVariant {
        id: variant.id.clone(),
        family_id: family.id.clone(),
        family_name: family.name.clone(),
        variant_name: variant.name.clone(),
        slug: variant.slug.clone(),
        brand_name: family.brand_name.clone(),
        image_url: sku
            .primary_image()
            .map(str::to_string)
            .or_else(|| family.image_url.clone()),
        sku_id: sku.id.clone(),
        price,
        available_colors: available_colors(variant),
        dealer,
    })
}

/// Map the hierarchy into priced items, preserving family order
pub fn map_catalog_items(
    families: &[CatalogFamily],
    registration: &[RegistrationRule],
    insurance: Option<&InsuranceRule>,
    ctx: &MapperContext<'_>,
) -> Vec<ProductVariant> {
    let items: Vec<ProductVariant> = families
        .iter()
        .flat_map(|family| {
            family
                .variants
                .iter()
                .filter_map(move |variant| map_variant(family, variant, registration, insurance, ctx))
        })
        .collect();

    tracing::debug!(
        state_code = ctx.state_code,
        district = ctx.user_district.unwrap_or(""),
        lat = ctx.user_lat.unwrap_or_default(),
        lng = ctx.user_lng.unwrap_or_default(),
        require_eligibility = ctx.require_eligibility,
        items = items.len(),
        "Catalog mapped"
    );
    items
}
