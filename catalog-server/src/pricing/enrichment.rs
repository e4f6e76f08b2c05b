//! Authoritative price enrichment
//!
//! Re-reads `StatePriceRecord`s for each item's primary SKU and replaces the
//! mapper's price. Failed batches keep the mapper price.

use std::collections::HashMap;

use rust_decimal::Decimal;
use shared::models::{DISTRICT_ALL, ProductPrice, ProductVariant, StatePriceRecord};
use shared::util::same_district;

use super::money::apply_offer_delta;
use super::offers::OfferIndex;
use crate::db::CatalogBackend;

/// Pick the row to price from
///
/// Rows are scanned in order. The first usable row is taken, and it is
/// replaced only by a row whose district is not `ALL`.
pub fn pick_state_price<'a, I>(rows: I) -> Option<&'a StatePriceRecord>
where
    I: IntoIterator<Item = &'a StatePriceRecord>,
{
    let mut chosen: Option<&StatePriceRecord> = None;
    for row in rows {
        if chosen.is_none() || !row.is_state_wide() {
            chosen = Some(row);
        }
    }
    chosen
}

/// True when a row applies to the state and (optional) district
pub fn row_applies(row: &StatePriceRecord, state_code: &str, district: Option<&str>) -> bool {
    row.is_active
        && row.state_code.eq_ignore_ascii_case(state_code)
        && (row.is_state_wide() || district.is_some_and(|d| same_district(&row.district, d)))
}

/// `"<district>, <state>"`, with `ALL` when the district is unknown
pub fn pricing_source_label(district: Option<&str>, state_code: &str) -> String {
    format!("{}, {}", district.unwrap_or(DISTRICT_ALL), state_code)
}

/// Inputs of an enrichment pass
#[derive(Debug, Clone, Copy)]
pub struct EnrichmentContext<'a> {
    pub state_code: &'a str,
    pub district: Option<&'a str>,
    pub offers: &'a OfferIndex,
    pub require_eligibility: bool,
    pub batch_size: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichmentReport {
    pub enriched: usize,
    pub estimated: usize,
    pub failed_batches: usize,
}

/// Authoritative price for one row
pub fn price_from_record(
    record: &StatePriceRecord,
    delta: Decimal,
    source_label: String,
) -> ProductPrice {
    let on_road = record.on_road_or_ex_showroom();
    let offer = apply_offer_delta(on_road, delta);
    ProductPrice {
        ex_showroom: record.ex_showroom_price,
        rto: record.rto_total.unwrap_or(Decimal::ZERO),
        insurance: record.insurance_total.unwrap_or(Decimal::ZERO),
        on_road,
        offer_price: offer.offer_price,
        discount: offer.discount,
        pricing_source: source_label,
        is_estimate: false,
    }
}

/// Enrich items in place
pub async fn enrich_prices(
    backend: &dyn CatalogBackend,
    items: &mut [ProductVariant],
    ctx: EnrichmentContext<'_>,
) -> EnrichmentReport {
    let mut report = EnrichmentReport::default();
    if items.is_empty() {
        return report;
    }

    let mut districts = vec![DISTRICT_ALL.to_string()];
    if let Some(district) = ctx.district {
        districts.push(district.to_string());
    }

    let sku_ids: Vec<String> = items.iter().map(|i| i.sku_id.clone()).collect();
    let mut rows_by_sku: HashMap<String, Vec<StatePriceRecord>> = HashMap::new();

    for batch in sku_ids.chunks(ctx.batch_size.max(1)) {
        match backend
            .fetch_state_prices(ctx.state_code, &districts, batch)
            .await
        {
            Ok(rows) => {
                for row in rows {
                    rows_by_sku
                        .entry(row.vehicle_color_id.clone())
                        .or_default()
                        .push(row);
                }
            }
            Err(e) if e.is_abort() => {
                tracing::debug!(error = %e, "Price enrichment batch aborted");
                report.failed_batches += 1;
            }
            Err(e) => {
                e.log("enrich_prices");
                report.failed_batches += 1;
            }
        }
    }

    let label = pricing_source_label(ctx.district, ctx.state_code);
    for item in items.iter_mut() {
        let rows = rows_by_sku.get(&item.sku_id);
        let chosen = rows.and_then(|rows| {
            pick_state_price(
                rows.iter()
                    .filter(|r| row_applies(r, ctx.state_code, ctx.district)),
            )
        });
        match chosen {
            Some(record) => {
                let delta = if ctx.require_eligibility {
                    ctx.offers.delta(&item.sku_id)
                } else {
                    Decimal::ZERO
                };
                item.price = price_from_record(record, delta, label.clone());
                report.enriched += 1;
            }
            None => {
                if item.price.is_estimate {
                    report.estimated += 1;
                }
            }
        }
    }

    tracing::debug!(
        enriched = report.enriched,
        estimated = report.estimated,
        failed_batches = report.failed_batches,
        "Price enrichment finished"
    );
    report
}
