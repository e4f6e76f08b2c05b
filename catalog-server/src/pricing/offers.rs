//! Dealer offer fetching
//!
//! The `get_dealer_offers` call sits behind a session-scoped circuit
//! breaker: the first failure disables it for the rest of the session and
//! degrades to no offers. It is never retried automatically.

use std::collections::HashMap;

use rust_decimal::Decimal;
use shared::models::DealerOffer;

use super::session::PricingSession;
use crate::db::CatalogBackend;
use crate::utils::validation::is_valid_uuid_v1_5;

/// Fetch offers for a dealer in a state
///
/// Skipped (empty) when the dealer id is missing or malformed, or when the
/// session breaker has tripped.
pub async fn fetch_offers(
    backend: &dyn CatalogBackend,
    session: &PricingSession,
    dealer_id: Option<&str>,
    state_code: &str,
) -> Vec<DealerOffer> {
    let Some(dealer_id) = dealer_id.filter(|id| is_valid_uuid_v1_5(id)) else {
        return Vec::new();
    };
    if session.offers_disabled() {
        tracing::debug!(dealer_id, "Offer fetch skipped, breaker open");
        return Vec::new();
    }

    match backend.get_dealer_offers(dealer_id, state_code).await {
        Ok(offers) => {
            tracing::debug!(dealer_id, state_code, offers = offers.len(), "Dealer offers loaded");
            offers
        }
        Err(e) if e.is_abort() => {
            tracing::debug!(dealer_id, error = %e, "Offer fetch aborted");
            Vec::new()
        }
        Err(e) => {
            e.log("get_dealer_offers");
            if session.disable_offers() {
                tracing::warn!(dealer_id, state_code, "Dealer offers disabled for this session");
            }
            Vec::new()
        }
    }
}

/// SKU → offer delta for one dealer
#[derive(Debug, Clone, Default)]
pub struct OfferIndex {
    deltas: HashMap<String, Decimal>,
}

impl OfferIndex {
    /// Index the rows belonging to `dealer_id`; other dealers' rows are ignored
    pub fn for_dealer(dealer_id: &str, offers: &[DealerOffer]) -> Self {
        let deltas = offers
            .iter()
            .filter(|o| o.dealer_id.eq_ignore_ascii_case(dealer_id))
            .map(|o| (o.vehicle_color_id.clone(), o.best_offer))
            .collect();
        Self { deltas }
    }

    /// Delta for a SKU, zero when the dealer has no offer on it
    pub fn delta(&self, sku_id: &str) -> Decimal {
        self.deltas.get(sku_id).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }
}
