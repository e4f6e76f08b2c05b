//! Per-client pricing session
//!
//! Holds the offer circuit breaker and the optional debug sink. One session
//! lives as long as its catalog controller.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use serde::Serialize;

use super::dealer::DealerSource;
use super::source::CatalogSourceKind;

/// Provenance of the latest pricing decision
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingDebugRecord {
    pub run_id: u64,
    pub state_code: String,
    pub district: Option<String>,
    pub pincode: Option<String>,
    pub dealer_id: Option<String>,
    pub dealer_source: DealerSource,
    pub dealer_name: Option<String>,
    pub market_offers_count: usize,
    pub require_eligibility: bool,
    pub catalog_source: CatalogSourceKind,
    pub enriched_count: usize,
    pub estimated_count: usize,
    pub offers_disabled: bool,
    pub recorded_at: i64,
}

/// In-memory sink keeping the latest record
#[derive(Debug, Default)]
pub struct DebugSink {
    latest: RwLock<Option<PricingDebugRecord>>,
}

impl DebugSink {
    pub fn record(&self, record: PricingDebugRecord) {
        *self.latest.write() = Some(record);
    }

    pub fn latest(&self) -> Option<PricingDebugRecord> {
        self.latest.read().clone()
    }
}

#[derive(Debug, Default)]
pub struct PricingSession {
    offers_disabled: AtomicBool,
    debug: Option<DebugSink>,
}

impl PricingSession {
    pub fn new(debug_enabled: bool) -> Self {
        Self {
            offers_disabled: AtomicBool::new(false),
            debug: debug_enabled.then(DebugSink::default),
        }
    }

    pub fn offers_disabled(&self) -> bool {
        self.offers_disabled.load(Ordering::Acquire)
    }

    /// Trip the offer circuit breaker; true if this call tripped it
    pub fn disable_offers(&self) -> bool {
        !self.offers_disabled.swap(true, Ordering::AcqRel)
    }

    pub fn debug_enabled(&self) -> bool {
        self.debug.is_some()
    }

    /// Record provenance; no-op when the sink is disabled
    pub fn record_debug(&self, record: PricingDebugRecord) {
        if let Some(sink) = &self.debug {
            sink.record(record);
        }
    }

    pub fn latest_debug(&self) -> Option<PricingDebugRecord> {
        self.debug.as_ref().and_then(DebugSink::latest)
    }
}
