//! Catalog sources
//!
//! [`CatalogSource`] hides whether the hierarchy came from the per-state
//! market summary (fast path) or the full relational read (deep path). The
//! pipeline asks each configured source in turn; a source may decline, in
//! which case the next one is tried.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use serde::Serialize;
use shared::models::{CatalogFamily, summary_sku_coverage};

use crate::db::{CatalogBackend, RepoResult};

/// Which source served a catalog load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogSourceKind {
    Summary,
    Deep,
}

impl CatalogSourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::Deep => "deep",
        }
    }
}

#[async_trait]
pub trait CatalogSource: Send + Sync {
    fn kind(&self) -> CatalogSourceKind;

    /// Load the hierarchy for a state; `Ok(None)` means the source declined
    async fn load(
        &self,
        backend: &dyn CatalogBackend,
        state_code: &str,
    ) -> RepoResult<Option<Vec<CatalogFamily>>>;
}

/// Fast path over `MarketSummaryRow`s
///
/// Serves only when enabled and the summary covers every active SKU.
#[derive(Debug, Clone, Copy)]
pub struct SummarySource {
    enabled: bool,
}

impl SummarySource {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

#[async_trait]
impl CatalogSource for SummarySource {
    fn kind(&self) -> CatalogSourceKind {
        CatalogSourceKind::Summary
    }

    async fn load(
        &self,
        backend: &dyn CatalogBackend,
        state_code: &str,
    ) -> RepoResult<Option<Vec<CatalogFamily>>> {
        if !self.enabled {
            return Ok(None);
        }

        let summary = backend.fetch_market_summary(state_code).await?;
        if summary.is_empty() {
            tracing::info!(state_code, "Market summary empty, using deep catalog");
            return Ok(None);
        }

        let covered = summary_sku_coverage(&summary);
        let total = backend.count_active_skus().await?;
        if covered < total {
            tracing::info!(
                state_code,
                covered,
                total,
                "Market summary incomplete, using deep catalog"
            );
            return Ok(None);
        }

        // Summary order is the display order; later reads must not reorder
        let rank: HashMap<&str, usize> = summary
            .iter()
            .enumerate()
            .map(|(i, row)| (row.family_id.as_str(), i))
            .collect();
        let family_ids: Vec<String> = summary.iter().map(|r| r.family_id.clone()).collect();

        let mut families = backend.fetch_catalog_tree(Some(family_ids.as_slice())).await?;

        let brand_ids: Vec<String> = families
            .iter()
            .filter_map(|f| f.brand_id.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let brands: HashMap<String, String> = backend
            .fetch_brands(&brand_ids)
            .await?
            .into_iter()
            .map(|b| (b.id, b.name))
            .collect();

        for family in &mut families {
            if let Some(&i) = rank.get(family.id.as_str()) {
                let row = &summary[i];
                family.price_base = Some(row.lowest_price);
                if family.image_url.is_none() {
                    family.image_url = row.image_url.clone();
                }
            }
            if let Some(name) = family.brand_id.as_ref().and_then(|id| brands.get(id)) {
                family.brand_name = Some(name.clone());
            }
        }
        families.sort_by_key(|f| rank.get(f.id.as_str()).copied().unwrap_or(usize::MAX));

        Ok(Some(families))
    }
}

/// Full Family → Variant → Color → SKU read; never declines
#[derive(Debug, Clone, Copy, Default)]
pub struct DeepSource;

#[async_trait]
impl CatalogSource for DeepSource {
    fn kind(&self) -> CatalogSourceKind {
        CatalogSourceKind::Deep
    }

    async fn load(
        &self,
        backend: &dyn CatalogBackend,
        _state_code: &str,
    ) -> RepoResult<Option<Vec<CatalogFamily>>> {
        backend.fetch_catalog_tree(None).await.map(Some)
    }
}

/// Configured source chain: summary (if flagged on) then deep
pub fn default_sources(fast_path_enabled: bool) -> Vec<Box<dyn CatalogSource>> {
    vec![
        Box::new(SummarySource::new(fast_path_enabled)),
        Box::new(DeepSource),
    ]
}
