//! Catalog pricing pipeline
//!
//! One run, strictly in order:
//! location → catalog source → rules → dealer → offers → mapper → enrichment.
//!
//! Only the catalog and rule reads are fatal. Every stage is raced against
//! the run's cancellation token.

use std::future::Future;
use std::sync::Arc;

use shared::error::ErrorCode;
use shared::models::{CatalogFamily, DEFAULT_STATE_CODE, Location, ProductVariant};
use shared::util::now_millis;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::dealer::{DealerResolution, DealerSource, dealer_ref, resolve_dealer};
use super::enrichment::{EnrichmentContext, EnrichmentReport, enrich_prices};
use super::location::{LeadContext, load_lead_context, resolve_location};
use super::mapper::{MapperContext, map_catalog_items};
use super::offers::{OfferIndex, fetch_offers};
use super::rules::fetch_rules;
use super::session::{PricingDebugRecord, PricingSession};
use super::source::{CatalogSource, CatalogSourceKind, default_sources};
use crate::db::{CatalogBackend, RepoError};

/// Default number of SKU ids per enrichment query
pub const DEFAULT_ENRICHMENT_BATCH_SIZE: usize = 100;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to load catalog: {0}")]
    Catalog(RepoError),

    #[error("Failed to load pricing rules: {0}")]
    Rules(RepoError),

    #[error("Catalog load cancelled")]
    Cancelled,
}

impl PipelineError {
    /// Cancelled runs and aborted backend requests are ignored silently
    pub fn is_abort(&self) -> bool {
        match self {
            PipelineError::Cancelled => true,
            PipelineError::Catalog(e) | PipelineError::Rules(e) => e.is_abort(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            PipelineError::Catalog(_) => ErrorCode::CatalogLoadFailed,
            PipelineError::Rules(_) => ErrorCode::RulesLoadFailed,
            PipelineError::Cancelled => ErrorCode::RequestCancelled,
        }
    }
}

/// Pipeline settings
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub default_state_code: String,
    pub fast_path_enabled: bool,
    pub enrichment_batch_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_state_code: DEFAULT_STATE_CODE.to_string(),
            fast_path_enabled: false,
            enrichment_batch_size: DEFAULT_ENRICHMENT_BATCH_SIZE,
        }
    }
}

/// Inputs of one catalog load
#[derive(Debug, Clone, Default)]
pub struct LoadRequest {
    pub lead_id: Option<String>,
    /// Raw JSON of the client-side cached location record
    pub cached_location: Option<String>,
}

/// Result of a successful run
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub items: Vec<ProductVariant>,
    pub sku_count: i64,
    pub location: Location,
    pub dealer: DealerResolution,
    pub catalog_source: CatalogSourceKind,
    pub require_eligibility: bool,
    pub enrichment: EnrichmentReport,
}

async fn cancellable<T>(
    token: &CancellationToken,
    fut: impl Future<Output = T>,
) -> Result<T, PipelineError> {
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(PipelineError::Cancelled),
        out = fut => Ok(out),
    }
}

pub struct CatalogPipeline {
    backend: Arc<dyn CatalogBackend>,
    sources: Vec<Box<dyn CatalogSource>>,
    config: PipelineConfig,
}

impl CatalogPipeline {
    pub fn new(backend: Arc<dyn CatalogBackend>, config: PipelineConfig) -> Self {
        Self {
            backend,
            sources: default_sources(config.fast_path_enabled),
            config,
        }
    }

    /// Replace the source chain
    pub fn with_sources(mut self, sources: Vec<Box<dyn CatalogSource>>) -> Self {
        self.sources = sources;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    async fn load_catalog(
        &self,
        state_code: &str,
    ) -> Result<(Vec<CatalogFamily>, CatalogSourceKind), RepoError> {
        for source in &self.sources {
            let kind = source.kind();
            match source.load(self.backend.as_ref(), state_code).await {
                Ok(Some(families)) => return Ok((families, kind)),
                Ok(None) => continue,
                Err(e) if kind == CatalogSourceKind::Summary && !e.is_abort() => {
                    tracing::warn!(state_code, error = %e, "Summary source failed, falling through");
                }
                Err(e) => {
                    if !e.is_abort() {
                        e.log("load_catalog");
                    }
                    return Err(e);
                }
            }
        }
        Err(RepoError::NotFound("catalog source".into()))
    }

    /// Execute one run
    pub async fn run(
        &self,
        session: &PricingSession,
        request: &LoadRequest,
        run_id: u64,
        token: &CancellationToken,
    ) -> Result<PipelineOutput, PipelineError> {
        let backend = self.backend.as_ref();

        let lead = match cancellable(token, load_lead_context(backend, request.lead_id.as_deref()))
            .await?
        {
            Ok(lead) => lead,
            Err(e) => {
                tracing::warn!(run_id, error = %e, "Lead lookup failed, using cached location");
                LeadContext::default()
            }
        };

        let mut location = resolve_location(
            request.cached_location.as_deref(),
            &lead,
            &self.config.default_state_code,
        );
        tracing::info!(
            run_id,
            state_code = %location.state_code,
            district = location.district().unwrap_or(""),
            "Catalog load started"
        );

        let (families, catalog_source) = cancellable(token, self.load_catalog(&location.state_code))
            .await?
            .map_err(PipelineError::Catalog)?;

        let rules = cancellable(token, fetch_rules(backend, &location.state_code))
            .await?
            .map_err(|e| {
                if !e.is_abort() {
                    e.log("fetch_rules");
                }
                PipelineError::Rules(e)
            })?;

        let dealer = match cancellable(token, resolve_dealer(backend, &lead, &location)).await? {
            Ok(dealer) => dealer,
            Err(e) => {
                tracing::warn!(run_id, error = %e, "Dealer resolution failed");
                DealerResolution::none()
            }
        };
        if dealer.source.is_lead()
            && let Some(overridden) = dealer.location_override.clone()
        {
            location = overridden;
        }

        let dealer_info = match dealer.dealer_id.as_deref() {
            Some(id) => Some(cancellable(token, dealer_ref(backend, id)).await?),
            None => None,
        };

        let offers = cancellable(
            token,
            fetch_offers(backend, session, dealer.dealer_id.as_deref(), &location.state_code),
        )
        .await?;
        let require_eligibility = dealer.dealer_id.is_some() && !offers.is_empty();
        let offer_index = match (&dealer.dealer_id, require_eligibility) {
            (Some(id), true) => OfferIndex::for_dealer(id, &offers),
            _ => OfferIndex::default(),
        };

        let mut items = map_catalog_items(
            &families,
            &rules.registration,
            rules.insurance.as_ref(),
            &MapperContext {
                state_code: &location.state_code,
                user_lat: location.latitude,
                user_lng: location.longitude,
                user_district: location.district(),
                offers: &offer_index,
                require_eligibility,
                dealer: dealer_info.as_ref(),
            },
        );

        let enrichment = cancellable(
            token,
            enrich_prices(
                backend,
                &mut items,
                EnrichmentContext {
                    state_code: &location.state_code,
                    district: location.district(),
                    offers: &offer_index,
                    require_eligibility,
                    batch_size: self.config.enrichment_batch_size,
                },
            ),
        )
        .await?;

        let sku_count = match cancellable(token, backend.count_active_skus()).await? {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(run_id, error = %e, "SKU count failed, counting loaded tree");
                count_tree_skus(&families)
            }
        };

        session.record_debug(PricingDebugRecord {
            run_id,
            state_code: location.state_code.clone(),
            district: location.district().map(str::to_string),
            pincode: location.pincode.clone(),
            dealer_id: dealer.dealer_id.clone(),
            dealer_source: dealer.source,
            dealer_name: dealer_info.as_ref().and_then(|d| d.name.clone()),
            market_offers_count: offers.len(),
            require_eligibility,
            catalog_source,
            enriched_count: enrichment.enriched,
            estimated_count: enrichment.estimated,
            offers_disabled: session.offers_disabled(),
            recorded_at: now_millis(),
        });

        tracing::info!(
            run_id,
            state_code = %location.state_code,
            dealer_id = dealer.dealer_id.as_deref().unwrap_or(""),
            source = catalog_source.as_str(),
            items = items.len(),
            enriched = enrichment.enriched,
            "Catalog load finished"
        );

        Ok(PipelineOutput {
            items,
            sku_count,
            location,
            dealer,
            catalog_source,
            require_eligibility,
            enrichment,
        })
    }
}

fn count_tree_skus(families: &[CatalogFamily]) -> i64 {
    families
        .iter()
        .flat_map(|f| f.variants.iter())
        .flat_map(|v| v.colors.iter())
        .map(|c| c.skus.len() as i64)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abort_classification() {
        assert!(PipelineError::Cancelled.is_abort());
        let cancelled = RepoError::Query {
            message: "canceling statement due to user request".into(),
            details: None,
            hint: None,
            code: Some("57014".into()),
        };
        assert!(PipelineError::Catalog(cancelled).is_abort());
        assert!(!PipelineError::Catalog(RepoError::query("statement aborted")).is_abort());
        assert!(!PipelineError::Rules(RepoError::query("permission denied")).is_abort());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            PipelineError::Catalog(RepoError::query("boom")).code(),
            ErrorCode::CatalogLoadFailed
        );
        assert_eq!(
            PipelineError::Rules(RepoError::query("boom")).code(),
            ErrorCode::RulesLoadFailed
        );
        assert_eq!(PipelineError::Cancelled.code(), ErrorCode::RequestCancelled);
    }

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.default_state_code, "MH");
        assert!(!config.fast_path_enabled);
        assert_eq!(config.enrichment_batch_size, 100);
    }
}
