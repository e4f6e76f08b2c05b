//! End-to-end catalog loads against the in-memory backend

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use catalog_server::db::{BackendCall, CatalogBackend, RepoError, RepoResult};
use catalog_server::pricing::dealer::DealerSource;
use catalog_server::pricing::{
    CatalogController, CatalogPipeline, CatalogSource, CatalogSourceKind, DeepSource, LoadRequest,
    PipelineConfig, PipelineError, PricingSession,
};
use common::*;
use shared::models::{CatalogFamily, MarketSummaryRow};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

fn cached(raw: &str) -> LoadRequest {
    LoadRequest {
        lead_id: None,
        cached_location: Some(raw.to_string()),
    }
}

fn for_lead(lead_id: &str, raw: Option<&str>) -> LoadRequest {
    LoadRequest {
        lead_id: Some(lead_id.to_string()),
        cached_location: raw.map(str::to_string),
    }
}

// ========================================================================
// Pricing
// ========================================================================

#[tokio::test]
async fn test_district_row_beats_state_wide_row() {
    let backend = seeded_backend();
    backend.add_state_price(state_price("sku-1", "ALL", 100000));
    backend.add_state_price(state_price("sku-1", "Pune", 98000));

    let state = controller(backend).load(cached(PUNE_CACHE)).await;

    assert!(state.error.is_none());
    assert_eq!(state.items.len(), 1);
    let price = &state.items[0].price;
    assert_eq!(price.on_road, rupees(98000));
    assert_eq!(price.pricing_source, "Pune, MH");
    assert!(!price.is_estimate);
}

#[tokio::test]
async fn test_unpriced_sku_keeps_rule_estimate() {
    let backend = seeded_backend();

    let state = controller(backend).load(cached(PUNE_CACHE)).await;

    let price = &state.items[0].price;
    assert!(price.is_estimate);
    assert_eq!(price.ex_showroom, rupees(90000));
    assert_eq!(price.on_road, rupees(99000));
    assert_eq!(price.pricing_source, "Estimated, MH");
    assert_eq!(state.sku_count, 1);
}

#[tokio::test]
async fn test_primary_dealer_discount_end_to_end() {
    let backend = seeded_backend();
    backend.add_state_price(state_price("sku-1", "ALL", 100000));
    backend.add_primary_dealer(primary_mapping("Pune", PRIMARY_DEALER));
    backend.add_tenant(tenant(PRIMARY_DEALER, "Pune Motors"));
    backend.set_dealer_offers(PRIMARY_DEALER, "MH", vec![offer(PRIMARY_DEALER, "sku-1", -5000)]);

    let controller = controller(backend);
    let state = controller.load(cached(PUNE_CACHE)).await;

    let item = &state.items[0];
    assert_eq!(item.price.on_road, rupees(100000));
    assert_eq!(item.price.offer_price, rupees(95000));
    assert_eq!(item.price.discount, rupees(5000));
    let dealer = item.dealer.as_ref().expect("dealer attached");
    assert_eq!(dealer.id, PRIMARY_DEALER);
    assert_eq!(dealer.name.as_deref(), Some("Pune Motors"));

    let debug = controller.debug_record().expect("debug record");
    assert_eq!(debug.dealer_source, DealerSource::DistrictPrimary);
    assert_eq!(debug.market_offers_count, 1);
    assert!(debug.require_eligibility);
}

#[tokio::test]
async fn test_surge_delta_raises_price() {
    let backend = seeded_backend();
    backend.add_state_price(state_price("sku-1", "ALL", 100000));
    backend.add_primary_dealer(primary_mapping("Pune", PRIMARY_DEALER));
    backend.set_dealer_offers(PRIMARY_DEALER, "MH", vec![offer(PRIMARY_DEALER, "sku-1", 3000)]);

    let state = controller(backend).load(cached(PUNE_CACHE)).await;

    let price = &state.items[0].price;
    assert_eq!(price.offer_price, rupees(103000));
    assert_eq!(price.discount, rupees(-3000));
}

#[tokio::test]
async fn test_discount_is_negated_delta_for_every_item() {
    let backend = seeded_backend();
    backend.add_family(family("fam-2", "sku-2", 120000));
    backend.add_state_price(state_price("sku-1", "ALL", 100000));
    backend.add_state_price(state_price("sku-2", "ALL", 130000));
    backend.add_primary_dealer(primary_mapping("Pune", PRIMARY_DEALER));
    backend.set_dealer_offers(
        PRIMARY_DEALER,
        "MH",
        vec![
            offer(PRIMARY_DEALER, "sku-1", -2500),
            offer(PRIMARY_DEALER, "sku-2", 1500),
        ],
    );

    let state = controller(backend).load(cached(PUNE_CACHE)).await;

    assert_eq!(state.items.len(), 2);
    for item in &state.items {
        let delta = item.price.offer_price - item.price.on_road;
        assert_eq!(item.price.discount, -delta, "item {}", item.sku_id);
    }
}

#[tokio::test]
async fn test_no_dealer_means_no_delta() {
    let backend = seeded_backend();
    backend.add_state_price(state_price("sku-1", "ALL", 100000));
    // Offers exist, but no dealer is resolvable without a district
    backend.set_dealer_offers(PRIMARY_DEALER, "MH", vec![offer(PRIMARY_DEALER, "sku-1", -5000)]);

    let backend_ref = backend.clone();
    let state = controller(backend).load(cached(r#"{"stateCode":"MH"}"#)).await;

    let item = &state.items[0];
    assert_eq!(item.price.offer_price, item.price.on_road);
    assert_eq!(item.price.discount, rupees(0));
    assert!(item.dealer.is_none());
    assert_eq!(item.price.pricing_source, "ALL, MH");
    assert_eq!(backend_ref.call_count(BackendCall::DealerOffers), 0);
}

// ========================================================================
// Dealer resolution
// ========================================================================

#[tokio::test]
async fn test_invalid_dealer_id_never_reaches_rpc() {
    let backend = seeded_backend();
    backend.add_lead(lead("lead-1", None, Some("not-a-uuid"), Some("")));
    backend.set_dealer_offers("not-a-uuid", "MH", vec![offer("not-a-uuid", "sku-1", -5000)]);

    let controller = controller(backend.clone());
    let state = controller
        .load(for_lead("lead-1", Some(r#"{"stateCode":"MH"}"#)))
        .await;

    assert!(state.error.is_none());
    assert_eq!(backend.call_count(BackendCall::DealerOffers), 0);
    assert!(state.items[0].dealer.is_none());
    let debug = controller.debug_record().unwrap();
    assert_eq!(debug.dealer_source, DealerSource::None);
    assert!(debug.dealer_id.is_none());
}

#[tokio::test]
async fn test_selected_dealer_beats_lead_tenant() {
    let backend = seeded_backend();
    backend.add_state_price(state_price("sku-1", "ALL", 100000));
    backend.add_lead(lead("lead-1", None, Some(LEAD_TENANT), Some(SELECTED_DEALER)));
    backend.add_tenant(tenant(SELECTED_DEALER, "Agent Studio"));
    backend.set_dealer_offers(SELECTED_DEALER, "MH", vec![offer(SELECTED_DEALER, "sku-1", -2000)]);
    backend.set_dealer_offers(LEAD_TENANT, "MH", vec![offer(LEAD_TENANT, "sku-1", -9000)]);

    let controller = controller(backend);
    let state = controller.load(for_lead("lead-1", Some(PUNE_CACHE))).await;

    assert_eq!(state.items[0].price.offer_price, rupees(98000));
    let debug = controller.debug_record().unwrap();
    assert_eq!(debug.dealer_id.as_deref(), Some(SELECTED_DEALER));
    assert_eq!(debug.dealer_source, DealerSource::LeadSelected);
    assert_eq!(debug.dealer_name.as_deref(), Some("Agent Studio"));
}

#[tokio::test]
async fn test_invalid_selected_dealer_falls_back_to_tenant() {
    let backend = seeded_backend();
    backend.add_lead(lead("lead-1", None, Some(LEAD_TENANT), Some("legacy-42")));

    let controller = controller(backend);
    controller.load(for_lead("lead-1", Some(PUNE_CACHE))).await;

    let debug = controller.debug_record().unwrap();
    assert_eq!(debug.dealer_id.as_deref(), Some(LEAD_TENANT));
    assert_eq!(debug.dealer_source, DealerSource::LeadTenant);
}

#[tokio::test]
async fn test_lead_location_overrides_cached_location() {
    let backend = seeded_backend();
    backend.add_state_price(state_price("sku-1", "ALL", 100000));
    backend.add_state_price(state_price("sku-1", "Mumbai", 97000));
    backend.add_state_price(state_price("sku-1", "Pune", 98000));
    backend.add_pincode(pune_pincode());
    backend.add_lead(lead("lead-1", Some("411001"), Some(LEAD_TENANT), None));

    let controller = controller(backend);
    let state = controller.load(for_lead("lead-1", Some(MUMBAI_CACHE))).await;

    let price = &state.items[0].price;
    assert_eq!(price.on_road, rupees(98000));
    assert_eq!(price.pricing_source, "Pune, MH");
    let debug = controller.debug_record().unwrap();
    assert_eq!(debug.district.as_deref(), Some("Pune"));
    assert_eq!(debug.pincode.as_deref(), Some("411001"));
}

#[tokio::test]
async fn test_missing_lead_uses_cached_location() {
    let backend = seeded_backend();
    backend.add_state_price(state_price("sku-1", "Mumbai", 97000));

    let controller = controller(backend);
    let state = controller.load(for_lead("lead-unknown", Some(MUMBAI_CACHE))).await;

    assert_eq!(state.items[0].price.pricing_source, "Mumbai, MH");
    assert_eq!(state.items[0].price.on_road, rupees(97000));
}

#[tokio::test]
async fn test_lead_lookup_failure_degrades() {
    let backend = seeded_backend();
    backend.fail(BackendCall::Lead);

    let state = controller(backend).load(for_lead("lead-1", Some(PUNE_CACHE))).await;

    assert!(state.error.is_none());
    assert_eq!(state.items.len(), 1);
}

// ========================================================================
// Offer circuit breaker
// ========================================================================

#[tokio::test]
async fn test_offer_failure_latches_for_the_session() {
    let backend = seeded_backend();
    backend.add_state_price(state_price("sku-1", "ALL", 100000));
    backend.add_primary_dealer(primary_mapping("Pune", PRIMARY_DEALER));
    backend.fail(BackendCall::DealerOffers);

    let controller = controller(backend.clone());
    let first = controller.load(cached(PUNE_CACHE)).await;
    assert!(first.error.is_none());
    assert_eq!(first.items[0].price.offer_price, rupees(100000));
    assert!(controller.session().offers_disabled());

    // Recovered backend is not retried within the same session
    backend.recover(BackendCall::DealerOffers);
    backend.set_dealer_offers(PRIMARY_DEALER, "MH", vec![offer(PRIMARY_DEALER, "sku-1", -5000)]);
    let second = controller.load(cached(PUNE_CACHE)).await;

    assert_eq!(backend.call_count(BackendCall::DealerOffers), 1);
    assert_eq!(second.items[0].price.offer_price, rupees(100000));
    assert!(controller.debug_record().unwrap().offers_disabled);
}

#[tokio::test]
async fn test_breaker_is_scoped_to_one_session() {
    let backend = seeded_backend();
    backend.add_primary_dealer(primary_mapping("Pune", PRIMARY_DEALER));
    backend.fail(BackendCall::DealerOffers);

    let first = controller(backend.clone());
    first.load(cached(PUNE_CACHE)).await;
    assert!(first.session().offers_disabled());

    let second = controller(backend.clone());
    second.load(cached(PUNE_CACHE)).await;
    assert_eq!(backend.call_count(BackendCall::DealerOffers), 2);
}

// ========================================================================
// Failures
// ========================================================================

#[tokio::test]
async fn test_deep_loader_failure_is_fatal() {
    let backend = seeded_backend();
    backend.fail(BackendCall::CatalogTree);

    let state = controller(backend).load(cached(PUNE_CACHE)).await;

    assert!(state.items.is_empty());
    assert!(state.error.is_some());
    assert!(!state.is_loading);
}

#[tokio::test]
async fn test_rules_failure_is_fatal() {
    let backend = seeded_backend();
    backend.fail(BackendCall::InsuranceRules);

    let state = controller(backend).load(cached(PUNE_CACHE)).await;

    assert!(state.items.is_empty());
    assert!(state.error.as_deref().unwrap_or("").contains("pricing rules"));
}

#[tokio::test]
async fn test_enrichment_failure_keeps_mapper_prices() {
    let backend = seeded_backend();
    backend.add_state_price(state_price("sku-1", "Pune", 98000));
    backend.fail(BackendCall::StatePrices);

    let controller = controller(backend);
    let state = controller.load(cached(PUNE_CACHE)).await;

    // Nested rows from the tree still price the item
    assert!(state.error.is_none());
    assert_eq!(state.items[0].price.on_road, rupees(98000));
    assert_eq!(controller.debug_record().unwrap().enriched_count, 0);
}

#[tokio::test]
async fn test_failed_enrichment_batch_keeps_its_items_only() {
    let backend = seeded_backend();
    backend.add_family(family("fam-2", "sku-2", 80000));
    backend.add_state_price(state_price("sku-1", "Pune", 98000));
    // Without on_road the mapper composes 78000; enrichment would take 68000
    let mut partial = state_price("sku-2", "Pune", 78000);
    partial.on_road_price = None;
    backend.add_state_price(partial);
    backend.fail_nth(BackendCall::StatePrices, 2);

    let config = PipelineConfig {
        enrichment_batch_size: 1,
        ..PipelineConfig::default()
    };
    let output = pipeline(backend.clone(), config)
        .run(&PricingSession::new(false), &cached(PUNE_CACHE), 1, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(backend.call_count(BackendCall::StatePrices), 2);
    assert_eq!(output.enrichment.failed_batches, 1);
    assert_eq!(output.enrichment.enriched, 1);

    assert_eq!(output.items[0].sku_id, "sku-1");
    assert_eq!(output.items[0].price.on_road, rupees(98000));
    assert!(!output.items[0].price.is_estimate);

    assert_eq!(output.items[1].sku_id, "sku-2");
    assert_eq!(output.items[1].price.on_road, rupees(78000));
}

/// Deep source whose transaction was rolled back by the server
struct AbortedTransactionSource;

#[async_trait]
impl CatalogSource for AbortedTransactionSource {
    fn kind(&self) -> CatalogSourceKind {
        CatalogSourceKind::Deep
    }

    async fn load(
        &self,
        _backend: &dyn CatalogBackend,
        _state_code: &str,
    ) -> RepoResult<Option<Vec<CatalogFamily>>> {
        Err(RepoError::Query {
            message: "current transaction is aborted, commands ignored until end of transaction block"
                .into(),
            details: None,
            hint: None,
            code: Some("25P02".into()),
        })
    }
}

#[tokio::test]
async fn test_aborted_transaction_is_reported_as_error() {
    let backend = seeded_backend();
    let pipeline = CatalogPipeline::new(backend, PipelineConfig::default())
        .with_sources(vec![Box::new(AbortedTransactionSource)]);
    let controller = CatalogController::new(Arc::new(pipeline), false);

    let state = controller.load(cached(PUNE_CACHE)).await;

    assert!(state.items.is_empty());
    assert!(state.error.as_deref().unwrap_or("").contains("current transaction is aborted"));
    assert!(!state.is_loading);
}

#[tokio::test]
async fn test_failed_count_falls_back_to_tree() {
    let backend = seeded_backend();
    backend.add_family(family("fam-2", "sku-2", 80000));
    backend.fail(BackendCall::CountSkus);

    let state = controller(backend).load(cached(PUNE_CACHE)).await;

    assert!(state.error.is_none());
    assert_eq!(state.sku_count, 2);
}

#[tokio::test]
async fn test_recovery_after_fatal_failure() {
    let backend = seeded_backend();
    backend.fail(BackendCall::CatalogTree);

    let controller = controller(backend.clone());
    assert!(controller.load(cached(PUNE_CACHE)).await.error.is_some());

    backend.recover(BackendCall::CatalogTree);
    let state = controller.load(cached(PUNE_CACHE)).await;
    assert!(state.error.is_none());
    assert_eq!(state.items.len(), 1);
}

// ========================================================================
// Catalog sources
// ========================================================================

fn summary_row(family_id: &str, lowest: i64, sku_count: i64) -> MarketSummaryRow {
    MarketSummaryRow {
        family_id: family_id.into(),
        state_code: "MH".into(),
        lowest_price: rupees(lowest),
        image_url: Some(format!("https://cdn.example/{family_id}.webp")),
        slug: Some(family_id.into()),
        sku_count,
    }
}

async fn run_once(pipeline: &CatalogPipeline, request: &LoadRequest) -> Result<CatalogSourceKind, PipelineError> {
    let session = PricingSession::new(false);
    let token = CancellationToken::new();
    pipeline
        .run(&session, request, 1, &token)
        .await
        .map(|output| output.catalog_source)
}

fn fast_path() -> PipelineConfig {
    PipelineConfig {
        fast_path_enabled: true,
        ..PipelineConfig::default()
    }
}

#[tokio::test]
async fn test_fast_path_disabled_by_default() {
    let backend = seeded_backend();
    backend.add_summary_row(summary_row("fam-1", 90000, 1));

    let pipeline = pipeline(backend.clone(), PipelineConfig::default());
    let source = run_once(&pipeline, &cached(PUNE_CACHE)).await.unwrap();

    assert_eq!(source, CatalogSourceKind::Deep);
    assert_eq!(backend.call_count(BackendCall::MarketSummary), 0);
}

#[tokio::test]
async fn test_fast_path_serves_complete_summary() {
    let backend = seeded_backend();
    backend.add_family(family("fam-2", "sku-2", 120000));
    backend.add_summary_row(summary_row("fam-2", 110000, 1));
    backend.add_summary_row(summary_row("fam-1", 85000, 1));

    let pipeline = pipeline(backend, fast_path());
    let session = PricingSession::new(false);
    let output = pipeline
        .run(&session, &cached(PUNE_CACHE), 1, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(output.catalog_source, CatalogSourceKind::Summary);
    // Summary rank (cheapest first) is the display order
    let families: Vec<_> = output.items.iter().map(|i| i.family_id.as_str()).collect();
    assert_eq!(families, ["fam-1", "fam-2"]);
}

#[tokio::test]
async fn test_fast_path_declines_incomplete_summary() {
    let backend = seeded_backend();
    backend.add_family(family("fam-2", "sku-2", 120000));
    backend.add_summary_row(summary_row("fam-1", 85000, 1));

    let pipeline = pipeline(backend.clone(), fast_path());
    let source = run_once(&pipeline, &cached(PUNE_CACHE)).await.unwrap();

    assert_eq!(source, CatalogSourceKind::Deep);
    assert_eq!(backend.call_count(BackendCall::MarketSummary), 1);
}

#[tokio::test]
async fn test_fast_path_failure_falls_through_to_deep() {
    let backend = seeded_backend();
    backend.fail(BackendCall::MarketSummary);

    let pipeline = pipeline(backend, fast_path());
    let source = run_once(&pipeline, &cached(PUNE_CACHE)).await.unwrap();

    assert_eq!(source, CatalogSourceKind::Deep);
}

// ========================================================================
// Cancellation
// ========================================================================

#[tokio::test]
async fn test_cancelled_token_stops_run() {
    let backend = seeded_backend();
    let pipeline = pipeline(backend.clone(), PipelineConfig::default());
    let token = CancellationToken::new();
    token.cancel();

    let result = pipeline
        .run(&PricingSession::new(false), &cached(PUNE_CACHE), 1, &token)
        .await;

    assert!(matches!(result, Err(PipelineError::Cancelled)));
    assert_eq!(backend.call_count(BackendCall::CatalogTree), 0);
}

/// Deep source that parks its first load until cancelled
struct ParkedSource {
    loads: AtomicUsize,
    started: Arc<Notify>,
}

#[async_trait]
impl CatalogSource for ParkedSource {
    fn kind(&self) -> CatalogSourceKind {
        CatalogSourceKind::Deep
    }

    async fn load(
        &self,
        backend: &dyn CatalogBackend,
        state_code: &str,
    ) -> RepoResult<Option<Vec<CatalogFamily>>> {
        if self.loads.fetch_add(1, Ordering::SeqCst) == 0 {
            self.started.notify_one();
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        DeepSource.load(backend, state_code).await
    }
}

#[tokio::test]
async fn test_newer_load_supersedes_older() {
    let backend = seeded_backend();
    backend.add_state_price(state_price("sku-1", "ALL", 100000));
    backend.add_state_price(state_price("sku-1", "Pune", 98000));

    let started = Arc::new(Notify::new());
    let pipeline = CatalogPipeline::new(backend, PipelineConfig::default()).with_sources(vec![
        Box::new(ParkedSource {
            loads: AtomicUsize::new(0),
            started: started.clone(),
        }),
    ]);
    let controller = Arc::new(CatalogController::new(Arc::new(pipeline), false));

    let first = tokio::spawn({
        let controller = controller.clone();
        async move { controller.load(cached(r#"{"stateCode":"MH"}"#)).await }
    });
    started.notified().await;
    assert!(controller.snapshot().is_loading);

    let second = controller.load(cached(PUNE_CACHE)).await;
    let first = tokio::time::timeout(Duration::from_secs(5), first)
        .await
        .expect("superseded run finishes promptly")
        .unwrap();

    assert_eq!(controller.latest_run(), 2);
    assert_eq!(second.items[0].price.pricing_source, "Pune, MH");
    // The superseded run reports the newer state instead of its own
    assert_eq!(first, second);
    assert_eq!(controller.snapshot(), second);
}

#[tokio::test]
async fn test_loading_flag_clears_after_each_run() {
    let backend = seeded_backend();
    let controller = controller(backend);

    for _ in 0..3 {
        let state = controller.load(cached(PUNE_CACHE)).await;
        assert!(!state.is_loading);
    }
    assert_eq!(controller.latest_run(), 3);
}
