//! In-process [`CatalogBackend`]
//!
//! Holds catalog data in memory, records every call it receives and can be
//! told to fail specific calls. Used by the integration tests and for running
//! the server without a database.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use shared::models::{
    Brand, CatalogFamily, DealerOffer, InsuranceRule, Lead, MarketSummaryRow, PincodeRecord,
    PrimaryDealerMapping, RegistrationRule, RuleStatus, StatePriceRecord, Tenant, VehicleType,
};
use shared::util::same_district;

use super::{CatalogBackend, RepoError, RepoResult};

/// Backend operation, as recorded by [`MemoryBackend`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendCall {
    MarketSummary,
    Brands,
    CatalogTree,
    RegistrationRules,
    InsuranceRules,
    Lead,
    Pincode,
    PrimaryDealer,
    DealerOffers,
    Tenants,
    StatePrices,
    CountSkus,
}

#[derive(Default)]
struct Data {
    summary: Vec<MarketSummaryRow>,
    brands: Vec<Brand>,
    families: Vec<CatalogFamily>,
    registration_rules: Vec<RegistrationRule>,
    insurance_rules: Vec<InsuranceRule>,
    leads: HashMap<String, Lead>,
    pincodes: HashMap<String, PincodeRecord>,
    primary_dealers: Vec<PrimaryDealerMapping>,
    /// (tenant id, state code) → offers returned by the RPC
    offers: HashMap<(String, String), Vec<DealerOffer>>,
    tenants: Vec<Tenant>,
    state_prices: Vec<StatePriceRecord>,
    sku_count: Option<i64>,
}

/// In-memory backend
#[derive(Default)]
pub struct MemoryBackend {
    data: RwLock<Data>,
    calls: Mutex<Vec<BackendCall>>,
    failures: RwLock<HashSet<BackendCall>>,
    /// (call, 1-based invocation number) pairs that fail once
    failures_at: RwLock<HashSet<(BackendCall, usize)>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Seeding ─────────────────────────────────────────────────────

    /// Add a family tree; nested SKU prices are ignored, use `add_state_price`
    pub fn add_family(&self, family: CatalogFamily) {
        self.data.write().families.push(family);
    }

    pub fn add_brand(&self, brand: Brand) {
        self.data.write().brands.push(brand);
    }

    pub fn add_summary_row(&self, row: MarketSummaryRow) {
        self.data.write().summary.push(row);
    }

    pub fn add_registration_rule(&self, rule: RegistrationRule) {
        self.data.write().registration_rules.push(rule);
    }

    pub fn add_insurance_rule(&self, rule: InsuranceRule) {
        self.data.write().insurance_rules.push(rule);
    }

    pub fn add_lead(&self, lead: Lead) {
        self.data.write().leads.insert(lead.id.clone(), lead);
    }

    pub fn add_pincode(&self, record: PincodeRecord) {
        self.data
            .write()
            .pincodes
            .insert(record.pincode.clone(), record);
    }

    pub fn add_primary_dealer(&self, mapping: PrimaryDealerMapping) {
        self.data.write().primary_dealers.push(mapping);
    }

    /// Offers returned by `get_dealer_offers(tenant_id, state_code)`
    pub fn set_dealer_offers(&self, tenant_id: &str, state_code: &str, offers: Vec<DealerOffer>) {
        self.data
            .write()
            .offers
            .insert((tenant_id.to_string(), state_code.to_string()), offers);
    }

    pub fn add_tenant(&self, tenant: Tenant) {
        self.data.write().tenants.push(tenant);
    }

    pub fn add_state_price(&self, record: StatePriceRecord) {
        self.data.write().state_prices.push(record);
    }

    /// Override the active SKU count (defaults to the SKUs in the seeded tree)
    pub fn set_sku_count(&self, count: i64) {
        self.data.write().sku_count = Some(count);
    }

    // ── Failure injection and call log ─────────────────────────────

    /// Make every subsequent `call` fail
    pub fn fail(&self, call: BackendCall) {
        self.failures.write().insert(call);
    }

    /// Fail only the `n`th invocation of `call`, counting from 1
    pub fn fail_nth(&self, call: BackendCall, n: usize) {
        self.failures_at.write().insert((call, n));
    }

    /// Stop failing `call`
    pub fn recover(&self, call: BackendCall) {
        self.failures.write().remove(&call);
        self.failures_at.write().retain(|(c, _)| *c != call);
    }

    pub fn call_count(&self, call: BackendCall) -> usize {
        self.calls.lock().iter().filter(|c| **c == call).count()
    }

    fn enter(&self, call: BackendCall) -> RepoResult<()> {
        let nth = {
            let mut calls = self.calls.lock();
            calls.push(call);
            calls.iter().filter(|c| **c == call).count()
        };
        if !self.failures.read().contains(&call) && !self.failures_at.read().contains(&(call, nth)) {
            return Ok(());
        }
        Err(match call {
            BackendCall::DealerOffers => RepoError::Rpc {
                function: "get_dealer_offers".into(),
                message: "function get_dealer_offers(uuid, text) does not exist".into(),
            },
            other => RepoError::Query {
                message: format!("injected failure: {other:?}"),
                details: Some("memory backend".into()),
                hint: None,
                code: Some("XX000".into()),
            },
        })
    }
}

fn state_matches(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

#[async_trait]
impl CatalogBackend for MemoryBackend {
    async fn fetch_market_summary(&self, state_code: &str) -> RepoResult<Vec<MarketSummaryRow>> {
        self.enter(BackendCall::MarketSummary)?;
        let mut rows: Vec<_> = self
            .data
            .read()
            .summary
            .iter()
            .filter(|r| state_matches(&r.state_code, state_code))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.lowest_price.cmp(&b.lowest_price));
        Ok(rows)
    }

    async fn fetch_brands(&self, brand_ids: &[String]) -> RepoResult<Vec<Brand>> {
        self.enter(BackendCall::Brands)?;
        Ok(self
            .data
            .read()
            .brands
            .iter()
            .filter(|b| brand_ids.contains(&b.id))
            .cloned()
            .collect())
    }

    async fn fetch_catalog_tree(
        &self,
        family_ids: Option<&[String]>,
    ) -> RepoResult<Vec<CatalogFamily>> {
        self.enter(BackendCall::CatalogTree)?;
        let data = self.data.read();
        let tree = data
            .families
            .iter()
            .filter(|f| f.is_active_vehicle())
            .filter(|f| family_ids.is_none_or(|ids| ids.contains(&f.id)))
            .cloned()
            .map(|mut family| {
                for sku in family
                    .variants
                    .iter_mut()
                    .flat_map(|v| v.colors.iter_mut())
                    .flat_map(|c| c.skus.iter_mut())
                {
                    sku.prices = data
                        .state_prices
                        .iter()
                        .filter(|p| p.vehicle_color_id == sku.id && p.is_active)
                        .cloned()
                        .collect();
                }
                family
            })
            .collect();
        Ok(tree)
    }

    async fn fetch_registration_rules(
        &self,
        state_code: &str,
    ) -> RepoResult<Vec<RegistrationRule>> {
        self.enter(BackendCall::RegistrationRules)?;
        Ok(self
            .data
            .read()
            .registration_rules
            .iter()
            .filter(|r| state_matches(&r.state_code, state_code) && r.status == RuleStatus::Active)
            .cloned()
            .collect())
    }

    async fn fetch_insurance_rules(
        &self,
        state_code: &str,
        vehicle_type: VehicleType,
    ) -> RepoResult<Vec<InsuranceRule>> {
        self.enter(BackendCall::InsuranceRules)?;
        let mut rows: Vec<_> = self
            .data
            .read()
            .insurance_rules
            .iter()
            .filter(|r| r.vehicle_type == vehicle_type && r.status == RuleStatus::Active)
            .filter(|r| r.is_wildcard() || state_matches(&r.state_code, state_code))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            a.is_wildcard()
                .cmp(&b.is_wildcard())
                .then_with(|| b.priority.cmp(&a.priority))
        });
        Ok(rows)
    }

    async fn fetch_lead(&self, lead_id: &str) -> RepoResult<Option<Lead>> {
        self.enter(BackendCall::Lead)?;
        Ok(self.data.read().leads.get(lead_id).cloned())
    }

    async fn fetch_pincode(&self, pincode: &str) -> RepoResult<Option<PincodeRecord>> {
        self.enter(BackendCall::Pincode)?;
        Ok(self.data.read().pincodes.get(pincode.trim()).cloned())
    }

    async fn fetch_primary_dealer(
        &self,
        state_code: &str,
        district: &str,
    ) -> RepoResult<Option<PrimaryDealerMapping>> {
        self.enter(BackendCall::PrimaryDealer)?;
        Ok(self
            .data
            .read()
            .primary_dealers
            .iter()
            .find(|m| {
                m.is_active
                    && state_matches(&m.state_code, state_code)
                    && same_district(&m.district, district)
            })
            .cloned())
    }

    async fn get_dealer_offers(
        &self,
        tenant_id: &str,
        state_code: &str,
    ) -> RepoResult<Vec<DealerOffer>> {
        self.enter(BackendCall::DealerOffers)?;
        Ok(self
            .data
            .read()
            .offers
            .get(&(tenant_id.to_string(), state_code.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_tenants(&self, tenant_ids: &[String]) -> RepoResult<Vec<Tenant>> {
        self.enter(BackendCall::Tenants)?;
        Ok(self
            .data
            .read()
            .tenants
            .iter()
            .filter(|t| tenant_ids.contains(&t.id))
            .cloned()
            .collect())
    }

    async fn fetch_state_prices(
        &self,
        state_code: &str,
        districts: &[String],
        sku_ids: &[String],
    ) -> RepoResult<Vec<StatePriceRecord>> {
        self.enter(BackendCall::StatePrices)?;
        Ok(self
            .data
            .read()
            .state_prices
            .iter()
            .filter(|p| {
                p.is_active
                    && state_matches(&p.state_code, state_code)
                    && districts.iter().any(|d| same_district(d, &p.district))
                    && sku_ids.contains(&p.vehicle_color_id)
            })
            .cloned()
            .collect())
    }

    async fn count_active_skus(&self) -> RepoResult<i64> {
        self.enter(BackendCall::CountSkus)?;
        let data = self.data.read();
        if let Some(count) = data.sku_count {
            return Ok(count);
        }
        let count = data
            .families
            .iter()
            .filter(|f| f.is_active_vehicle())
            .flat_map(|f| f.variants.iter())
            .flat_map(|v| v.colors.iter())
            .map(|c| c.skus.len())
            .sum::<usize>();
        Ok(count as i64)
    }
}
