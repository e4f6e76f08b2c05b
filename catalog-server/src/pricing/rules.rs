//! Registration-tax and insurance rule fetching

use shared::models::{InsuranceRule, RegistrationRule, RuleStatus, VehicleType};

use crate::db::{CatalogBackend, RepoResult};

/// Rules the mapper needs to estimate RTO and insurance
#[derive(Debug, Clone, Default)]
pub struct PricingRules {
    pub registration: Vec<RegistrationRule>,
    pub insurance: Option<InsuranceRule>,
}

/// Pick the insurance rule for a state
///
/// Only active rules for the state or `ALL` qualify. A state-specific rule
/// beats `ALL`; within the same scope the highest priority wins.
pub fn select_insurance_rule(
    candidates: Vec<InsuranceRule>,
    state_code: &str,
) -> Option<InsuranceRule> {
    candidates
        .into_iter()
        .filter(|r| r.status == RuleStatus::Active)
        .filter(|r| r.is_wildcard() || r.state_code.eq_ignore_ascii_case(state_code))
        .min_by(|a, b| {
            a.is_wildcard()
                .cmp(&b.is_wildcard())
                .then_with(|| b.priority.cmp(&a.priority))
        })
}

/// Fetch active registration rules and the two-wheeler insurance rule
pub async fn fetch_rules(backend: &dyn CatalogBackend, state_code: &str) -> RepoResult<PricingRules> {
    let registration: Vec<RegistrationRule> = backend
        .fetch_registration_rules(state_code)
        .await?
        .into_iter()
        .filter(|r| r.status == RuleStatus::Active)
        .collect();

    let candidates = backend
        .fetch_insurance_rules(state_code, VehicleType::TwoWheeler)
        .await?;
    let insurance = select_insurance_rule(candidates, state_code);

    tracing::debug!(
        state_code,
        registration_rules = registration.len(),
        insurance_rule = insurance.as_ref().map(|r| r.id.as_str()).unwrap_or("none"),
        "Pricing rules loaded"
    );

    Ok(PricingRules {
        registration,
        insurance,
    })
}
