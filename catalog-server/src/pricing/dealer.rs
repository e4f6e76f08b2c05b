//! Primary dealer resolution
//!
//! Precedence:
//! 1. the lead's `selected_dealer_tenant_id` (buyer-agent override)
//! 2. the lead's `tenant_id`
//! 3. the active primary-dealer mapping for `(state, district)`
//!
//! A candidate that is not a v1-5 UUID counts as absent.

use serde::Serialize;
use shared::models::{DealerRef, Location};

use super::location::{LeadContext, lead_location_override};
use crate::db::{CatalogBackend, RepoResult};
use crate::utils::validation::valid_uuid;

/// How the dealer was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DealerSource {
    LeadSelected,
    LeadTenant,
    DistrictPrimary,
    None,
}

impl DealerSource {
    pub fn is_lead(&self) -> bool {
        matches!(self, Self::LeadSelected | Self::LeadTenant)
    }
}

/// Outcome of dealer resolution
#[derive(Debug, Clone, PartialEq)]
pub struct DealerResolution {
    pub dealer_id: Option<String>,
    pub source: DealerSource,
    /// Lead location to apply when the dealer came from the lead
    pub location_override: Option<Location>,
}

impl DealerResolution {
    pub fn none() -> Self {
        Self {
            dealer_id: None,
            source: DealerSource::None,
            location_override: None,
        }
    }
}

/// Resolve the pricing-authoritative dealer
pub async fn resolve_dealer(
    backend: &dyn CatalogBackend,
    lead: &LeadContext,
    location: &Location,
) -> RepoResult<DealerResolution> {
    if let Some(record) = &lead.lead {
        let from_lead = valid_uuid(record.selected_dealer_tenant_id.as_deref())
            .map(|id| (id, DealerSource::LeadSelected))
            .or_else(|| {
                valid_uuid(record.tenant_id.as_deref()).map(|id| (id, DealerSource::LeadTenant))
            });

        if let Some((dealer_id, source)) = from_lead {
            tracing::debug!(dealer_id = %dealer_id, source = ?source, "Dealer resolved from lead");
            return Ok(DealerResolution {
                dealer_id: Some(dealer_id),
                source,
                location_override: lead_location_override(lead, location),
            });
        }
    }

    let Some(district) = location.district() else {
        return Ok(DealerResolution::none());
    };

    let mapping = backend
        .fetch_primary_dealer(&location.state_code, district)
        .await?;
    match mapping.and_then(|m| valid_uuid(Some(&m.tenant_id))) {
        Some(dealer_id) => {
            tracing::debug!(
                dealer_id = %dealer_id,
                state_code = %location.state_code,
                district,
                "Dealer resolved from district mapping"
            );
            Ok(DealerResolution {
                dealer_id: Some(dealer_id),
                source: DealerSource::DistrictPrimary,
                location_override: None,
            })
        }
        None => Ok(DealerResolution::none()),
    }
}

/// Dealer id plus display name from the tenant list
///
/// A failed or empty tenant read still yields the id.
pub async fn dealer_ref(backend: &dyn CatalogBackend, dealer_id: &str) -> DealerRef {
    let name = match backend.fetch_tenants(&[dealer_id.to_string()]).await {
        Ok(tenants) => tenants
            .into_iter()
            .find(|t| t.id == dealer_id)
            .map(|t| t.name),
        Err(e) => {
            tracing::warn!(dealer_id, error = %e, "Failed to read dealer name");
            None
        }
    };
    DealerRef {
        id: dealer_id.to_string(),
        name,
    }
}
