//! Visitor location resolution
//!
//! Sources, lowest to highest priority:
//! 1. the client-side cached location record
//! 2. the lead's stored pincode, resolved through the pincode table
//!
//! When neither yields a state code the configured default is used.

use shared::models::{CachedLocation, Lead, Location, PincodeRecord};

use crate::db::{CatalogBackend, RepoResult};

/// State / union territory name → two-letter code
const STATE_CODES: &[(&str, &str)] = &[
    ("andaman and nicobar islands", "AN"),
    ("andhra pradesh", "AP"),
    ("arunachal pradesh", "AR"),
    ("assam", "AS"),
    ("bihar", "BR"),
    ("chandigarh", "CH"),
    ("chhattisgarh", "CG"),
    ("dadra and nagar haveli and daman and diu", "DD"),
    ("delhi", "DL"),
    ("goa", "GA"),
    ("gujarat", "GJ"),
    ("haryana", "HR"),
    ("himachal pradesh", "HP"),
    ("jammu and kashmir", "JK"),
    ("jharkhand", "JH"),
    ("karnataka", "KA"),
    ("kerala", "KL"),
    ("ladakh", "LA"),
    ("lakshadweep", "LD"),
    ("madhya pradesh", "MP"),
    ("maharashtra", "MH"),
    ("manipur", "MN"),
    ("meghalaya", "ML"),
    ("mizoram", "MZ"),
    ("nagaland", "NL"),
    ("national capital territory of delhi", "DL"),
    ("new delhi", "DL"),
    ("odisha", "OD"),
    ("orissa", "OD"),
    ("puducherry", "PY"),
    ("punjab", "PB"),
    ("rajasthan", "RJ"),
    ("sikkim", "SK"),
    ("tamil nadu", "TN"),
    ("telangana", "TS"),
    ("tripura", "TR"),
    ("uttar pradesh", "UP"),
    ("uttarakhand", "UK"),
    ("west bengal", "WB"),
];

/// Map a free-text state name to its code
///
/// Unknown names fall back to their first two letters, uppercased.
pub fn state_name_to_code(name: &str) -> Option<String> {
    let normalized = name
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    if normalized.is_empty() {
        return None;
    }
    if let Some((_, code)) = STATE_CODES.iter().find(|(n, _)| *n == normalized) {
        return Some((*code).to_string());
    }
    let prefix: String = normalized.chars().take(2).collect();
    Some(prefix.to_uppercase())
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn explicit_or_named_code(code: Option<&str>, name: Option<&str>) -> Option<String> {
    non_blank(code)
        .map(|c| c.to_uppercase())
        .or_else(|| name.and_then(state_name_to_code))
}

/// Parse the raw cached record; malformed JSON is logged and ignored
pub fn parse_cached_location(raw: &str) -> Option<CachedLocation> {
    if raw.trim().is_empty() {
        return None;
    }
    match serde_json::from_str::<CachedLocation>(raw) {
        Ok(cached) => Some(cached),
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring malformed cached location");
            None
        }
    }
}

/// Lead and its pincode record, loaded once per run
#[derive(Debug, Clone, Default)]
pub struct LeadContext {
    pub lead: Option<Lead>,
    pub pincode: Option<PincodeRecord>,
}

impl LeadContext {
    /// Location implied by the lead's pincode, if it resolves to anything
    pub fn location(&self) -> Option<PartialLocation> {
        let record = self.pincode.as_ref()?;
        let partial = PartialLocation {
            state_code: explicit_or_named_code(
                record.state_code.as_deref(),
                record.state.as_deref(),
            ),
            district: non_blank(record.district.as_deref()),
            latitude: record.latitude,
            longitude: record.longitude,
            pincode: non_blank(Some(&record.pincode)),
        };
        (partial.state_code.is_some() || partial.district.is_some()).then_some(partial)
    }
}

/// Fetch the lead and resolve its pincode
///
/// Missing rows are not errors; a lead without a pincode yields no record.
pub async fn load_lead_context(
    backend: &dyn CatalogBackend,
    lead_id: Option<&str>,
) -> RepoResult<LeadContext> {
    let Some(lead_id) = lead_id.map(str::trim).filter(|id| !id.is_empty()) else {
        return Ok(LeadContext::default());
    };

    let Some(lead) = backend.fetch_lead(lead_id).await? else {
        tracing::warn!(lead_id, "Lead not found");
        return Ok(LeadContext::default());
    };

    let pincode = match non_blank(lead.customer_pincode.as_deref()) {
        Some(pin) => backend.fetch_pincode(&pin).await?,
        None => None,
    };

    Ok(LeadContext {
        lead: Some(lead),
        pincode,
    })
}

/// Location fields from a single source, any of which may be missing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialLocation {
    pub state_code: Option<String>,
    pub district: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub pincode: Option<String>,
}

impl From<&CachedLocation> for PartialLocation {
    fn from(cached: &CachedLocation) -> Self {
        Self {
            state_code: explicit_or_named_code(
                cached.state_code.as_deref(),
                cached.state.as_deref(),
            ),
            district: non_blank(cached.district.as_deref()),
            latitude: cached.lat,
            longitude: cached.lng,
            pincode: non_blank(cached.pincode.as_deref()),
        }
    }
}

impl PartialLocation {
    /// Overlay `other`; its known fields win.
    ///
    /// Our district is dropped when `other` names a different state but no
    /// district.
    fn overlay(self, other: PartialLocation) -> Self {
        let state_changed = matches!(
            (&self.state_code, &other.state_code),
            (Some(ours), Some(theirs)) if !ours.eq_ignore_ascii_case(theirs)
        );
        let district = match other.district {
            Some(district) => Some(district),
            None if state_changed => None,
            None => self.district,
        };
        Self {
            state_code: other.state_code.or(self.state_code),
            district,
            latitude: other.latitude.or(self.latitude),
            longitude: other.longitude.or(self.longitude),
            pincode: other.pincode.or(self.pincode),
        }
    }

    fn finish(self, default_state_code: &str) -> Location {
        Location {
            state_code: self
                .state_code
                .unwrap_or_else(|| default_state_code.to_string()),
            district: self.district,
            latitude: self.latitude,
            longitude: self.longitude,
            pincode: self.pincode,
        }
    }
}

/// Resolve the visitor location from the cache and the lead
pub fn resolve_location(
    cached_raw: Option<&str>,
    lead: &LeadContext,
    default_state_code: &str,
) -> Location {
    let from_cache = cached_raw
        .and_then(parse_cached_location)
        .map(|c| PartialLocation::from(&c))
        .unwrap_or_default();

    let resolved = match lead.location() {
        Some(from_lead) => {
            if from_cache.district.is_some() && from_cache.district != from_lead.district {
                tracing::debug!(
                    cached = from_cache.district.as_deref().unwrap_or(""),
                    lead = from_lead.district.as_deref().unwrap_or(""),
                    "Lead location overrides cached location"
                );
            }
            from_cache.overlay(from_lead)
        }
        None => from_cache,
    };

    resolved.finish(default_state_code)
}

/// Location override to apply after a lead-based dealer resolution
pub fn lead_location_override(lead: &LeadContext, current: &Location) -> Option<Location> {
    let from_lead = lead.location()?;
    let current = PartialLocation {
        state_code: Some(current.state_code.clone()),
        district: current.district.clone(),
        latitude: current.latitude,
        longitude: current.longitude,
        pincode: current.pincode.clone(),
    };
    let fallback_state = current.state_code.clone().unwrap_or_default();
    Some(current.overlay(from_lead).finish(&fallback_state))
}
