//! Visitor location models

use serde::{Deserialize, Serialize};

use crate::util::{opt_f64_lenient, opt_string_or_number};

/// State used when neither the cached record nor the lead yields one
pub const DEFAULT_STATE_CODE: &str = "MH";

/// Client-side cached location record, written by the geocoding flow
///
/// Every field is optional; older clients only stored the free-text state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedLocation {
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub state_code: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default, deserialize_with = "opt_f64_lenient")]
    pub lat: Option<f64>,
    #[serde(default, deserialize_with = "opt_f64_lenient")]
    pub lng: Option<f64>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub pincode: Option<String>,
}

/// Resolved visitor location used by every later pipeline stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub state_code: String,
    pub district: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub pincode: Option<String>,
}

impl Location {
    /// Location carrying only a state code
    pub fn state_only(state_code: impl Into<String>) -> Self {
        Self {
            state_code: state_code.into(),
            district: None,
            latitude: None,
            longitude: None,
            pincode: None,
        }
    }

    /// District if known and non-blank
    pub fn district(&self) -> Option<&str> {
        self.district
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }
}

/// Row of the pincode → district/state lookup table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct PincodeRecord {
    pub pincode: String,
    pub district: Option<String>,
    pub state: Option<String>,
    pub state_code: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}
