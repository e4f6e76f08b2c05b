//! Dealer (tenant), lead and offer models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Dealer tenant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Tenant {
    pub id: String,
    pub name: String,
    pub location: Option<String>,
    pub district: Option<String>,
    pub state_code: Option<String>,
    pub studio_id: Option<String>,
}

/// Buyer lead; may pin the dealer explicitly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Lead {
    pub id: String,
    pub customer_pincode: Option<String>,
    /// Tenant that owns the lead
    pub tenant_id: Option<String>,
    /// Dealer chosen by a buyer agent; overrides `tenant_id`
    pub selected_dealer_tenant_id: Option<String>,
}

/// District → primary dealer mapping row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct PrimaryDealerMapping {
    pub state_code: String,
    pub district: String,
    pub tenant_id: String,
    pub is_active: bool,
}

/// Dealer-specific signed price adjustment for one SKU in one state
///
/// `best_offer` is added to the on-road price: negative lowers it (discount),
/// positive raises it (surge).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct DealerOffer {
    pub dealer_id: String,
    pub vehicle_color_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub best_offer: Decimal,
}

/// Id + display name attached to dealer-priced items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealerRef {
    pub id: String,
    pub name: Option<String>,
}
