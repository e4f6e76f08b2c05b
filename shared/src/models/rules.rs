//! Registration-tax (RTO) and insurance rule models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// State value of a rule that applies everywhere
pub const RULE_STATE_ALL: &str = "ALL";

/// Rule lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum RuleStatus {
    Active,
    Inactive,
    Draft,
}

/// Vehicle class an insurance rule covers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum VehicleType {
    TwoWheeler,
    ThreeWheeler,
    FourWheeler,
}

impl VehicleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TwoWheeler => "TWO_WHEELER",
            Self::ThreeWheeler => "THREE_WHEELER",
            Self::FourWheeler => "FOUR_WHEELER",
        }
    }
}

/// How a rule component contributes to a total
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComponentKind {
    /// `value` percent of the ex-showroom price
    Percentage,
    /// `value` as a flat amount
    Fixed,
}

/// One line of a registration rule (road tax, smart card fee, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleComponent {
    pub label: String,
    pub kind: ComponentKind,
    #[serde(with = "rust_decimal::serde::float")]
    pub value: Decimal,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub min_amount: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub max_amount: Option<Decimal>,
}

/// State-scoped registration-tax rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct RegistrationRule {
    pub id: String,
    pub state_code: String,
    pub rule_name: String,
    pub status: RuleStatus,
    #[cfg_attr(feature = "db", sqlx(json))]
    pub components: Vec<RuleComponent>,
}

/// Optional insurance cover; only defaults are part of the estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsuranceAddon {
    pub label: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(default)]
    pub is_default: bool,
}

/// Insurance premium rule, either state-specific or `ALL`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct InsuranceRule {
    pub id: String,
    pub state_code: String,
    pub vehicle_type: VehicleType,
    pub status: RuleStatus,
    pub priority: i32,
    /// Own-damage premium as percent of ex-showroom
    #[serde(with = "rust_decimal::serde::float")]
    pub od_rate_percent: Decimal,
    /// Third-party premium (flat)
    #[serde(with = "rust_decimal::serde::float")]
    pub tp_premium: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub gst_percent: Decimal,
    #[cfg_attr(feature = "db", sqlx(json))]
    pub addons: Vec<InsuranceAddon>,
}

impl InsuranceRule {
    pub fn is_wildcard(&self) -> bool {
        self.state_code.eq_ignore_ascii_case(RULE_STATE_ALL)
    }
}
