//! Backend access layer
//!
//! Every outbound read the pricing pipeline performs goes through
//! [`CatalogBackend`]. `PgBackend` talks to the hosted Postgres backend;
//! `MemoryBackend` is an in-process implementation for tests and local runs.

pub mod memory;
pub mod postgres;
pub mod tree;

pub use memory::{BackendCall, MemoryBackend};
pub use postgres::PgBackend;
pub use tree::{CatalogRows, assemble_catalog_tree};

use async_trait::async_trait;
use shared::models::{
    Brand, CatalogFamily, DealerOffer, InsuranceRule, Lead, MarketSummaryRow, PincodeRecord,
    PrimaryDealerMapping, RegistrationRule, StatePriceRecord, Tenant, VehicleType,
};
use thiserror::Error;

/// SQLSTATE raised when a statement is cancelled
const SQLSTATE_QUERY_CANCELED: &str = "57014";

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("{message}")]
    Query {
        message: String,
        details: Option<String>,
        hint: Option<String>,
        code: Option<String>,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("RPC {function} failed: {message}")]
    Rpc { function: String, message: String },
}

impl RepoError {
    /// Plain query error without backend detail
    pub fn query(message: impl Into<String>) -> Self {
        RepoError::Query {
            message: message.into(),
            details: None,
            hint: None,
            code: None,
        }
    }

    /// True when the backend cancelled the statement.
    ///
    /// Only SQLSTATE 57014 counts; server messages that merely mention an
    /// abort (25P02 "current transaction is aborted") are real failures.
    pub fn is_abort(&self) -> bool {
        matches!(
            self,
            RepoError::Query { code: Some(code), .. } if code == SQLSTATE_QUERY_CANCELED
        )
    }

    /// Log with full structured detail
    pub fn log(&self, context: &str) {
        match self {
            RepoError::Query {
                message,
                details,
                hint,
                code,
            } => tracing::error!(
                context,
                message = %message,
                details = details.as_deref().unwrap_or(""),
                hint = hint.as_deref().unwrap_or(""),
                code = code.as_deref().unwrap_or(""),
                "Backend query failed"
            ),
            RepoError::Rpc { function, message } => {
                tracing::error!(context, function = %function, message = %message, "Backend RPC failed")
            }
            other => tracing::error!(context, error = %other, "Backend read failed"),
        }
    }
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db) => {
                let pg = db.try_downcast_ref::<sqlx::postgres::PgDatabaseError>();
                RepoError::Query {
                    message: db.message().to_string(),
                    details: pg.and_then(|e| e.detail()).map(str::to_string),
                    hint: pg.and_then(|e| e.hint()).map(str::to_string),
                    code: db.code().map(|c| c.into_owned()),
                }
            }
            sqlx::Error::RowNotFound => RepoError::NotFound("row".into()),
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                RepoError::Decode(err.to_string())
            }
            other => RepoError::query(other.to_string()),
        }
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

/// Outbound reads of the pricing pipeline
#[async_trait]
pub trait CatalogBackend: Send + Sync {
    /// Summary rows for a state, ascending by lowest price
    async fn fetch_market_summary(&self, state_code: &str) -> RepoResult<Vec<MarketSummaryRow>>;

    async fn fetch_brands(&self, brand_ids: &[String]) -> RepoResult<Vec<Brand>>;

    /// Active vehicle families with their full hierarchy, optionally restricted
    /// to `family_ids`
    async fn fetch_catalog_tree(
        &self,
        family_ids: Option<&[String]>,
    ) -> RepoResult<Vec<CatalogFamily>>;

    /// Active registration rules for a state
    async fn fetch_registration_rules(&self, state_code: &str)
    -> RepoResult<Vec<RegistrationRule>>;

    /// Active insurance rule candidates for a state or `ALL`, state rows first
    async fn fetch_insurance_rules(
        &self,
        state_code: &str,
        vehicle_type: VehicleType,
    ) -> RepoResult<Vec<InsuranceRule>>;

    async fn fetch_lead(&self, lead_id: &str) -> RepoResult<Option<Lead>>;

    async fn fetch_pincode(&self, pincode: &str) -> RepoResult<Option<PincodeRecord>>;

    /// Active primary-dealer mapping, district matched case-insensitively
    async fn fetch_primary_dealer(
        &self,
        state_code: &str,
        district: &str,
    ) -> RepoResult<Option<PrimaryDealerMapping>>;

    /// `get_dealer_offers(tenant_id, state_code)` remote procedure
    async fn get_dealer_offers(
        &self,
        tenant_id: &str,
        state_code: &str,
    ) -> RepoResult<Vec<DealerOffer>>;

    async fn fetch_tenants(&self, tenant_ids: &[String]) -> RepoResult<Vec<Tenant>>;

    /// Active price rows for the given SKUs, restricted to a state and a set
    /// of districts (matched case-insensitively)
    async fn fetch_state_prices(
        &self,
        state_code: &str,
        districts: &[String],
        sku_ids: &[String],
    ) -> RepoResult<Vec<StatePriceRecord>>;

    /// Total number of SKUs under active vehicle families
    async fn count_active_skus(&self) -> RepoResult<i64>;
}
