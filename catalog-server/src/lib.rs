//! Catalog pricing server
//!
//! Serves a location-aware vehicle catalog priced for one client session.
//!
//! # Module layout
//!
//! ```text
//! catalog-server/src/
//! ├── core/      # config, state, server lifecycle
//! ├── api/       # HTTP routes and handlers
//! ├── db/        # backend trait, Postgres and in-memory backends
//! ├── pricing/   # location, dealer, offers, mapper, enrichment, pipeline
//! └── utils/     # logging, validation
//! ```

pub mod api;
pub mod core;
pub mod db;
pub mod pricing;
pub mod utils;

pub use core::{Config, Server, ServerState};
pub use pricing::{CatalogController, CatalogPipeline, SessionRegistry};
pub use utils::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};

pub use utils::logger::{init_logger, init_logger_with_file};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Load `.env`, read configuration and install the logger
pub fn setup_environment() -> Result<Config, BoxError> {
    dotenv::dotenv().ok();
    let config = Config::from_env()?;
    init_logger_with_file(Some(&config.log_level), config.log_dir.as_deref());
    Ok(config)
}
