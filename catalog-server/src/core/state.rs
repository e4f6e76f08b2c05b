//! Shared server state

use std::sync::Arc;

use crate::core::Config;
use crate::db::{CatalogBackend, PgBackend};
use crate::pricing::{CatalogPipeline, PipelineConfig, SessionRegistry};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Clone)]
pub struct ServerState {
    pub sessions: SessionRegistry,
}

impl ServerState {
    /// Build state over any backend
    pub fn new(backend: Arc<dyn CatalogBackend>, pipeline: PipelineConfig, debug_enabled: bool) -> Self {
        let pipeline = Arc::new(CatalogPipeline::new(backend, pipeline));
        Self {
            sessions: SessionRegistry::new(pipeline, debug_enabled),
        }
    }

    /// Connect to Postgres and build state
    pub async fn initialize(config: &Config) -> Result<Self, BoxError> {
        let backend =
            PgBackend::connect(&config.database_url, config.database_max_connections).await?;
        tracing::info!(
            max_connections = config.database_max_connections,
            fast_path = config.fast_path_enabled,
            pricing_debug = config.pricing_debug,
            "Database pool ready"
        );
        Ok(Self::new(
            Arc::new(backend),
            config.pipeline(),
            config.pricing_debug,
        ))
    }
}
