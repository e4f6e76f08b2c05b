use std::time::Duration;

use shared::models::DEFAULT_STATE_CODE;

use crate::pricing::PipelineConfig;
use crate::pricing::pipeline::DEFAULT_ENRICHMENT_BATCH_SIZE;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Server configuration
///
/// # Environment variables
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | DATABASE_URL | (required) | Postgres URL |
/// | DATABASE_MAX_CONNECTIONS | 10 | pool size |
/// | HTTP_PORT | 3000 | HTTP port |
/// | ENVIRONMENT | development | development / staging / production |
/// | DEFAULT_STATE_CODE | MH | fallback state |
/// | CATALOG_FAST_PATH | false | enable the market-summary source |
/// | PRICING_DEBUG | false | enable the per-session debug sink |
/// | ENRICHMENT_BATCH_SIZE | 100 | SKU ids per enrichment query |
/// | SESSION_IDLE_SECS | 1800 | idle session eviction |
/// | REQUEST_TIMEOUT_MS | 30000 | HTTP request timeout |
/// | LOG_LEVEL | info | log level when RUST_LOG is unset |
/// | LOG_DIR | (unset) | daily rolling log directory |
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub http_port: u16,
    /// development | staging | production
    pub environment: String,
    pub default_state_code: String,
    pub fast_path_enabled: bool,
    pub pricing_debug: bool,
    pub enrichment_batch_size: usize,
    pub session_idle_secs: u64,
    pub request_timeout_ms: u64,
    pub log_level: String,
    pub log_dir: Option<String>,
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?,
            database_max_connections: env_or("DATABASE_MAX_CONNECTIONS", 10),
            http_port: env_or("HTTP_PORT", 3000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            default_state_code: std::env::var("DEFAULT_STATE_CODE")
                .ok()
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_STATE_CODE.into()),
            fast_path_enabled: env_or("CATALOG_FAST_PATH", false),
            pricing_debug: env_or("PRICING_DEBUG", false),
            enrichment_batch_size: env_or("ENRICHMENT_BATCH_SIZE", DEFAULT_ENRICHMENT_BATCH_SIZE)
                .max(1),
            session_idle_secs: env_or("SESSION_IDLE_SECS", 1800),
            request_timeout_ms: env_or("REQUEST_TIMEOUT_MS", 30000),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: std::env::var("LOG_DIR").ok().filter(|s| !s.is_empty()),
        })
    }

    /// The slice of configuration the pricing pipeline sees
    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            default_state_code: self.default_state_code.clone(),
            fast_path_enabled: self.fast_path_enabled,
            enrichment_batch_size: self.enrichment_batch_size,
        }
    }

    pub fn session_idle(&self) -> Duration {
        Duration::from_secs(self.session_idle_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
