//! Per-client catalog controllers
//!
//! Each client session id maps to its own `CatalogController`, so the offer
//! circuit breaker and the debug sink are scoped to that client.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use shared::util::now_millis;
use tokio_util::sync::CancellationToken;

use super::controller::CatalogController;
use super::pipeline::CatalogPipeline;

#[derive(Clone)]
pub struct SessionRegistry {
    pipeline: Arc<CatalogPipeline>,
    controllers: Arc<DashMap<String, Arc<CatalogController>>>,
    debug_enabled: bool,
}

impl SessionRegistry {
    pub fn new(pipeline: Arc<CatalogPipeline>, debug_enabled: bool) -> Self {
        Self {
            pipeline,
            controllers: Arc::new(DashMap::new()),
            debug_enabled,
        }
    }

    pub fn debug_enabled(&self) -> bool {
        self.debug_enabled
    }

    /// Controller for a session, created on first use
    pub fn get_or_create(&self, session_id: &str) -> Arc<CatalogController> {
        self.controllers
            .entry(session_id.to_string())
            .or_insert_with(|| {
                tracing::debug!(session_id, "Catalog session created");
                Arc::new(CatalogController::new(
                    self.pipeline.clone(),
                    self.debug_enabled,
                ))
            })
            .clone()
    }

    pub fn get(&self, session_id: &str) -> Option<Arc<CatalogController>> {
        self.controllers.get(session_id).map(|c| c.value().clone())
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    /// Drop controllers idle for longer than `max_idle`; returns how many
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let now = now_millis();
        let max_idle_ms = max_idle.as_millis() as i64;
        let before = self.controllers.len();
        self.controllers
            .retain(|_, controller| controller.idle_ms(now) <= max_idle_ms);
        before.saturating_sub(self.controllers.len())
    }

    /// Periodic eviction loop; exits when `shutdown` is cancelled
    pub async fn run_eviction(self, max_idle: Duration, shutdown: CancellationToken) {
        let period = (max_idle / 4).max(Duration::from_secs(1));
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let evicted = self.evict_idle(max_idle);
                    if evicted > 0 {
                        tracing::info!(evicted, remaining = self.len(), "Evicted idle catalog sessions");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryBackend;
    use crate::pricing::pipeline::PipelineConfig;

    fn registry() -> SessionRegistry {
        let pipeline = CatalogPipeline::new(Arc::new(MemoryBackend::new()), PipelineConfig::default());
        SessionRegistry::new(Arc::new(pipeline), false)
    }

    #[test]
    fn test_same_session_same_controller() {
        let registry = registry();
        let a = registry.get_or_create("s-1");
        let b = registry.get_or_create("s-1");
        let c = registry.get_or_create("s-2");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(registry.len(), 2);
        assert!(registry.get("s-3").is_none());
    }

    #[test]
    fn test_evict_idle() {
        let registry = registry();
        registry.get_or_create("s-1");
        assert_eq!(registry.evict_idle(Duration::from_secs(60)), 0);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(registry.evict_idle(Duration::ZERO), 1);
        assert!(registry.is_empty());
    }
}
