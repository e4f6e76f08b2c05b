//! Catalog controller
//!
//! Owns one client's `CatalogState` and `PricingSession`. Every load gets a
//! fresh run id and cancellation token; starting a load cancels the previous
//! one, and a run commits only while its id is still the latest.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use shared::models::CatalogState;
use shared::util::now_millis;
use tokio_util::sync::CancellationToken;

use super::pipeline::{CatalogPipeline, LoadRequest};
use super::session::{PricingDebugRecord, PricingSession};

pub struct CatalogController {
    pipeline: Arc<CatalogPipeline>,
    session: PricingSession,
    state: RwLock<CatalogState>,
    latest_run: AtomicU64,
    current: Mutex<Option<CancellationToken>>,
    last_active_ms: AtomicI64,
}

impl CatalogController {
    pub fn new(pipeline: Arc<CatalogPipeline>, debug_enabled: bool) -> Self {
        Self {
            pipeline,
            session: PricingSession::new(debug_enabled),
            state: RwLock::new(CatalogState::default()),
            latest_run: AtomicU64::new(0),
            current: Mutex::new(None),
            last_active_ms: AtomicI64::new(now_millis()),
        }
    }

    pub fn session(&self) -> &PricingSession {
        &self.session
    }

    pub fn snapshot(&self) -> CatalogState {
        self.touch();
        self.state.read().clone()
    }

    pub fn debug_record(&self) -> Option<PricingDebugRecord> {
        self.touch();
        self.session.latest_debug()
    }

    /// Id of the most recently started run
    pub fn latest_run(&self) -> u64 {
        self.latest_run.load(Ordering::Acquire)
    }

    pub fn touch(&self) {
        self.last_active_ms.store(now_millis(), Ordering::Relaxed);
    }

    /// Milliseconds since the controller was last used
    pub fn idle_ms(&self, now_ms: i64) -> i64 {
        now_ms - self.last_active_ms.load(Ordering::Relaxed)
    }

    fn is_current(&self, run_id: u64) -> bool {
        self.latest_run.load(Ordering::Acquire) == run_id
    }

    /// Start a run, superseding any run in flight
    fn begin(&self) -> (u64, CancellationToken) {
        let token = CancellationToken::new();
        let mut current = self.current.lock();
        let run_id = self.latest_run.fetch_add(1, Ordering::AcqRel) + 1;
        if let Some(previous) = current.replace(token.clone()) {
            previous.cancel();
        }
        drop(current);

        let mut state = self.state.write();
        let loading = std::mem::take(&mut *state).loading();
        *state = CatalogState {
            error: None,
            ..loading
        };
        (run_id, token)
    }

    /// Run the pipeline and commit its result if still current
    ///
    /// Returns the state as seen after the run, which for a superseded run is
    /// whatever the newer run has committed so far.
    pub async fn load(&self, request: LoadRequest) -> CatalogState {
        self.touch();
        let (run_id, token) = self.begin();

        let result = self
            .pipeline
            .run(&self.session, &request, run_id, &token)
            .await;

        let mut current = self.current.lock();
        if !self.is_current(run_id) {
            tracing::debug!(run_id, "Discarding superseded catalog run");
            drop(current);
            return self.state.read().clone();
        }
        *current = None;

        let mut state = self.state.write();
        match result {
            Ok(output) => {
                *state = CatalogState {
                    items: output.items,
                    is_loading: false,
                    error: None,
                    sku_count: output.sku_count,
                };
            }
            Err(e) if e.is_abort() => {
                tracing::debug!(run_id, code = %e.code(), error = %e, "Catalog run aborted");
                state.is_loading = false;
            }
            Err(e) => {
                tracing::error!(run_id, code = %e.code(), error = %e, "Catalog load failed");
                *state = CatalogState::failed(e.to_string());
            }
        }
        drop(current);
        state.clone()
    }

    /// Cancel the run in flight, if any
    pub fn cancel(&self) {
        if let Some(token) = self.current.lock().take() {
            token.cancel();
        }
    }
}

impl Drop for CatalogController {
    fn drop(&mut self) {
        self.cancel();
    }
}
