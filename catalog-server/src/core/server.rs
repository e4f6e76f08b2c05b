//! HTTP server

use std::net::SocketAddr;

use crate::api::create_router;
use crate::core::tasks::BackgroundTasks;
use crate::core::{Config, ServerState};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub struct Server {
    config: Config,
    state: ServerState,
}

impl Server {
    pub fn new(config: Config, state: ServerState) -> Self {
        Self { config, state }
    }

    fn start_background_tasks(&self) -> BackgroundTasks {
        let mut tasks = BackgroundTasks::new();
        let sessions = self.state.sessions.clone();
        let max_idle = self.config.session_idle();
        let shutdown = tasks.shutdown_token();
        tasks.spawn("session_eviction", sessions.run_eviction(max_idle, shutdown));
        tasks
    }

    pub async fn run(self) -> Result<(), BoxError> {
        let tasks = self.start_background_tasks();

        let app = create_router(self.state.clone(), self.config.request_timeout());
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!(%addr, environment = %self.config.environment, "Catalog server listening");

        let shutdown = async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down...");
        };

        let served = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await;

        tasks.shutdown().await;
        served?;
        Ok(())
    }
}
