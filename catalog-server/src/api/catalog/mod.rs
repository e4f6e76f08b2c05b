//! Catalog session routes
//!
//! | Path | Method | Description |
//! |------|--------|-------------|
//! | /api/catalog/sessions/{session_id}/load | POST | run the pricing pipeline |
//! | /api/catalog/sessions/{session_id} | GET | current catalog state |
//! | /api/catalog/sessions/{session_id}/debug | GET | latest pricing debug record |

mod handler;

pub use handler::LoadBody;

use axum::Router;
use axum::routing::{get, post};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/catalog/sessions", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/{session_id}", get(handler::get_state))
        .route("/{session_id}/load", post(handler::load))
        .route("/{session_id}/debug", get(handler::debug))
}
