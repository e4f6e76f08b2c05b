//! Catalog session handlers

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use serde_json::Value;
use shared::error::ErrorCode;
use shared::models::CatalogState;

use crate::core::ServerState;
use crate::pricing::{LoadRequest, PricingDebugRecord};
use crate::utils::{AppError, AppResult};

/// Session ids are opaque client tokens
const MAX_SESSION_ID_LEN: usize = 128;

/// Body of a load request
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadBody {
    #[serde(default)]
    pub lead_id: Option<String>,
    /// Raw JSON string of the cached record; an inline object is accepted too
    #[serde(default)]
    pub cached_location: Option<Value>,
}

impl LoadBody {
    fn into_request(self) -> LoadRequest {
        let cached_location = match self.cached_location {
            Some(Value::String(raw)) => Some(raw),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        };
        LoadRequest {
            lead_id: self
                .lead_id
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty()),
            cached_location,
        }
    }
}

fn validate_session_id(session_id: &str) -> AppResult<()> {
    if session_id.trim().is_empty() {
        return Err(AppError::validation("session_id must not be empty"));
    }
    if session_id.len() > MAX_SESSION_ID_LEN {
        return Err(AppError::validation(format!(
            "session_id is too long ({} chars, max {MAX_SESSION_ID_LEN})",
            session_id.len()
        )));
    }
    Ok(())
}

/// POST /api/catalog/sessions/{session_id}/load
pub async fn load(
    State(state): State<ServerState>,
    Path(session_id): Path<String>,
    body: Option<Json<LoadBody>>,
) -> AppResult<Json<CatalogState>> {
    validate_session_id(&session_id)?;
    let request = body.map(|Json(b)| b).unwrap_or_default().into_request();
    let controller = state.sessions.get_or_create(&session_id);
    Ok(Json(controller.load(request).await))
}

/// GET /api/catalog/sessions/{session_id}
pub async fn get_state(
    State(state): State<ServerState>,
    Path(session_id): Path<String>,
) -> AppResult<Json<CatalogState>> {
    let controller = state
        .sessions
        .get(&session_id)
        .ok_or_else(|| AppError::session_not_found(&session_id))?;
    Ok(Json(controller.snapshot()))
}

/// GET /api/catalog/sessions/{session_id}/debug
pub async fn debug(
    State(state): State<ServerState>,
    Path(session_id): Path<String>,
) -> AppResult<Json<PricingDebugRecord>> {
    if !state.sessions.debug_enabled() {
        return Err(AppError::new(ErrorCode::DebugSinkDisabled));
    }
    let controller = state
        .sessions
        .get(&session_id)
        .ok_or_else(|| AppError::session_not_found(&session_id))?;
    controller
        .debug_record()
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("No pricing record for session {session_id}")))
}
