//! Shared types for the catalog pricing workspace
//!
//! Domain models read from the hosted backend, the catalog output returned to
//! presentation clients, and the unified error/response envelope.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
