//! Server configuration, state and lifecycle
//!
//! - [`Config`] - environment configuration
//! - [`ServerState`] - shared state handed to handlers
//! - [`Server`] - HTTP server

pub mod config;
pub mod server;
pub mod state;
pub mod tasks;

pub use config::Config;
pub use server::Server;
pub use state::ServerState;
