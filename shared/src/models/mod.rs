//! Data models
//!
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! Ids are textual UUIDs as stored by the hosted backend.

pub mod catalog;
pub mod dealer;
pub mod location;
pub mod price;
pub mod pricing;
pub mod rules;
pub mod summary;

// Re-exports
pub use catalog::*;
pub use dealer::*;
pub use location::*;
pub use price::*;
pub use pricing::*;
pub use rules::*;
pub use summary::*;
