//! Catalog pricing pipeline
//!
//! Stages live in their own modules; [`pipeline`] wires them together and
//! [`controller`] owns per-client state across runs.

pub mod controller;
pub mod dealer;
pub mod enrichment;
pub mod location;
pub mod mapper;
pub mod money;
pub mod offers;
pub mod pipeline;
pub mod registry;
pub mod rules;
pub mod session;
pub mod source;

pub use controller::CatalogController;
pub use pipeline::{CatalogPipeline, LoadRequest, PipelineConfig, PipelineError, PipelineOutput};
pub use registry::SessionRegistry;
pub use session::{PricingDebugRecord, PricingSession};
pub use source::{CatalogSource, CatalogSourceKind, DeepSource, SummarySource};
