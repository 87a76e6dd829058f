//! Pipeline definition and execution.
//!
//! This module provides:
//! - Stage specifications and the validating builder
//! - The stage graph with readiness tracking
//! - Progressive run state and the object registry
//! - The runner and the [`Session`] facade
//! - Best-effort cleanup of remote objects

mod builder;
mod cleanup;
mod dag;
pub mod prompts;
mod registry;
mod runner;
mod session;
mod spec;
mod state;

pub use builder::{support_analysis_pipeline, PipelineBuilder, DATASET_OBJECT};
pub use cleanup::{cleanup_objects, CleanupReport};
pub use dag::{Readiness, StageGraph};
pub use registry::{ObjectRegistry, RemoteObject};
pub use session::{RunReport, Session};
pub use spec::{StageOperation, StageSpec};
pub use state::{PipelineState, StageEntry};
