//! # Ticketflow
//!
//! Staged remote analysis of customer support ticket exports.
//!
//! A CSV export of support tickets is uploaded to a hosted prompt-execution
//! service and pushed through seven dependent stages:
//!
//! - **Ingestion** of the raw CSV as a named remote object
//! - **Sentiment**, **categorization** and **escalation risk** per ticket
//! - **Response templates**, an **executive summary** and a fused **ticket view**
//!
//! Stage progress is streamed as [`PipelineEvent`](core::PipelineEvent)s carrying
//! state snapshots, so a report can fill in section by section.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ticketflow::prelude::*;
//!
//! let config = load_config(Some(Path::new("ticketflow.toml")))?;
//! let session = Session::from_config(&config)?;
//!
//! let mut events = session.run_pipeline(Upload::from_path("tickets.csv").await?)?;
//! while let Some(event) = events.next().await {
//!     if let Some(stage) = event.as_stage() {
//!         println!("{}", ReportView::from_state(&stage.snapshot));
//!     }
//! }
//! session.cleanup().await;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod ingest;
pub mod pipeline;
pub mod report;
pub mod service;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::config::{load_config, AppConfig, ExecutionMode, PipelineConfig};
    pub use crate::core::{
        AnalysisResults, PipelineEvent, RunOutcome, StageEvent, StageId, StageStatus, Ticket,
    };
    pub use crate::errors::{
        PipelineValidationError, ServiceError, StageError, TicketflowError,
    };
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::ingest::{Dataset, Upload};
    pub use crate::pipeline::{
        support_analysis_pipeline, CleanupReport, PipelineBuilder, PipelineState, RunReport,
        Session, StageGraph, StageSpec,
    };
    pub use crate::report::{export_tickets_csv, ReportView};
    pub use crate::service::{PromptService, ServiceConfig};
    #[cfg(feature = "http")]
    pub use crate::service::HttpPromptService;
}
