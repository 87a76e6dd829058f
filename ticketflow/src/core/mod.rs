//! Core domain model types for ticketflow.
//!
//! This module contains the fundamental types used throughout the crate:
//! - Stage identity and status enums
//! - Ticket and template rows returned by the service
//! - Retained results and the events emitted during a run

mod event;
pub mod lenient;
mod results;
mod status;
mod ticket;

pub use event::{PipelineEvent, RunOutcome, StageEvent};
pub use results::{AnalysisResults, ResultFragment, ResultSlot};
pub use status::{StageId, StageStatus};
pub use ticket::{ResponseTemplate, RiskLevel, Severity, Ticket};
