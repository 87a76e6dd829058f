//! Testing utilities for ticketflow sessions.
//!
//! This module provides:
//! - A scripted in-memory prompt service
//! - Sample ticket uploads with matching canned stage outputs

mod fixtures;
mod mocks;

pub use fixtures::{
    csv_upload, sample_service, scripted_service, CSV_HEADER, LOW_PRIORITY_CSV,
    LOW_PRIORITY_SUMMARY_JSON, LOW_PRIORITY_TICKETS_JSON, SAMPLE_CSV, SAMPLE_SUMMARY_JSON,
    SAMPLE_TEMPLATES_JSON, SAMPLE_TICKETS_JSON,
};
pub use mocks::{Operation, RecordedCall, ScriptedPromptService};
