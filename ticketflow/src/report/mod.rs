//! Report data derived from a run.
//!
//! This module provides:
//! - The gated report view-model with metric fallbacks
//! - CSV export of the ticket view and its reader

mod export;
mod view;

pub use export::{export_tickets_csv, parse_exported_csv, ExportRow, DEFAULT_EXPORT_FILE, EXPORT_HEADER};
pub use view::{
    high_risk_count, raw_json, Bucket, CriticalAlert, Insights, Metrics, ReportView, TicketRow,
    DEFAULT_ALERT_ACTION,
};
