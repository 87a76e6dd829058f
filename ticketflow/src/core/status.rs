//! Stage identity and status enums.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the seven steps of the support-ticket analysis.
///
/// The order of [`StageId::ALL`] is the fixed execution order of the default
/// pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    /// Upload of the raw CSV text.
    Ingestion,
    /// Per-ticket sentiment, emotion and urgency.
    Sentiment,
    /// Category validation and suggestions.
    Categorization,
    /// Escalation risk scoring.
    Escalation,
    /// Response template generation.
    Templates,
    /// Executive summary and metrics.
    Summary,
    /// Combined per-ticket view.
    TicketAnalysis,
}

impl StageId {
    /// All stages in execution order.
    pub const ALL: [Self; 7] = [
        Self::Ingestion,
        Self::Sentiment,
        Self::Categorization,
        Self::Escalation,
        Self::Templates,
        Self::Summary,
        Self::TicketAnalysis,
    ];

    /// Stable machine name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ingestion => "ingestion",
            Self::Sentiment => "sentiment",
            Self::Categorization => "categorization",
            Self::Escalation => "escalation",
            Self::Templates => "templates",
            Self::Summary => "summary",
            Self::TicketAnalysis => "ticket_analysis",
        }
    }

    /// Human readable title used in progress output.
    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self {
            Self::Ingestion => "Data Ingestion",
            Self::Sentiment => "Sentiment Analysis",
            Self::Categorization => "Categorization",
            Self::Escalation => "Risk Assessment",
            Self::Templates => "Response Templates",
            Self::Summary => "Executive Summary",
            Self::TicketAnalysis => "Ticket Analysis",
        }
    }

    /// One-based position in the default execution order.
    #[must_use]
    pub fn step(&self) -> usize {
        Self::ALL
            .iter()
            .position(|id| id == self)
            .map_or(0, |idx| idx + 1)
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| format!("unknown stage '{s}'"))
    }
}

/// The execution status of a stage within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// Stage has not started.
    #[default]
    Pending,
    /// Stage is waiting on the remote service.
    Running,
    /// Stage completed successfully.
    Done,
    /// Stage failed; the run was aborted.
    Failed,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl StageStatus {
    /// Returns true if the status represents a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Returns true if moving to `next` keeps the status monotonic.
    #[must_use]
    pub fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running) | (Self::Running, Self::Done | Self::Failed)
        )
    }
}
