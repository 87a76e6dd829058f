//! Events emitted while a run progresses.

use super::{ResultFragment, StageId, StageStatus};
use crate::pipeline::PipelineState;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every stage completed.
    Completed,
    /// A stage failed and the run was aborted.
    Failed {
        /// The failing stage.
        stage: StageId,
        /// The user-visible message.
        message: String,
    },
    /// The run was cancelled before all stages started.
    Cancelled {
        /// The cancellation reason.
        reason: String,
    },
}

impl RunOutcome {
    /// Returns true if every stage completed.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// A stage status change, with the state snapshot right after it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageEvent {
    /// The run this event belongs to.
    pub run_id: Uuid,
    /// The stage that changed.
    pub stage: StageId,
    /// Its new status.
    pub status: StageStatus,
    /// The retained output merged by this change, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fragment: Option<ResultFragment>,
    /// The error message when the stage failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Time spent in the stage, set on terminal statuses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
    /// When the event occurred (ISO 8601).
    pub timestamp: String,
    /// Immutable state snapshot after the change.
    pub snapshot: PipelineState,
}

/// An event on the run stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// The run was accepted and is about to call the service.
    RunStarted {
        /// The run id.
        run_id: Uuid,
        /// SHA-256 of the uploaded content.
        digest: String,
        /// Number of stages that will run.
        stages: usize,
        /// When the event occurred (ISO 8601).
        timestamp: String,
    },
    /// A stage changed status.
    Stage(StageEvent),
    /// The run is over; no further events follow.
    RunFinished {
        /// The run id.
        run_id: Uuid,
        /// How the run ended.
        outcome: RunOutcome,
        /// Total run time.
        duration_ms: f64,
        /// When the event occurred (ISO 8601).
        timestamp: String,
    },
}

impl PipelineEvent {
    /// Short event type name used in logs.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::RunStarted { .. } => "run.started",
            Self::Stage(ev) => match ev.status {
                StageStatus::Pending => "stage.pending",
                StageStatus::Running => "stage.started",
                StageStatus::Done => "stage.completed",
                StageStatus::Failed => "stage.failed",
            },
            Self::RunFinished { .. } => "run.finished",
        }
    }

    /// The run id carried by the event.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        match self {
            Self::RunStarted { run_id, .. } | Self::RunFinished { run_id, .. } => *run_id,
            Self::Stage(ev) => ev.run_id,
        }
    }

    /// The stage event, if this is one.
    #[must_use]
    pub fn as_stage(&self) -> Option<&StageEvent> {
        match self {
            Self::Stage(ev) => Some(ev),
            _ => None,
        }
    }

    /// `(stage, status)` for stage events; handy for asserting sequences.
    #[must_use]
    pub fn stage_status(&self) -> Option<(StageId, StageStatus)> {
        self.as_stage().map(|ev| (ev.stage, ev.status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage_event(status: StageStatus) -> PipelineEvent {
        PipelineEvent::Stage(StageEvent {
            run_id: Uuid::nil(),
            stage: StageId::Sentiment,
            status,
            fragment: None,
            error: None,
            duration_ms: None,
            timestamp: crate::utils::iso_timestamp(),
            snapshot: PipelineState::default(),
        })
    }

    #[test]
    fn test_event_types() {
        assert_eq!(stage_event(StageStatus::Running).event_type(), "stage.started");
        assert_eq!(stage_event(StageStatus::Done).event_type(), "stage.completed");
        assert_eq!(stage_event(StageStatus::Failed).event_type(), "stage.failed");
    }

    #[test]
    fn test_stage_status_accessor() {
        let ev = stage_event(StageStatus::Done);
        assert_eq!(ev.stage_status(), Some((StageId::Sentiment, StageStatus::Done)));
        assert_eq!(ev.run_id(), Uuid::nil());
    }

    #[test]
    fn test_event_serialization_tag() {
        let ev = PipelineEvent::RunFinished {
            run_id: Uuid::nil(),
            outcome: RunOutcome::Completed,
            duration_ms: 1.5,
            timestamp: "2024-01-01T00:00:00.000000+00:00".into(),
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "run_finished");
        assert_eq!(json["outcome"]["outcome"], "completed");
    }
}
