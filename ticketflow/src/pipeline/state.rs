//! Progressive per-stage state of a run.

use super::StageGraph;
use crate::core::{AnalysisResults, ResultFragment, StageId, StageStatus};
use crate::errors::TransitionError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of one tracked stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageEntry {
    /// The stage.
    pub stage: StageId,
    /// Current status.
    pub status: StageStatus,
    /// Stages that must be done before this one starts.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<StageId>,
}

/// Snapshot-able state of a pipeline run.
///
/// Statuses only move forward within a run and the retained results only
/// grow. Everything goes back to the initial state through [`reset`].
///
/// [`reset`]: PipelineState::reset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    /// The run this state belongs to, once a run has started.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<Uuid>,
    /// Stages in declaration order.
    #[serde(default)]
    pub stages: Vec<StageEntry>,
    /// Results retained so far.
    #[serde(default)]
    pub results: AnalysisResults,
    /// User-visible error of a failed run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PipelineState {
    /// All stages of `graph` pending, no results.
    #[must_use]
    pub fn new(graph: &StageGraph) -> Self {
        Self {
            run_id: None,
            stages: graph
                .stages()
                .iter()
                .map(|s| StageEntry {
                    stage: s.id,
                    status: StageStatus::Pending,
                    dependencies: s.dependencies.iter().copied().collect(),
                })
                .collect(),
            results: AnalysisResults::default(),
            error: None,
        }
    }

    /// Clears statuses, results and the error, keeping the tracked stages.
    pub fn reset(&mut self) {
        self.run_id = None;
        for entry in &mut self.stages {
            entry.status = StageStatus::Pending;
        }
        self.results = AnalysisResults::default();
        self.error = None;
    }

    /// Resets and binds the state to a new run.
    pub fn start_run(&mut self, run_id: Uuid) {
        self.reset();
        self.run_id = Some(run_id);
    }

    /// Status of a stage; untracked stages read as pending.
    #[must_use]
    pub fn status(&self, stage: StageId) -> StageStatus {
        self.entry(stage).map(|e| e.status).unwrap_or_default()
    }

    /// Whether the stage is running.
    #[must_use]
    pub fn is_loading(&self, stage: StageId) -> bool {
        self.status(stage) == StageStatus::Running
    }

    /// Whether the stage is done.
    #[must_use]
    pub fn is_completed(&self, stage: StageId) -> bool {
        self.status(stage) == StageStatus::Done
    }

    /// Whether any stage is running.
    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.stages.iter().any(|e| e.status == StageStatus::Running)
    }

    /// Whether every tracked stage is done.
    #[must_use]
    pub fn all_completed(&self) -> bool {
        !self.stages.is_empty() && self.stages.iter().all(|e| e.status == StageStatus::Done)
    }

    /// Number of stages done.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.stages
            .iter()
            .filter(|e| e.status == StageStatus::Done)
            .count()
    }

    /// The retained results.
    #[must_use]
    pub fn results(&self) -> &AnalysisResults {
        &self.results
    }

    /// Marks a stage running.
    ///
    /// # Errors
    ///
    /// Fails if the stage is not pending or a dependency is not done.
    pub fn begin(&mut self, stage: StageId) -> Result<(), TransitionError> {
        let entry = self.entry(stage).ok_or(TransitionError::UnknownStage(stage))?;
        check(stage, entry.status, StageStatus::Running)?;
        if let Some(dependency) = entry
            .dependencies
            .iter()
            .copied()
            .find(|dep| self.status(*dep) != StageStatus::Done)
        {
            return Err(TransitionError::DependencyPending { stage, dependency });
        }
        self.set(stage, StageStatus::Running);
        Ok(())
    }

    /// Marks a running stage done and merges its retained output.
    ///
    /// # Errors
    ///
    /// Fails if the stage is not running.
    pub fn complete(
        &mut self,
        stage: StageId,
        fragment: Option<ResultFragment>,
    ) -> Result<(), TransitionError> {
        let entry = self.entry(stage).ok_or(TransitionError::UnknownStage(stage))?;
        check(stage, entry.status, StageStatus::Done)?;
        self.set(stage, StageStatus::Done);
        if let Some(fragment) = fragment {
            self.results.merge(fragment);
        }
        Ok(())
    }

    /// Marks a running stage failed and records the run error.
    ///
    /// The first error of a run is kept.
    ///
    /// # Errors
    ///
    /// Fails if the stage is not running.
    pub fn fail(&mut self, stage: StageId, message: impl Into<String>) -> Result<(), TransitionError> {
        let entry = self.entry(stage).ok_or(TransitionError::UnknownStage(stage))?;
        check(stage, entry.status, StageStatus::Failed)?;
        self.set(stage, StageStatus::Failed);
        if self.error.is_none() {
            self.error = Some(message.into());
        }
        Ok(())
    }

    fn entry(&self, stage: StageId) -> Option<&StageEntry> {
        self.stages.iter().find(|e| e.stage == stage)
    }

    fn set(&mut self, stage: StageId, status: StageStatus) {
        if let Some(entry) = self.stages.iter_mut().find(|e| e.stage == stage) {
            entry.status = status;
        }
    }
}

fn check(stage: StageId, from: StageStatus, to: StageStatus) -> Result<(), TransitionError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(TransitionError::NotAllowed { stage, from, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::support_analysis_pipeline;
    use pretty_assertions::assert_eq;
    use serde_json::Map;

    fn state() -> PipelineState {
        PipelineState::new(&support_analysis_pipeline().unwrap())
    }

    #[test]
    fn test_initial_state() {
        let state = state();
        assert_eq!(state.stages.len(), 7);
        assert!(StageId::ALL.iter().all(|s| state.status(*s) == StageStatus::Pending));
        assert!(!state.is_processing());
        assert_eq!(state.results, AnalysisResults::default());
    }

    #[test]
    fn test_dependency_enforced() {
        let mut state = state();
        assert_eq!(
            state.begin(StageId::Sentiment),
            Err(TransitionError::DependencyPending {
                stage: StageId::Sentiment,
                dependency: StageId::Ingestion,
            })
        );

        state.begin(StageId::Ingestion).unwrap();
        assert!(state.is_loading(StageId::Ingestion));
        assert!(state.begin(StageId::Sentiment).is_err());

        state.complete(StageId::Ingestion, None).unwrap();
        assert!(state.is_completed(StageId::Ingestion));
        state.begin(StageId::Sentiment).unwrap();
    }

    #[test]
    fn test_transitions_are_monotonic() {
        let mut state = state();
        assert!(matches!(
            state.complete(StageId::Ingestion, None),
            Err(TransitionError::NotAllowed { .. })
        ));

        state.begin(StageId::Ingestion).unwrap();
        state.fail(StageId::Ingestion, "Analysis failed: boom").unwrap();
        assert_eq!(state.status(StageId::Ingestion), StageStatus::Failed);
        assert!(state.begin(StageId::Ingestion).is_err());
        assert!(state.complete(StageId::Ingestion, None).is_err());
        assert_eq!(state.error.as_deref(), Some("Analysis failed: boom"));
    }

    #[test]
    fn test_untracked_stage() {
        let mut state = PipelineState::default();
        assert_eq!(
            state.begin(StageId::Summary),
            Err(TransitionError::UnknownStage(StageId::Summary))
        );
        assert_eq!(state.status(StageId::Summary), StageStatus::Pending);
        assert!(!state.all_completed());
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let initial = state();
        let mut state = initial.clone();
        state.start_run(Uuid::new_v4());
        state.begin(StageId::Ingestion).unwrap();
        state.complete(StageId::Ingestion, None).unwrap();
        state.results.merge(ResultFragment::Summary(Map::new()));
        state.error = Some("x".into());

        state.reset();
        assert_eq!(state, initial);
    }

    #[test]
    fn test_complete_merges_fragment() {
        let mut state = state();
        for stage in [StageId::Ingestion, StageId::Sentiment, StageId::Escalation] {
            state.begin(stage).unwrap();
            state.complete(stage, None).unwrap();
        }
        state.begin(StageId::Summary).unwrap();
        state
            .complete(StageId::Summary, Some(ResultFragment::Summary(Map::new())))
            .unwrap();
        assert!(state.results().summary.is_some());
        assert_eq!(state.completed_count(), 4);
    }
}
