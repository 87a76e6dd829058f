//! Stage execution.
//!
//! The runner owns one run. It schedules stages as their dependencies
//! complete, applies each result to the shared [`PipelineState`] from the
//! orchestrating task only, and emits a [`PipelineEvent`] per transition.

use super::{ObjectRegistry, PipelineState, StageGraph, StageOperation, StageSpec};
use crate::cancellation::CancellationToken;
use crate::config::{ExecutionMode, PipelineConfig};
use crate::core::{PipelineEvent, ResultFragment, ResultSlot, RunOutcome, StageEvent, StageId, StageStatus};
use crate::errors::{ServiceError, StageError, TransitionError};
use crate::events::EventSink;
use crate::ingest::Dataset;
use crate::service::{DataType, InputRef, OutputPayload, PromptService};
use crate::utils::{elapsed_ms, iso_timestamp};
use futures::stream::{FuturesUnordered, StreamExt};
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// What a finished run produced.
#[derive(Debug, Clone)]
pub(crate) struct RunSummary {
    pub outcome: RunOutcome,
    pub error: Option<StageError>,
}

/// Calls the service for one stage and returns its retained output.
///
/// Every remote call is bounded by `timeout`. `record` is called with the
/// stage's output object as soon as the service acknowledges it.
pub(crate) async fn invoke_stage(
    service: &dyn PromptService,
    spec: &StageSpec,
    dataset: &Dataset,
    config: &PipelineConfig,
    timeout: Duration,
    record: impl FnOnce(&str, StageId) + Send,
) -> Result<Option<ResultFragment>, StageError> {
    let stage = spec.id;

    match &spec.operation {
        StageOperation::Ingest => {
            let content = [dataset.content().to_string()];
            bounded(stage, timeout, service.create_input(&spec.output, DataType::Strings, &content))
                .await?;
        }
        StageOperation::Apply { instruction, inputs } => {
            let inputs: Vec<InputRef> = inputs.iter().map(InputRef::combined).collect();
            let outputs = [spec.output.clone()];
            bounded(stage, timeout, service.apply_instruction(&outputs, instruction, &inputs))
                .await?;
        }
    }
    record(&spec.output, stage);

    let Some(slot) = spec.retain else {
        return Ok(None);
    };
    let payload = bounded(stage, timeout, service.fetch_output(&spec.output)).await?;
    parse_payload(stage, slot, &payload, config.lenient_payloads).map(Some)
}

async fn bounded<T>(
    stage: StageId,
    timeout: Duration,
    call: impl Future<Output = Result<T, ServiceError>>,
) -> Result<T, StageError> {
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result.map_err(|e| StageError::new(stage, e)),
        Err(_) => Err(StageError::timeout(stage, timeout.as_secs_f64())),
    }
}

/// Turns a fetched payload into the fragment for `slot`.
///
/// A missing or blank `text_value` yields the slot's empty value. Text that
/// is not JSON of the right shape fails the stage, unless `lenient` is set.
pub(crate) fn parse_payload(
    stage: StageId,
    slot: ResultSlot,
    payload: &OutputPayload,
    lenient: bool,
) -> Result<ResultFragment, StageError> {
    let empty = || slot.fragment_from_value(slot.empty_value());

    let text = match payload.text_value.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => text,
        _ => {
            debug!(stage = %stage, "no text_value, using empty {}", slot);
            return empty().map_err(|e| StageError::payload(stage, e));
        }
    };

    let parsed = serde_json::from_str(text)
        .map_err(|e| format!("invalid JSON: {e}"))
        .and_then(|value| slot.fragment_from_value(value));

    match parsed {
        Ok(fragment) => Ok(fragment),
        Err(msg) if lenient => {
            warn!(stage = %stage, error = %msg, "malformed stage output treated as empty");
            empty().map_err(|e| StageError::payload(stage, e))
        }
        Err(msg) => Err(StageError::payload(stage, msg)),
    }
}

/// Executes one run of a stage graph.
pub(crate) struct Runner {
    pub service: Arc<dyn PromptService>,
    pub graph: Arc<StageGraph>,
    pub config: PipelineConfig,
    pub state: Arc<RwLock<PipelineState>>,
    pub registry: ObjectRegistry,
    pub token: Arc<CancellationToken>,
    pub sink: Arc<dyn EventSink>,
    pub run_id: Uuid,
    pub timeout: Duration,
}

enum Stop {
    Failed(StageId, String, Option<StageError>),
    Cancelled(String),
}

impl Runner {
    /// Runs every stage and returns how the run ended.
    ///
    /// The state must already be bound to `run_id`.
    pub async fn execute(&self, dataset: &Dataset) -> RunSummary {
        let max_in_flight = match self.config.mode {
            ExecutionMode::Sequential => 1,
            ExecutionMode::Parallel => usize::MAX,
        };

        let mut readiness = self.graph.readiness();
        let mut queue: VecDeque<StageId> = readiness.initial().into();
        let mut in_flight = FuturesUnordered::new();
        let mut stop: Option<Stop> = None;

        loop {
            while stop.is_none() && in_flight.len() < max_in_flight {
                if let Some(reason) = self.cancel_reason() {
                    stop = Some(Stop::Cancelled(reason));
                    break;
                }
                let Some(stage) = queue.pop_front() else {
                    break;
                };
                match self.begin(stage).await {
                    Ok(true) => in_flight.push(self.run_stage(stage, dataset)),
                    Ok(false) => stop = Some(Stop::Cancelled(superseded())),
                    Err(e) => stop = Some(Stop::Failed(stage, e.to_string(), None)),
                }
            }

            let Some((stage, started, result)) = in_flight.next().await else {
                break;
            };
            let duration_ms = elapsed_ms(started);

            match result {
                Ok(fragment) => match self.complete(stage, fragment, duration_ms).await {
                    Ok(true) => queue.extend(readiness.complete(stage)),
                    Ok(false) => {
                        stop.get_or_insert_with(|| Stop::Cancelled(superseded()));
                    }
                    Err(e) => {
                        stop.get_or_insert(Stop::Failed(stage, e.to_string(), None));
                    }
                },
                Err(err) => {
                    let message = err.user_message();
                    error!(
                        run_id = %self.run_id,
                        stage = %stage,
                        error = %err,
                        duration_ms,
                        "stage failed"
                    );
                    if let Err(e) = self.fail(stage, &err, &message, duration_ms).await {
                        warn!(stage = %stage, error = %e, "could not record stage failure");
                    }
                    // A failure outranks cancellation; the first failure is kept.
                    if !matches!(stop, Some(Stop::Failed(..))) {
                        stop = Some(Stop::Failed(stage, message, Some(err)));
                    }
                }
            }
        }

        match stop {
            Some(Stop::Failed(stage, message, error)) => RunSummary {
                outcome: RunOutcome::Failed { stage, message },
                error,
            },
            Some(Stop::Cancelled(reason)) => RunSummary {
                outcome: RunOutcome::Cancelled { reason },
                error: None,
            },
            None => RunSummary {
                outcome: RunOutcome::Completed,
                error: None,
            },
        }
    }

    fn cancel_reason(&self) -> Option<String> {
        self.token
            .is_cancelled()
            .then(|| self.token.reason().unwrap_or_else(|| "cancelled".to_string()))
    }

    async fn run_stage(
        &self,
        stage: StageId,
        dataset: &Dataset,
    ) -> (StageId, Instant, Result<Option<ResultFragment>, StageError>) {
        let started = Instant::now();
        let result = match self.graph.get(stage) {
            Some(spec) => {
                invoke_stage(
                    self.service.as_ref(),
                    spec,
                    dataset,
                    &self.config,
                    self.timeout,
                    |name, producer| self.record_object(name, producer),
                )
                .await
            }
            None => Err(StageError::payload(stage, "stage is not part of the pipeline")),
        };
        (stage, started, result)
    }

    /// Records a created object unless a reset or a newer run has taken
    /// over the state. The state lock is held so a concurrent reset either
    /// clears the entry or is seen here.
    fn record_object(&self, name: &str, producer: StageId) {
        let state = self.state.read();
        if state.run_id == Some(self.run_id) {
            self.registry.record(name, producer);
        } else {
            debug!(run_id = %self.run_id, object = name, "not recording object of a superseded run");
        }
    }

    /// Applies a state change if the state still belongs to this run.
    ///
    /// Returns the snapshot after the change, or `None` when a reset has
    /// detached the state from this run.
    fn update<F>(&self, change: F) -> Result<Option<PipelineState>, TransitionError>
    where
        F: FnOnce(&mut PipelineState) -> Result<(), TransitionError>,
    {
        let mut state = self.state.write();
        if state.run_id != Some(self.run_id) {
            debug!(run_id = %self.run_id, "discarding update for a superseded run");
            return Ok(None);
        }
        change(&mut state)?;
        Ok(Some(state.clone()))
    }

    async fn begin(&self, stage: StageId) -> Result<bool, TransitionError> {
        let Some(snapshot) = self.update(|s| s.begin(stage))? else {
            return Ok(false);
        };
        info!(run_id = %self.run_id, stage = %stage, "stage started");
        self.emit_stage(stage, StageStatus::Running, None, None, None, snapshot)
            .await;
        Ok(true)
    }

    async fn complete(
        &self,
        stage: StageId,
        fragment: Option<ResultFragment>,
        duration_ms: f64,
    ) -> Result<bool, TransitionError> {
        let Some(snapshot) = self.update(|s| s.complete(stage, fragment.clone()))? else {
            return Ok(false);
        };
        info!(run_id = %self.run_id, stage = %stage, duration_ms, "stage completed");
        self.emit_stage(stage, StageStatus::Done, fragment, None, Some(duration_ms), snapshot)
            .await;
        Ok(true)
    }

    async fn fail(
        &self,
        stage: StageId,
        err: &StageError,
        message: &str,
        duration_ms: f64,
    ) -> Result<(), TransitionError> {
        if let Some(snapshot) = self.update(|s| s.fail(stage, message))? {
            self.emit_stage(
                stage,
                StageStatus::Failed,
                None,
                Some(err.to_string()),
                Some(duration_ms),
                snapshot,
            )
            .await;
        }
        Ok(())
    }

    async fn emit_stage(
        &self,
        stage: StageId,
        status: StageStatus,
        fragment: Option<ResultFragment>,
        error: Option<String>,
        duration_ms: Option<f64>,
        snapshot: PipelineState,
    ) {
        let event = PipelineEvent::Stage(StageEvent {
            run_id: self.run_id,
            stage,
            status,
            fragment,
            error,
            duration_ms,
            timestamp: iso_timestamp(),
            snapshot,
        });
        self.sink.emit(&event).await;
    }
}

fn superseded() -> String {
    "superseded by reset".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StageErrorKind;
    use crate::events::CollectingEventSink;
    use crate::ingest::Upload;
    use crate::pipeline::support_analysis_pipeline;
    use crate::service::MockPromptService;
    use serde_json::json;

    fn dataset() -> Dataset {
        Upload::new("tickets.csv", "ticket_id,priority\nT-1,High\n")
            .validate()
            .unwrap()
    }

    #[test]
    fn test_parse_missing_text_is_empty() {
        let fragment = parse_payload(
            StageId::Summary,
            ResultSlot::Summary,
            &OutputPayload::default(),
            false,
        )
        .unwrap();
        assert_eq!(fragment, ResultFragment::Summary(serde_json::Map::new()));

        let fragment =
            parse_payload(StageId::Templates, ResultSlot::Templates, &OutputPayload::text("  "), false)
                .unwrap();
        assert_eq!(fragment, ResultFragment::Templates(Vec::new()));
    }

    #[test]
    fn test_parse_malformed_payload() {
        let payload = OutputPayload::text("not json");
        let err = parse_payload(StageId::TicketAnalysis, ResultSlot::Tickets, &payload, false)
            .unwrap_err();
        assert_eq!(err.stage, StageId::TicketAnalysis);
        assert!(matches!(err.kind, StageErrorKind::Payload(_)));

        let lenient =
            parse_payload(StageId::TicketAnalysis, ResultSlot::Tickets, &payload, true).unwrap();
        assert_eq!(lenient, ResultFragment::Tickets(Vec::new()));
    }

    #[test]
    fn test_parse_wrong_shape() {
        let payload = OutputPayload::text(r#"[{"total_tickets": 3}]"#);
        assert!(parse_payload(StageId::Summary, ResultSlot::Summary, &payload, false).is_err());
    }

    #[test]
    fn test_parse_tickets() {
        let payload = OutputPayload::text(r#"[{"ticket_id": "T-1", "risk_level": "HIGH"}]"#);
        let fragment =
            parse_payload(StageId::TicketAnalysis, ResultSlot::Tickets, &payload, false).unwrap();
        let ResultFragment::Tickets(rows) = fragment else {
            panic!("expected tickets");
        };
        assert_eq!(rows.len(), 1);
        assert!(rows[0].is_high_risk());
        assert_eq!(rows[0].ticket_id.as_deref(), Some("T-1"));
    }

    #[tokio::test]
    async fn test_invoke_ingest_records_object() {
        let mut mock = MockPromptService::new();
        mock.expect_create_input()
            .times(1)
            .returning(|_, _, content| {
                assert_eq!(content.len(), 1);
                assert!(content[0].starts_with("ticket_id"));
                Ok(json!({"ok": true}))
            });

        let graph = support_analysis_pipeline().unwrap();
        let registry = ObjectRegistry::new();
        let spec = graph.get(StageId::Ingestion).unwrap();
        let out = invoke_stage(
            &mock,
            spec,
            &dataset(),
            &PipelineConfig::default(),
            Duration::from_secs(5),
            |name, producer| registry.record(name, producer),
        )
        .await
        .unwrap();

        assert!(out.is_none());
        assert!(registry.contains("support_tickets"));
    }

    #[tokio::test]
    async fn test_invoke_retained_stage_fetches_output() {
        let mut mock = MockPromptService::new();
        mock.expect_apply_instruction()
            .times(1)
            .returning(|outputs, instruction, inputs| {
                assert_eq!(outputs, ["executive_summary".to_string()]);
                assert!(instruction.contains("{escalation_risk}"));
                assert_eq!(inputs.len(), 3);
                Ok(json!({}))
            });
        mock.expect_fetch_output()
            .times(1)
            .returning(|_| Ok(OutputPayload::text(r#"{"total_tickets": 3}"#)));

        let graph = support_analysis_pipeline().unwrap();
        let spec = graph.get(StageId::Summary).unwrap();
        let out = invoke_stage(
            &mock,
            spec,
            &dataset(),
            &PipelineConfig::default(),
            Duration::from_secs(5),
            |_, _| {},
        )
        .await
        .unwrap();

        let Some(ResultFragment::Summary(map)) = out else {
            panic!("expected summary");
        };
        assert_eq!(map["total_tickets"], json!(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invoke_times_out() {
        struct Slow;

        #[async_trait::async_trait]
        impl PromptService for Slow {
            async fn create_input(
                &self,
                _: &str,
                _: DataType,
                _: &[String],
            ) -> Result<serde_json::Value, ServiceError> {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(json!({}))
            }
            async fn apply_instruction(
                &self,
                _: &[String],
                _: &str,
                _: &[InputRef],
            ) -> Result<serde_json::Value, ServiceError> {
                Ok(json!({}))
            }
            async fn fetch_output(&self, _: &str) -> Result<OutputPayload, ServiceError> {
                Ok(OutputPayload::default())
            }
            async fn delete_object(&self, _: &str) -> Result<serde_json::Value, ServiceError> {
                Ok(json!({}))
            }
        }

        let graph = support_analysis_pipeline().unwrap();
        let registry = ObjectRegistry::new();
        let err = invoke_stage(
            &Slow,
            graph.get(StageId::Ingestion).unwrap(),
            &dataset(),
            &PipelineConfig::default(),
            Duration::from_secs(5),
            |name, producer| registry.record(name, producer),
        )
        .await
        .unwrap_err();

        assert!(matches!(err.kind, StageErrorKind::Timeout { .. }));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_runner_discards_superseded_updates() {
        let mut mock = MockPromptService::new();
        mock.expect_create_input().returning(|_, _, _| Ok(json!({})));

        let graph = Arc::new(support_analysis_pipeline().unwrap());
        let state = Arc::new(RwLock::new(PipelineState::new(&graph)));
        let sink = Arc::new(CollectingEventSink::new());
        let runner = Runner {
            service: Arc::new(mock),
            graph,
            config: PipelineConfig::default(),
            state: state.clone(),
            registry: ObjectRegistry::new(),
            token: Arc::new(CancellationToken::new()),
            sink: sink.clone(),
            run_id: Uuid::new_v4(),
            timeout: Duration::from_secs(5),
        };

        // The state was never bound to this run.
        let summary = runner.execute(&dataset()).await;
        assert!(matches!(summary.outcome, RunOutcome::Cancelled { .. }));
        assert!(sink.is_empty());
        assert_eq!(state.read().status(StageId::Ingestion), StageStatus::Pending);
    }
}
