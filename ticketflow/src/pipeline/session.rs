//! The user-facing analysis session.

use super::runner::{RunSummary, Runner};
use super::{cleanup_objects, support_analysis_pipeline, CleanupReport, ObjectRegistry, PipelineState, StageGraph};
use crate::cancellation::CancellationToken;
use crate::config::PipelineConfig;
use crate::core::{PipelineEvent, RunOutcome};
use crate::errors::TicketflowError;
use crate::events::{ChannelEventSink, EventSink, FanoutEventSink, NoOpEventSink};
use crate::ingest::{Dataset, Upload};
use crate::service::{ApiCallLog, LoggedService, PromptService};
use crate::utils::{elapsed_ms, generate_run_id, iso_timestamp};
use futures::Stream;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

/// Result of a run that was awaited to the end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// The run id.
    pub run_id: Uuid,
    /// How the run ended.
    pub outcome: RunOutcome,
    /// Total run time.
    pub duration_ms: f64,
    /// Final state snapshot.
    pub state: PipelineState,
}

/// Clears the in-progress flag however a run ends.
struct ProcessingGuard(Arc<AtomicBool>);

impl Drop for ProcessingGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// A validated run that has not started calling the service yet.
struct PreparedRun {
    runner: Runner,
    dataset: Dataset,
    guard: ProcessingGuard,
}

impl PreparedRun {
    async fn drive(self) -> (RunSummary, f64) {
        let Self {
            runner,
            dataset,
            guard,
        } = self;
        let start = Instant::now();
        let run_id = runner.run_id;

        info!(
            run_id = %run_id,
            file = dataset.file_name(),
            rows = dataset.row_count(),
            digest = dataset.digest(),
            "analysis started"
        );
        runner
            .sink
            .emit(&PipelineEvent::RunStarted {
                run_id,
                digest: dataset.digest().to_string(),
                stages: runner.graph.len(),
                timestamp: iso_timestamp(),
            })
            .await;

        let summary = runner.execute(&dataset).await;
        let duration_ms = elapsed_ms(start);
        info!(run_id = %run_id, outcome = ?summary.outcome, duration_ms, "analysis finished");

        // A listener reacting to the final event may start the next run.
        drop(guard);
        runner
            .sink
            .emit(&PipelineEvent::RunFinished {
                run_id,
                outcome: summary.outcome.clone(),
                duration_ms,
                timestamp: iso_timestamp(),
            })
            .await;

        (summary, duration_ms)
    }
}

/// Runs the analysis pipeline against a prompt service and keeps its state.
///
/// One run is active at a time. Every service call goes through a
/// [`LoggedService`], so [`api_log`](Self::api_log) holds the calls of the
/// latest run.
pub struct Session {
    service: Arc<dyn PromptService>,
    graph: Arc<StageGraph>,
    config: PipelineConfig,
    state: Arc<RwLock<PipelineState>>,
    registry: ObjectRegistry,
    token: RwLock<Arc<CancellationToken>>,
    sink: Arc<dyn EventSink>,
    processing: Arc<AtomicBool>,
    api_log: ApiCallLog,
}

impl Session {
    /// Creates a session running the seven-stage support analysis.
    ///
    /// # Errors
    ///
    /// Returns an error if the built-in pipeline fails validation.
    pub fn new(service: Arc<dyn PromptService>) -> Result<Self, TicketflowError> {
        Ok(Self::with_graph(service, support_analysis_pipeline()?))
    }

    /// Creates a session running a custom stage graph.
    #[must_use]
    pub fn with_graph(service: Arc<dyn PromptService>, graph: StageGraph) -> Self {
        let api_log = ApiCallLog::new();
        let state = PipelineState::new(&graph);
        Self {
            service: Arc::new(LoggedService::new(service, api_log.clone())),
            graph: Arc::new(graph),
            config: PipelineConfig::default(),
            state: Arc::new(RwLock::new(state)),
            registry: ObjectRegistry::new(),
            token: RwLock::new(Arc::new(CancellationToken::new())),
            sink: Arc::new(NoOpEventSink),
            processing: Arc::new(AtomicBool::new(false)),
            api_log,
        }
    }

    /// Creates a session talking to the hosted service.
    ///
    /// # Errors
    ///
    /// Returns [`TicketflowError::Config`] if the configuration is invalid.
    #[cfg(feature = "http")]
    pub fn from_config(config: &crate::config::AppConfig) -> Result<Self, TicketflowError> {
        config.validate()?;
        let service = crate::service::HttpPromptService::new(config.service.clone())
            .map_err(|e| TicketflowError::Config(e.to_string()))?;
        Ok(Self::new(Arc::new(service))?.with_config(config.pipeline.clone()))
    }

    /// Sets the pipeline behavior.
    ///
    /// The settings are checked when a run starts; an unusable timeout
    /// rejects the run with [`TicketflowError::Config`].
    #[must_use]
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Adds a sink receiving every event of every run.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// The stage graph.
    #[must_use]
    pub fn graph(&self) -> &StageGraph {
        &self.graph
    }

    /// The pipeline behavior.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// A snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> PipelineState {
        self.state.read().clone()
    }

    /// Service calls of the latest run.
    #[must_use]
    pub fn api_log(&self) -> &ApiCallLog {
        &self.api_log
    }

    /// Objects the latest run created.
    #[must_use]
    pub fn registry(&self) -> &ObjectRegistry {
        &self.registry
    }

    /// Whether a run is in progress.
    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::SeqCst)
    }

    /// Starts a run in the background and streams its events.
    ///
    /// The stream yields a `RunStarted` event, each stage transition with a
    /// state snapshot, and a final `RunFinished`. Must be called inside a
    /// tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`TicketflowError::InvalidInput`] for a non-CSV or empty
    /// upload, [`TicketflowError::Config`] for an unusable stage timeout and
    /// [`TicketflowError::RunInProgress`] while another run is active. No
    /// service call is made in any of these cases.
    pub fn run_pipeline(
        &self,
        upload: Upload,
    ) -> Result<impl Stream<Item = PipelineEvent> + Send + 'static, TicketflowError> {
        let (channel, rx) = ChannelEventSink::channel();
        let prepared = self.prepare(upload, Some(Arc::new(channel)))?;

        tokio::spawn(async move {
            prepared.drive().await;
        });

        Ok(futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        }))
    }

    /// Runs the pipeline to the end.
    ///
    /// # Errors
    ///
    /// Besides the errors of [`run_pipeline`](Self::run_pipeline), returns
    /// [`TicketflowError::Stage`] naming the stage that failed. Results
    /// merged before the failure stay visible in [`state`](Self::state).
    pub async fn run(&self, upload: Upload) -> Result<RunReport, TicketflowError> {
        let prepared = self.prepare(upload, None)?;
        let run_id = prepared.runner.run_id;
        let (summary, duration_ms) = prepared.drive().await;

        if let Some(err) = summary.error {
            return Err(err.into());
        }
        if let RunOutcome::Failed { message, .. } = &summary.outcome {
            return Err(TicketflowError::Internal(message.clone()));
        }
        Ok(RunReport {
            run_id,
            outcome: summary.outcome,
            duration_ms,
            state: self.state(),
        })
    }

    /// Requests cancellation of the active run.
    ///
    /// Calls already in flight complete and are applied; no further stage
    /// starts. Returns false if there was nothing to cancel.
    pub fn cancel(&self) -> bool {
        if !self.is_processing() {
            return false;
        }
        self.token.read().cancel("cancelled by user")
    }

    /// Returns the session to its initial state.
    ///
    /// Statuses, results, the error, the object registry and the API log are
    /// cleared. An active run is cancelled and its later updates are dropped.
    pub fn reset(&self) {
        self.token.read().cancel("reset");
        self.state.write().reset();
        self.registry.clear();
        self.api_log.clear();
        info!("session reset");
    }

    /// Deletes every object the pipeline can create.
    ///
    /// Never fails; individual failures are in the report. The object
    /// registry is cleared afterwards.
    pub async fn cleanup(&self) -> CleanupReport {
        let created = self.registry.len();
        let timeout = self.config.stage_timeout().unwrap_or_else(|error| {
            warn!(%error, "using the default timeout for cleanup");
            PipelineConfig::DEFAULT_STAGE_TIMEOUT
        });
        let report = cleanup_objects(self.service.as_ref(), self.graph.object_names(), timeout).await;
        if !report.is_clean() {
            warn!(
                failed = report.failed.len(),
                created, "some remote objects could not be deleted"
            );
        }
        self.registry.clear();
        report
    }

    fn prepare(
        &self,
        upload: Upload,
        stream: Option<Arc<dyn EventSink>>,
    ) -> Result<PreparedRun, TicketflowError> {
        let dataset = upload.validate()?;
        let timeout = self.config.stage_timeout()?;

        if self
            .processing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(TicketflowError::RunInProgress);
        }
        let guard = ProcessingGuard(self.processing.clone());

        let run_id = generate_run_id();
        let token = Arc::new(CancellationToken::new());
        *self.token.write() = token.clone();
        self.api_log.clear();
        self.registry.clear();
        self.state.write().start_run(run_id);

        let mut sinks = FanoutEventSink::new().with_sink(self.sink.clone());
        if let Some(stream) = stream {
            sinks = sinks.with_sink(stream);
        }

        Ok(PreparedRun {
            runner: Runner {
                service: self.service.clone(),
                graph: self.graph.clone(),
                config: self.config.clone(),
                state: self.state.clone(),
                registry: self.registry.clone(),
                token,
                sink: Arc::new(sinks),
                run_id,
                timeout,
            },
            dataset,
            guard,
        })
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("pipeline", &self.graph.name())
            .field("config", &self.config)
            .field("processing", &self.is_processing())
            .field("objects", &self.registry.len())
            .finish()
    }
}
