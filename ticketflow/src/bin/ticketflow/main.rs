use std::path::Path;

use anyhow::Context;
use clap::Parser;
use futures::{Stream, StreamExt};
use ticketflow::config::load_config;
use ticketflow::core::{PipelineEvent, RunOutcome, StageStatus};
use ticketflow::ingest::Upload;
use ticketflow::pipeline::{support_analysis_pipeline, CleanupReport, Session};
use ticketflow::report::{export_tickets_csv, raw_json, ReportView};

mod cli;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("ticketflow error: {error:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose)?;

    match cli.command {
        Commands::Stages => print_stages(),
        Commands::Cleanup => {
            let session = open_session(cli.config.as_deref())?;
            print_cleanup(&session.cleanup().await);
            Ok(())
        }
        Commands::Analyze {
            file,
            export,
            raw,
            cleanup,
        } => {
            let session = open_session(cli.config.as_deref())?;
            let upload = Upload::from_path(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            analyze(&session, upload, export.as_deref(), raw, cleanup).await
        }
    }
}

/// Runs one analysis and prints its report.
///
/// A rejected upload returns before anything is printed or deleted; a run
/// that started gets its report, export and cleanup even when a stage fails.
async fn analyze(
    session: &Session,
    upload: Upload,
    export: Option<&Path>,
    raw: bool,
    cleanup: bool,
) -> anyhow::Result<()> {
    let events = session.run_pipeline(upload).context("analysis rejected")?;
    let outcome = follow(session.graph().len(), events).await;

    let state = session.state();
    println!("\n{}", ReportView::from_state(&state));
    if raw {
        println!("{}", raw_json(state.results()));
    }
    if let Some(path) = export {
        match export_tickets_csv(state.results().tickets()) {
            Some(csv) => {
                tokio::fs::write(path, csv)
                    .await
                    .with_context(|| format!("failed to write {}", path.display()))?;
                println!("Exported tickets to {}", path.display());
            }
            None => println!("No tickets to export"),
        }
    }
    if cleanup {
        print_cleanup(&session.cleanup().await);
    }

    match outcome? {
        RunOutcome::Completed => Ok(()),
        RunOutcome::Failed { message, .. } => anyhow::bail!(message),
        RunOutcome::Cancelled { reason } => anyhow::bail!("analysis cancelled: {reason}"),
    }
}

async fn follow(
    total: usize,
    events: impl Stream<Item = PipelineEvent>,
) -> anyhow::Result<RunOutcome> {
    let mut events = Box::pin(events);
    let mut outcome = None;

    while let Some(event) = events.next().await {
        match event {
            PipelineEvent::RunStarted { run_id, .. } => println!("Run {run_id}"),
            PipelineEvent::Stage(ev) => {
                let mark = match ev.status {
                    StageStatus::Pending => continue,
                    StageStatus::Running => "..",
                    StageStatus::Done => "ok",
                    StageStatus::Failed => "!!",
                };
                let elapsed = ev
                    .duration_ms
                    .map(|ms| format!(" ({:.1}s)", ms / 1000.0))
                    .unwrap_or_default();
                println!(
                    "[{}/{total}] {mark} {}{elapsed}",
                    ev.stage.step(),
                    ev.stage.title()
                );
                if let Some(error) = ev.error {
                    println!("      {error}");
                }
            }
            PipelineEvent::RunFinished {
                outcome: finished, ..
            } => outcome = Some(finished),
        }
    }

    outcome.context("analysis ended without a result")
}

fn open_session(config_path: Option<&Path>) -> anyhow::Result<Session> {
    let config = load_config(config_path).context("failed to load configuration")?;
    Session::from_config(&config).context("failed to create session")
}

fn print_stages() -> anyhow::Result<()> {
    let graph = support_analysis_pipeline().context("invalid pipeline definition")?;
    println!("Pipeline {}", graph.name());
    for spec in graph.stages() {
        let deps: Vec<&str> = graph
            .dependencies(spec.id)
            .iter()
            .map(|d| d.as_str())
            .collect();
        let retained = spec
            .retain
            .map(|slot| format!(" -> {slot}"))
            .unwrap_or_default();
        println!(
            "{}. {:<16} object={}{retained}  after=[{}]",
            spec.id.step(),
            spec.id.as_str(),
            spec.output,
            deps.join(", ")
        );
    }
    Ok(())
}

fn print_cleanup(report: &CleanupReport) {
    println!(
        "Cleanup: {} attempted, {} deleted, {} failed",
        report.attempted.len(),
        report.deleted.len(),
        report.failed.len()
    );
    for (name, error) in &report.failed {
        println!("  {name}: {error}");
    }
}

fn init_tracing(quiet: bool, verbose: bool) -> anyhow::Result<()> {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("TICKETFLOW_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use ticketflow::errors::ServiceError;
    use ticketflow::service::PromptService;
    use ticketflow::testing::{csv_upload, sample_service, Operation, ScriptedPromptService, SAMPLE_CSV};

    fn session_with(service: &Arc<ScriptedPromptService>) -> Session {
        let service: Arc<dyn PromptService> = service.clone();
        Session::new(service).unwrap()
    }

    #[tokio::test]
    async fn test_rejected_upload_skips_report_and_cleanup() {
        let service = Arc::new(sample_service());
        let session = session_with(&service);

        let upload = Upload::new("notes.txt", "just some notes").with_mime_type("text/plain");
        let err = analyze(&session, upload, None, false, true).await.unwrap_err();

        assert!(format!("{err:#}").starts_with("analysis rejected"));
        assert_eq!(service.call_count(), 0);
        assert!(!session.is_processing());
    }

    #[tokio::test]
    async fn test_failed_run_still_cleans_up() {
        let service = Arc::new(sample_service().with_failure(
            Operation::ApplyInstruction,
            "escalation_risk",
            ServiceError::status(500, "model overloaded"),
        ));
        let session = session_with(&service);

        let err = analyze(&session, csv_upload(SAMPLE_CSV), None, false, true)
            .await
            .unwrap_err();

        assert!(err.to_string().starts_with("Analysis failed:"));
        assert_eq!(service.objects_for(Operation::DeleteObject).len(), 7);
        assert!(service.created().is_empty());
    }

    #[tokio::test]
    async fn test_completed_run_writes_export() {
        let service = Arc::new(sample_service());
        let session = session_with(&service);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        analyze(&session, csv_upload(SAMPLE_CSV), Some(&path), false, false)
            .await
            .unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("Ticket ID,Customer,Subject"));
        assert_eq!(service.objects_for(Operation::DeleteObject), Vec::<String>::new());
    }
}
