use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Top-level CLI parser for the `ticketflow` binary.
#[derive(Debug, Parser)]
#[command(
    name = "ticketflow",
    version,
    about = "Analyze customer support ticket exports with a hosted prompt service"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (TOML); `TICKETFLOW_*` variables override it
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the seven-stage analysis on a CSV export
    Analyze {
        /// The ticket export to analyze
        file: PathBuf,

        /// Write the analyzed tickets as CSV to this path
        #[arg(short, long)]
        export: Option<PathBuf>,

        /// Print the retained results as JSON
        #[arg(long)]
        raw: bool,

        /// Delete the remote objects once the run ends
        #[arg(long)]
        cleanup: bool,
    },

    /// Delete every remote object the pipeline can create
    Cleanup,

    /// Print the stages and their dependencies
    Stages,
}

#[cfg(test)]
mod tests {
    use super::{Cli, Commands};
    use clap::{CommandFactory, Parser};

    #[test]
    fn clap_command_tree_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn analyze_parses_flags() {
        let cli = Cli::try_parse_from([
            "ticketflow",
            "--config",
            "ticketflow.toml",
            "analyze",
            "tickets.csv",
            "--export",
            "out.csv",
            "--cleanup",
            "-v",
        ])
        .unwrap();

        assert!(cli.verbose);
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("ticketflow.toml")));
        let Commands::Analyze {
            file,
            export,
            raw,
            cleanup,
        } = cli.command
        else {
            panic!("expected analyze");
        };
        assert_eq!(file, std::path::PathBuf::from("tickets.csv"));
        assert!(export.is_some());
        assert!(!raw);
        assert!(cleanup);
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["ticketflow", "-q", "-v", "stages"]).is_err());
    }
}
