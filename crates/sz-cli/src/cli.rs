//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::OutputFormat;

/// Request log sessionizer.
///
/// Groups each client's requests into sessions separated by an inactivity
/// threshold and writes one summary line per session.
#[derive(Debug, Parser)]
#[command(name = "sessionize", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Sessionize log files and write session summaries.
    Run(RunArgs),

    /// Decode log files and report statistics without writing sessions.
    Check(CheckArgs),
}

/// Inactivity threshold sources, in priority order after the config file.
#[derive(Debug, Args)]
pub struct ThresholdArgs {
    /// Inactivity threshold in seconds (1-86400).
    #[arg(short, long, value_name = "SECS", conflicts_with = "inactivity_file")]
    pub inactivity: Option<i64>,

    /// File whose first line holds the inactivity threshold in seconds.
    #[arg(long, value_name = "PATH")]
    pub inactivity_file: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Log files to read, in timestamp order. Use `-` for stdin; `.gz` files
    /// are decompressed.
    #[arg(required = true, value_name = "INPUT")]
    pub inputs: Vec<PathBuf>,

    /// Where to write sessions (default: stdout).
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Append to the output file instead of truncating it.
    #[arg(long, requires = "output")]
    pub append: bool,

    #[command(flatten)]
    pub threshold: ThresholdArgs,

    /// Output format.
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Number of records decoded per batch.
    #[arg(long, value_name = "N")]
    pub batch_size: Option<usize>,

    /// Load all records and sessionize clients in parallel. Output is sorted
    /// by session start time.
    #[arg(long)]
    pub parallel: bool,
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Log files to read, in timestamp order.
    #[arg(required = true, value_name = "INPUT")]
    pub inputs: Vec<PathBuf>,

    #[command(flatten)]
    pub threshold: ThresholdArgs,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_run_with_all_options() {
        let cli = Cli::try_parse_from([
            "sessionize",
            "-v",
            "run",
            "a.csv",
            "b.csv.gz",
            "-o",
            "out.txt",
            "--append",
            "-i",
            "30",
            "--format",
            "jsonl",
            "--batch-size",
            "5",
            "--parallel",
        ])
        .unwrap();

        assert!(cli.verbose);
        let Some(Commands::Run(args)) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.inputs.len(), 2);
        assert_eq!(args.threshold.inactivity, Some(30));
        assert_eq!(args.format, Some(OutputFormat::Jsonl));
        assert_eq!(args.batch_size, Some(5));
        assert!(args.append);
        assert!(args.parallel);
    }

    #[test]
    fn inactivity_sources_conflict() {
        let result = Cli::try_parse_from([
            "sessionize",
            "run",
            "a.csv",
            "-i",
            "30",
            "--inactivity-file",
            "inactivity_period.txt",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn append_requires_output() {
        let result = Cli::try_parse_from(["sessionize", "run", "a.csv", "--append"]);
        assert!(result.is_err());
    }

    #[test]
    fn run_requires_input() {
        assert!(Cli::try_parse_from(["sessionize", "run"]).is_err());
    }
}
