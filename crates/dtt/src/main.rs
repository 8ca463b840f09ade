mod approve;
mod config;

use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;

use dtt_core::{
    Approver, AutoApprove, OutputSink, PipelineError, PipelineRunner, RunContext, RunReport,
};
use dtt_git::{DiffChange, DiffCollector, DiffRange};
use dtt_logging::{LogFormat, Logger};
use dtt_testgen::{TestGenerator, TestPrompts};

use crate::approve::PromptApprover;
use crate::config::{FileConfig, Settings};

#[derive(Parser, Debug)]
#[command(
    name = "dtt",
    about = "Generate pytest tests for the Python files changed in a git diff",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Repository to read (default: current directory)
    #[arg(short = 'd', long, global = true)]
    working_dir: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty", global = true)]
    log_format: LogFormatChoice,

    /// Also append JSON log lines to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Show debug diagnostics
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output the final report as JSON
    #[arg(long, global = true)]
    json_output: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate tests for uncommitted changes (staged and unstaged) against HEAD
    Current {
        #[command(flatten)]
        args: GenerateArgs,
    },

    /// Generate tests for the changes between two commits
    Range {
        /// Older side of the range
        commit_a: String,

        /// Newer side of the range (default: HEAD)
        commit_b: Option<String>,

        #[command(flatten)]
        args: GenerateArgs,
    },
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Cloud project id (env: DTT_PROJECT_ID)
    #[arg(short, long)]
    project: Option<String>,

    /// Vertex AI region (env: DTT_REGION)
    #[arg(short, long)]
    region: Option<String>,

    /// Model name (env: DTT_MODEL)
    #[arg(short, long)]
    model: Option<String>,

    /// Write tests under this directory instead of printing them
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Confirm each file before calling the model
    #[arg(short, long)]
    interactive: bool,

    /// Only consider changes under this path
    #[arg(short, long)]
    target: Option<String>,

    /// Ask before processing more files than this
    #[arg(long)]
    max_files: Option<usize>,

    /// Skip files whose diff is larger than this many bytes
    #[arg(long)]
    max_diff_bytes: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// List the files that would be sent without calling the model
    #[arg(long)]
    dry_run: bool,
}

impl GenerateArgs {
    fn flags(&self) -> FileConfig {
        FileConfig {
            project: self.project.clone(),
            region: self.region.clone(),
            model: self.model.clone(),
            output_dir: self.output_dir.clone(),
            max_files: self.max_files,
            max_diff_bytes: self.max_diff_bytes,
            timeout_secs: self.timeout,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatChoice {
    Pretty,
    Json,
    Compact,
}

impl From<LogFormatChoice> for LogFormat {
    fn from(choice: LogFormatChoice) -> Self {
        match choice {
            LogFormatChoice::Pretty => LogFormat::Pretty,
            LogFormatChoice::Json => LogFormat::Json,
            LogFormatChoice::Compact => LogFormat::Compact,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            let (message, code) = match e.downcast_ref::<PipelineError>() {
                Some(pipeline) => (pipeline.to_string(), pipeline.exit_code()),
                None => (format!("{:#}", e), 7),
            };
            eprintln!("{} {}", "error:".bright_red().bold(), message);
            code
        }
    };

    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<i32> {
    let working_dir = match cli.working_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    let log_format: LogFormat = cli.log_format.into();
    dtt_logging::init_tracing(if cli.verbose { "debug" } else { "warn" }, log_format);

    let logger = match &cli.log_file {
        Some(path) => Logger::with_file(log_format, path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?,
        None => Logger::new(log_format),
    };

    let (range, args) = match &cli.command {
        Commands::Current { args } => (DiffRange::WorkingTree, args),
        Commands::Range {
            commit_a,
            commit_b,
            args,
        } => (DiffRange::commits(commit_a.clone(), commit_b.clone()), args),
    };

    let settings = Settings::load(args.flags(), &working_dir)
        .map_err(|e| PipelineError::Configuration(format!("{:#}", e)))?;

    let collector = DiffCollector::new(&working_dir).with_target(args.target.clone());

    if args.dry_run {
        let changes = collector.collect(&range).map_err(PipelineError::from)?;
        print_dry_run(&range, &changes, cli.json_output)?;
        return Ok(0);
    }

    let client = dtt_ai::create_client().map_err(PipelineError::from)?;
    let generator = TestGenerator::new(
        client.as_ref(),
        TestPrompts::new().with_max_diff_bytes(settings.max_diff_bytes),
    );

    let sink = match &settings.output_dir {
        Some(dir) => OutputSink::directory(dir),
        None => OutputSink::stdout(),
    };

    let approver: Box<dyn Approver> = if args.interactive {
        Box::new(PromptApprover)
    } else {
        Box::new(AutoApprove)
    };

    // Project and region are only required once a file needs the model
    let context = match settings.ai_config() {
        Ok(config) => RunContext::new(range, config),
        Err(PipelineError::Configuration(problem)) => RunContext::without_model(range, problem),
        Err(e) => return Err(e.into()),
    }
    .with_max_files(settings.max_files);
    let runner = PipelineRunner::new(
        collector,
        generator,
        sink,
        approver.as_ref(),
        Arc::new(logger),
    );

    // Handle Ctrl+C gracefully
    let interrupt_handle = runner.interrupt_handle();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted. Finishing current file...");
        interrupt_handle.store(true, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl+C handler")?;

    let report = runner.run(&context).await?;

    if cli.json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_failures(&report);
    }

    Ok(report.exit_code())
}

fn print_dry_run(range: &DiffRange, changes: &[DiffChange], json: bool) -> Result<()> {
    if json {
        let files: Vec<serde_json::Value> = changes
            .iter()
            .map(|c| {
                serde_json::json!({
                    "path": c.path,
                    "kind": c.kind,
                    "insertions": c.insertions(),
                    "deletions": c.deletions(),
                    "diff_bytes": c.diff.len(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&files)?);
        return Ok(());
    }

    eprintln!("=== Dry Run ({}) ===", range);
    if changes.is_empty() {
        eprintln!("No changed source files.");
    }
    for change in changes {
        println!(
            "{} ({}, +{} -{})",
            change.path,
            change.kind,
            change.insertions(),
            change.deletions()
        );
    }
    Ok(())
}

fn print_failures(report: &RunReport) {
    for outcome in &report.files {
        if let dtt_core::FileOutcome::Failed { source, error } = outcome {
            eprintln!("{} {}: {}", "failed:".bright_red(), source, error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_range_second_commit_is_optional() {
        let cli = Cli::try_parse_from(["dtt", "range", "abc123"]).unwrap();
        match cli.command {
            Commands::Range {
                commit_a, commit_b, ..
            } => {
                assert_eq!(commit_a, "abc123");
                assert_eq!(commit_b, None);
            }
            other => panic!("expected range, got {:?}", other),
        }
    }

    #[test]
    fn test_range_with_shared_flags() {
        let cli = Cli::try_parse_from([
            "dtt",
            "range",
            "main",
            "feature",
            "-p",
            "my-project",
            "-r",
            "europe-west4",
            "-o",
            "generated",
            "-t",
            "pkg",
            "--interactive",
        ])
        .unwrap();

        let Commands::Range {
            commit_a,
            commit_b,
            args,
        } = cli.command
        else {
            panic!("expected range subcommand");
        };
        assert_eq!(commit_a, "main");
        assert_eq!(commit_b.as_deref(), Some("feature"));
        assert_eq!(args.project.as_deref(), Some("my-project"));
        assert_eq!(args.region.as_deref(), Some("europe-west4"));
        assert_eq!(args.output_dir, Some(PathBuf::from("generated")));
        assert_eq!(args.target.as_deref(), Some("pkg"));
        assert!(args.interactive);
    }

    #[test]
    fn test_current_accepts_the_same_flags() {
        let cli = Cli::try_parse_from([
            "dtt",
            "current",
            "--project",
            "p",
            "--region",
            "us-central1",
            "--model",
            "gemini-pro",
            "--output-dir",
            "out",
            "--target",
            "src",
            "-i",
            "--max-files",
            "3",
            "--dry-run",
        ])
        .unwrap();

        let Commands::Current { args } = cli.command else {
            panic!("expected current subcommand");
        };
        let flags = args.flags();
        assert_eq!(flags.project.as_deref(), Some("p"));
        assert_eq!(flags.region.as_deref(), Some("us-central1"));
        assert_eq!(flags.model.as_deref(), Some("gemini-pro"));
        assert_eq!(flags.output_dir, Some(PathBuf::from("out")));
        assert_eq!(flags.max_files, Some(3));
        assert_eq!(args.target.as_deref(), Some("src"));
        assert!(args.interactive);
        assert!(args.dry_run);
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "dtt",
            "current",
            "-d",
            "/tmp/repo",
            "--json-output",
            "--log-format",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.working_dir, Some(PathBuf::from("/tmp/repo")));
        assert!(cli.json_output);
        assert!(matches!(cli.log_format, LogFormatChoice::Json));
    }

    #[test]
    fn test_range_requires_a_commit() {
        assert!(Cli::try_parse_from(["dtt", "range"]).is_err());
    }
}
