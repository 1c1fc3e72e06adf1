//! claimcheck CLI: runs the hallucination detection pipeline over a model's
//! claims, with scripted fixture back-ends or live verifier and knowledge APIs.

mod commands;
mod fixtures;
mod report;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// claimcheck: claim-level hallucination detection
#[derive(Parser, Debug)]
#[command(name = "claimcheck", version, about, long_about = None)]
struct Cli {
    /// Workspace directory (reads .claimcheck/config.toml from here)
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Verify and score a response's claims
    Analyze(AnalyzeArgs),
    /// Compare verdicts against manual annotations (precision, recall, F1)
    Evaluate(EvaluateArgs),
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args, Debug)]
struct AnalyzeArgs {
    /// Claims to check, one per argument
    claims: Vec<String>,

    /// Read additional claims from a file, one per line
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Model that wrote the response; it never verifies its own claims
    #[arg(short, long, default_value = "")]
    exclude: String,

    /// Print the full result as JSON
    #[arg(long)]
    json: bool,

    /// Show the per-claim scoring breakdown
    #[arg(long)]
    breakdown: bool,

    #[command(flatten)]
    backend: Backend,
}

#[derive(clap::Args, Debug)]
struct EvaluateArgs {
    /// Annotated dataset (JSON)
    dataset: PathBuf,

    /// Print metrics as JSON
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    backend: Backend,
}

/// Back-end selection and per-run configuration overrides.
#[derive(clap::Args, Debug)]
struct Backend {
    /// Scripted verifiers and knowledge sources (JSON)
    #[arg(long, conflicts_with = "live")]
    fixtures: Option<PathBuf>,

    /// Call the configured verifier APIs, Wikidata and DBpedia
    #[arg(long)]
    live: bool,

    /// Skip the external knowledge-graph check
    #[arg(long)]
    no_external: bool,

    /// Cross-model weight
    #[arg(long)]
    alpha: Option<f64>,

    /// External evidence weight
    #[arg(long)]
    beta: Option<f64>,

    /// Context weight
    #[arg(long)]
    gamma: Option<f64>,

    /// Per-source consensus threshold
    #[arg(long)]
    threshold: Option<f64>,
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Create default configuration file
    Init,
    /// Show current configuration
    Show,
    /// Check configuration values
    Validate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let level = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("CLAIMCHECK_LOG").unwrap_or_else(|_| EnvFilter::new(level));

    let fmt_layer = if cli.log_json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let sources = commands::ConfigSources::new(workspace, cli.config);
    commands::handle_command(cli.command, &sources).await
}
