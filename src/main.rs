//! genwatch - AI generation activity detector
//!
//! Watches editor signals and a self-reported status file to decide when an
//! AI assistant is generating, and tells a presentation surface to show or
//! hide accordingly.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

// Re-export from library
pub use genwatch::*;

mod cli;

/// genwatch - detect when your AI assistant is generating
#[derive(Parser)]
#[command(name = "genwatch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Settings file (defaults to <config dir>/genwatch/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Workspace root the sentinel path is resolved against
    #[arg(short, long, global = true)]
    workspace: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the detection daemon
    Start {
        /// Do not read editor events from stdin
        #[arg(long)]
        no_stdin: bool,
    },

    /// Stop the running daemon
    Stop,

    /// Show daemon and sentinel status
    Status,

    /// Write a self-reported status into the sentinel file
    Report {
        /// working or idle
        status: SelfReportedStatus,
    },

    /// Create the sentinel file if it does not exist
    Init,

    /// Score a sample editor event (JSON) or self-report against the scorers
    Score {
        /// e.g. '{"type":"document_change","uri":"file:///a.rs","inserted":80}'
        input: String,
    },

    /// Print the effective settings
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging. stdout is reserved for notifications.
    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let ctx = cli::Context::new(cli.config, cli.workspace)?;

    match cli.command {
        Commands::Start { no_stdin } => cli::start::run(&ctx, !no_stdin).await?,
        Commands::Stop => cli::stop::run().await?,
        Commands::Status => cli::status::run(&ctx).await?,
        Commands::Report { status } => cli::report::run(&ctx, status).await?,
        Commands::Init => cli::init::run(&ctx).await?,
        Commands::Score { input } => cli::score::run(&ctx, &input).await?,
        Commands::Config => cli::config::run(&ctx).await?,
    }

    Ok(())
}
