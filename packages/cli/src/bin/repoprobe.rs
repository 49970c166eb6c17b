use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::process;

mod cli;

use repoprobe_cli::logging::init_tracing;

#[derive(Parser)]
#[command(name = "repoprobe")]
#[command(about = "repoprobe - run untrusted repositories in a disposable container and classify their health")]
#[command(version)]
struct Cli {
    /// Enable debug logging (overrides RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build, run and classify a repository
    Analyze {
        /// Repository root
        path: PathBuf,
        #[command(flatten)]
        context: cli::ContextArgs,
        #[command(flatten)]
        limits: cli::sandbox::LimitArgs,
        /// Print a colored summary instead of JSON
        #[arg(long)]
        summary: bool,
        /// Exit with status 2 when the run is classified as critical
        #[arg(long)]
        fail_on_critical: bool,
    },
    /// Locate or generate the Dockerfile without running anything
    Provision {
        /// Repository root
        path: PathBuf,
        #[command(flatten)]
        context: cli::ContextArgs,
    },
    /// Analyze a captured log file (or stdin) for error signatures and ports
    AnalyzeLogs {
        /// Log file; reads stdin when omitted
        file: Option<PathBuf>,
    },
    /// Remove images and containers left behind by interrupted runs
    Cleanup,
}

#[tokio::main]
async fn main() {
    // A missing .env is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match handle_command(cli.command).await {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            process::exit(1);
        }
    }
}

async fn handle_command(command: Commands) -> anyhow::Result<i32> {
    match command {
        Commands::Analyze {
            path,
            context,
            limits,
            summary,
            fail_on_critical,
        } => cli::sandbox::analyze_command(path, context, limits, summary, fail_on_critical).await,
        Commands::Provision { path, context } => {
            cli::sandbox::provision_command(path, context).map(|_| 0)
        }
        Commands::AnalyzeLogs { file } => cli::logs::analyze_logs_command(file).map(|_| 0),
        Commands::Cleanup => cli::sandbox::cleanup_command().await.map(|_| 0),
    }
}
