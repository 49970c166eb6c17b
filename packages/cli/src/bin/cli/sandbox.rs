// ABOUTME: CLI commands that drive the runtime sandbox (analyze, provision, cleanup)
// ABOUTME: Prints results as JSON on stdout; logs and errors go to stderr

use super::ContextArgs;
use anyhow::{Context, Result};
use clap::Args;
use colored::*;
use repoprobe_cli::report::render_summary;
use repoprobe_sandbox::config::{MAX_MEMORY_LIMIT_MB, MIN_MEMORY_LIMIT_MB};
use repoprobe_sandbox::reclaim::sweep_labelled;
use repoprobe_sandbox::runtime::{DockerRuntime, MANAGED_LABEL};
use repoprobe_sandbox::{
    DockerfileProvisioner, RuntimeSandbox, SandboxConfig, SandboxRequest, SandboxRunner,
    Severity,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Flags overriding REPOPROBE_* limits for a single run
#[derive(Args, Debug)]
pub struct LimitArgs {
    /// Fraction of one CPU core
    #[arg(long)]
    pub cpu: Option<f64>,
    /// Memory limit in MiB
    #[arg(long)]
    pub memory_mb: Option<u64>,
    /// Maximum warm-up wait in seconds
    #[arg(long)]
    pub warmup_secs: Option<u64>,
    /// Hard limit on start + observe in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

impl LimitArgs {
    fn apply(&self, mut config: SandboxConfig) -> SandboxConfig {
        if let Some(cpu) = self.cpu.filter(|cpu| *cpu > 0.0) {
            config.cpu_limit = cpu;
        }
        if let Some(memory_mb) = self.memory_mb {
            config.memory_limit_mb =
                memory_mb.clamp(MIN_MEMORY_LIMIT_MB, MAX_MEMORY_LIMIT_MB);
        }
        if let Some(warmup) = self.warmup_secs {
            config.warmup = Duration::from_secs(warmup);
        }
        if let Some(timeout) = self.timeout_secs.filter(|t| *t > 0) {
            config.execution_timeout = Duration::from_secs(timeout);
        }
        config
    }
}

pub async fn analyze_command(
    path: PathBuf,
    context: ContextArgs,
    limits: LimitArgs,
    summary: bool,
    fail_on_critical: bool,
) -> Result<i32> {
    let repo_root = path
        .canonicalize()
        .with_context(|| format!("Repository path {} is not accessible", path.display()))?;
    let context = context.load()?;
    let config = limits.apply(SandboxConfig::from_env());
    debug!("Sandbox configuration: {:?}", config);

    let sandbox = RuntimeSandbox::new(SandboxRunner::docker(config));
    let result = sandbox
        .analyze(&SandboxRequest::new(repo_root, context))
        .await;

    if summary {
        print!("{}", render_summary(&result));
    } else {
        println!("{}", serde_json::to_string_pretty(&result)?);
    }

    if fail_on_critical && result.health.severity == Severity::Critical {
        return Ok(2);
    }
    Ok(0)
}

pub fn provision_command(path: PathBuf, context: ContextArgs) -> Result<()> {
    let context = context.load()?;
    let provisioned = DockerfileProvisioner::provision(&path, &context);
    println!("{}", serde_json::to_string_pretty(&provisioned)?);
    Ok(())
}

pub async fn cleanup_command() -> Result<()> {
    let config = SandboxConfig::from_env();
    let runtime = DockerRuntime::connect(config.docker_timeout).await?;

    let (found, warnings) = sweep_labelled(&runtime, &format!("{}=true", MANAGED_LABEL)).await?;

    println!(
        "{} Removed {} container(s) and {} image(s)",
        "✓".green(),
        found.containers.len(),
        found.images.len()
    );
    for warning in warnings {
        eprintln!("{} {}", "⚠".yellow(), warning);
    }
    Ok(())
}
