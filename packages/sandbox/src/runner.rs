// ABOUTME: Orchestrates one sandbox run: build, start, observe, analyze, classify, reclaim
// ABOUTME: Converts every failure into result fields; never returns an error to the caller

use crate::analyzer::{truncate_chars, LogAnalyzer};
use crate::classifier::{HealthClassifier, HealthSignals};
use crate::config::SandboxConfig;
use crate::environment::{mock_env, mock_env_names};
use crate::provisioner::DOCKERFILE_NAME;
use crate::reclaim::ReclaimGuard;
use crate::runtime::{
    ContainerRuntime, ContainerSpec, ContainerState, DockerConnector, ImageBuildSpec,
    RuntimeConnector, MANAGED_LABEL, RUN_ID_LABEL,
};
use crate::types::{Classification, HealthReport, InferredContext, SandboxResult, Severity};
use crate::SandboxError;
use chrono::Utc;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Final observation of a started container
struct Observation {
    state: ContainerState,
    logs: Vec<u8>,
    startup_time_ms: u64,
}

/// Runs untrusted repositories in capped, disposable containers.
///
/// Holds no per-run state; one runner can drive any number of concurrent runs.
#[derive(Clone)]
pub struct SandboxRunner {
    config: SandboxConfig,
    connector: Arc<dyn RuntimeConnector>,
}

impl SandboxRunner {
    pub fn new(config: SandboxConfig, connector: Arc<dyn RuntimeConnector>) -> Self {
        Self { config, connector }
    }

    /// Runner backed by the local Docker daemon
    pub fn docker(config: SandboxConfig) -> Self {
        let connector = Arc::new(DockerConnector::new(config.docker_timeout));
        Self::new(config, connector)
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Build and run the repository at `repo_root`, which must already contain
    /// a Dockerfile. Every image and container created here is removed before
    /// this returns.
    pub async fn run(&self, repo_root: &Path, context: &InferredContext) -> SandboxResult {
        let mut result = SandboxResult::pending(mock_env_names());
        let run_id = Uuid::new_v4().simple().to_string();
        info!(
            "Starting sandbox run {} for {} (language: '{}')",
            run_id,
            repo_root.display(),
            context.language
        );

        let runtime = match self.connector.connect().await {
            Ok(runtime) => runtime,
            Err(e) => {
                let message = if matches!(e, SandboxError::ClientInit(_)) {
                    e.to_string()
                } else {
                    SandboxError::ClientInit(e.to_string()).to_string()
                };
                error!("{}", message);
                result.errors.push(message);
                result.classification = Classification::SystemError;
                result.health.severity = Severity::Critical;
                result.finished_at = Utc::now();
                return result;
            }
        };

        let tag = format!("{}-{}", self.config.image_prefix, run_id);
        result.image_tag = tag.clone();

        let mut guard = ReclaimGuard::new(Arc::clone(&runtime));
        guard.track_image(tag.as_str());

        self.execute(
            runtime.as_ref(),
            repo_root,
            &tag,
            &run_labels(&run_id),
            &mut guard,
            &mut result,
        )
        .await;

        result.cleanup_warnings = guard.reclaim().await;
        result.finished_at = Utc::now();

        info!(
            "Sandbox run {} finished: {} ({:?})",
            run_id, result.classification, result.health.severity
        );
        result
    }

    async fn execute(
        &self,
        runtime: &dyn ContainerRuntime,
        repo_root: &Path,
        tag: &str,
        labels: &HashMap<String, String>,
        guard: &mut ReclaimGuard,
        result: &mut SandboxResult,
    ) {
        // Build
        let build_spec = ImageBuildSpec {
            context_dir: repo_root.to_path_buf(),
            dockerfile: DOCKERFILE_NAME.to_string(),
            tag: tag.to_string(),
            labels: labels.clone(),
        };

        let build_started = Instant::now();
        let build = timeout(self.config.build_timeout, runtime.build_image(&build_spec))
            .await
            .unwrap_or_else(|_| {
                Err(SandboxError::Timeout {
                    operation: "Image build".to_string(),
                    seconds: self.config.build_timeout.as_secs(),
                })
            });
        result.build.build_time_ms = elapsed_ms(build_started);

        match build {
            Ok(output) => {
                debug!("Build of {} produced {} log lines", tag, output.log.len());
                result.build.image_built = true;
            }
            Err(e) if e.is_build_rejection() => {
                warn!("Build of {} failed: {}", tag, e);
                result.build.build_errors.push(e.to_string());
                result.errors.push("Docker build failed".to_string());
                result.classification = Classification::BuildFailure;
                result.health.severity = Severity::Critical;
                return;
            }
            Err(e) => {
                error!("Docker system error during build of {}: {}", tag, e);
                result.errors.push(format!("Docker system error: {}", e));
                result.classification = Classification::SystemError;
                result.health.severity = Severity::Critical;
                return;
            }
        }

        // Start and observe under the execution limit
        let limit = self.config.execution_timeout;
        let observed = match timeout(limit, self.start_and_observe(runtime, tag, labels, guard))
            .await
        {
            Ok(observed) => observed,
            Err(_) => Err(SandboxError::Timeout {
                operation: "Execution".to_string(),
                seconds: limit.as_secs(),
            }),
        };

        match observed {
            Ok(observation) => self.record_observation(observation, result),
            Err(e) => {
                error!("Sandbox execution of {} failed: {}", tag, e);
                result.execution.status = match &e {
                    SandboxError::Timeout { .. } => "timeout",
                    _ => "system_error",
                }
                .to_string();
                result.errors.push(e.to_string());
                result.classification = Classification::SystemError;
                result.health.severity = Severity::Critical;
            }
        }
    }

    async fn start_and_observe(
        &self,
        runtime: &dyn ContainerRuntime,
        tag: &str,
        labels: &HashMap<String, String>,
        guard: &mut ReclaimGuard,
    ) -> crate::Result<Observation> {
        let (cpu_period, cpu_quota) = self.config.cpu_quota();
        let spec = ContainerSpec {
            name: tag.to_string(),
            image: tag.to_string(),
            env: mock_env(),
            labels: labels.clone(),
            cpu_period,
            cpu_quota,
            memory_bytes: self.config.memory_limit_bytes(),
        };

        // The daemon may create the container and answer after the deadline
        guard.track_container(spec.name.as_str());
        let container_id = runtime.create_container(&spec).await?;
        guard.track_container(container_id.as_str());

        runtime.start_container(&container_id).await?;
        let started = Instant::now();

        let state = self.wait_for_warmup(runtime, &container_id).await?;
        let startup_time_ms = elapsed_ms(started);

        let logs = runtime
            .container_logs(&container_id, self.config.log_max_bytes)
            .await?;

        Ok(Observation {
            state,
            logs,
            startup_time_ms,
        })
    }

    /// Poll until the process stops or the warm-up window closes; the last
    /// inspection is the final state.
    async fn wait_for_warmup(
        &self,
        runtime: &dyn ContainerRuntime,
        container_id: &str,
    ) -> crate::Result<ContainerState> {
        let deadline = Instant::now() + self.config.warmup;

        loop {
            let state = runtime.inspect_container(container_id).await?;
            if state.has_stopped() {
                debug!(
                    "Container {} stopped during warm-up (exit code {:?})",
                    container_id, state.exit_code
                );
                return Ok(state);
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(state);
            }
            sleep(self.config.poll_interval.min(deadline - now)).await;
        }
    }

    fn record_observation(&self, observation: Observation, result: &mut SandboxResult) {
        let Observation {
            state,
            logs,
            startup_time_ms,
        } = observation;

        let text = String::from_utf8_lossy(&logs);
        let analysis = LogAnalyzer::analyze(&text);
        let exposed_ports = state.exposed_ports();

        let verdict = HealthClassifier::assess(&HealthSignals {
            exit_code: state.exit_code,
            is_running: state.running,
            findings: &analysis.findings,
            detected_port: analysis.detected_port,
            exposed_ports: &exposed_ports,
        });

        result.execution.status = state.status;
        result.execution.exit_code = state.exit_code;
        result.execution.startup_time_ms = startup_time_ms;
        result.execution.logs.stdout = truncate_chars(&text, self.config.log_retain_chars);
        result.execution.port_bindings = state.port_bindings;

        result.health = HealthReport {
            process_alive: state.running,
            port_opened: !exposed_ports.is_empty(),
            detected_app_port: analysis.detected_port,
            docker_exposed_ports: exposed_ports,
            port_mismatch: verdict.port_mismatch,
            severity: verdict.severity,
        };

        result.classification = verdict.classification;
        result.errors.extend(verdict.errors);
        result.findings = analysis.findings;
    }
}

fn run_labels(run_id: &str) -> HashMap<String, String> {
    HashMap::from([
        (MANAGED_LABEL.to_string(), "true".to_string()),
        (RUN_ID_LABEL.to_string(), run_id.to_string()),
    ])
}

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}
