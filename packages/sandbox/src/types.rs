// ABOUTME: Data model shared by the provisioner, runner and facade
// ABOUTME: Requests, findings, health reports and the serialized SandboxResult

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Language and start command inferred by an upstream classifier.
/// Both fields are untrusted free text and may be empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InferredContext {
    #[serde(default)]
    pub language: String,
    #[serde(default, alias = "startInstruction")]
    pub start_instruction: String,
}

impl InferredContext {
    pub fn new(language: impl Into<String>, start_instruction: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            start_instruction: start_instruction.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SandboxRequest {
    pub repo_root: PathBuf,
    pub context: InferredContext,
}

impl SandboxRequest {
    pub fn new(repo_root: impl Into<PathBuf>, context: InferredContext) -> Self {
        Self {
            repo_root: repo_root.into(),
            context,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DockerfileSource {
    Existing,
    Generated,
    Error,
}

impl DockerfileSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DockerfileSource::Existing => "existing",
            DockerfileSource::Generated => "generated",
            DockerfileSource::Error => "error",
        }
    }
}

/// Outcome of making sure a Dockerfile exists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionResult {
    pub source: DockerfileSource,
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One error signature that fired on the container output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFinding {
    pub label: String,
    pub detail: String,
}

impl fmt::Display for LogFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.label, self.detail)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Ok,
    Warning,
    Critical,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    BuildFailure,
    CrashedOnStart,
    UnhealthyRuntimeErrors,
    RunningPortMismatch,
    HealthyVerifiedPort,
    RunningBlindPorts,
    RunningNoPortDetected,
    ExitedCleanly,
    SystemError,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::BuildFailure => "build_failure",
            Classification::CrashedOnStart => "crashed_on_start",
            Classification::UnhealthyRuntimeErrors => "unhealthy_runtime_errors",
            Classification::RunningPortMismatch => "running_port_mismatch",
            Classification::HealthyVerifiedPort => "healthy_verified_port",
            Classification::RunningBlindPorts => "running_blind_ports",
            Classification::RunningNoPortDetected => "running_no_port_detected",
            Classification::ExitedCleanly => "exited_cleanly",
            Classification::SystemError => "system_error",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runtime-assigned mapping of a container port to a host port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortBinding {
    pub container_port: u16,
    pub host_port: Option<u16>,
    pub protocol: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    pub image_built: bool,
    pub build_time_ms: u64,
    pub build_errors: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLogs {
    pub stdout: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionInfo {
    pub status: String,
    pub exit_code: Option<i64>,
    pub startup_time_ms: u64,
    pub logs: ExecutionLogs,
    pub port_bindings: Vec<PortBinding>,
}

impl Default for ExecutionInfo {
    fn default() -> Self {
        Self {
            status: "pending".to_string(),
            exit_code: None,
            startup_time_ms: 0,
            logs: ExecutionLogs::default(),
            port_bindings: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub process_alive: bool,
    pub port_opened: bool,
    pub detected_app_port: Option<u16>,
    pub docker_exposed_ports: Vec<u16>,
    pub port_mismatch: bool,
    pub severity: Severity,
}

impl Default for HealthReport {
    fn default() -> Self {
        Self {
            process_alive: false,
            port_opened: false,
            detected_app_port: None,
            docker_exposed_ports: Vec::new(),
            port_mismatch: false,
            severity: Severity::Unknown,
        }
    }
}

/// Complete record of one sandbox run. The only type that leaves this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SandboxResult {
    pub dockerfile_source: DockerfileSource,
    /// Unique tag of the ephemeral image; empty when no client was acquired
    pub image_tag: String,
    pub build: BuildInfo,
    pub execution: ExecutionInfo,
    pub health: HealthReport,
    pub classification: Classification,
    pub findings: Vec<LogFinding>,
    pub errors: Vec<String>,
    pub cleanup_warnings: Vec<String>,
    pub env_injected: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SandboxResult {
    /// Blank result for a run that has not reached any terminal state yet
    pub fn pending(env_injected: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            dockerfile_source: DockerfileSource::Existing,
            image_tag: String::new(),
            build: BuildInfo::default(),
            execution: ExecutionInfo::default(),
            health: HealthReport::default(),
            classification: Classification::SystemError,
            findings: Vec::new(),
            errors: Vec::new(),
            cleanup_warnings: Vec::new(),
            env_injected,
            started_at: now,
            finished_at: now,
        }
    }
}
