// ABOUTME: Runtime sandbox for untrusted repositories
// ABOUTME: Provisions a Dockerfile, runs the repo in a capped container and classifies its health

pub mod analyzer;
pub mod classifier;
pub mod config;
pub mod environment;
pub mod error;
pub mod provisioner;
pub mod reclaim;
pub mod runner;
pub mod runtime;
pub mod sandbox;
pub mod templates;
pub mod types;

pub use analyzer::{LogAnalysis, LogAnalyzer};
pub use classifier::{classify, HealthClassifier, HealthSignals, HealthVerdict};
pub use config::SandboxConfig;
pub use error::{Result, SandboxError};
pub use provisioner::{sanitize_start_command, DockerfileProvisioner};
pub use runner::SandboxRunner;
pub use runtime::{ContainerRuntime, DockerConnector, DockerRuntime, RuntimeConnector};
pub use sandbox::RuntimeSandbox;
pub use types::{
    Classification, DockerfileSource, HealthReport, InferredContext, LogFinding, PortBinding,
    ProvisionResult, SandboxRequest, SandboxResult, Severity,
};
