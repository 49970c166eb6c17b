// ABOUTME: Single entry point combining Dockerfile provisioning and the sandbox run
// ABOUTME: Provisioning errors are recorded but never stop the run

use crate::config::SandboxConfig;
use crate::provisioner::DockerfileProvisioner;
use crate::runner::SandboxRunner;
use crate::types::{DockerfileSource, SandboxRequest, SandboxResult};
use tracing::{info, warn};

#[derive(Clone)]
pub struct RuntimeSandbox {
    runner: SandboxRunner,
}

impl RuntimeSandbox {
    pub fn new(runner: SandboxRunner) -> Self {
        Self { runner }
    }

    /// Sandbox using the local Docker daemon and configuration from the environment
    pub fn from_env() -> Self {
        Self::new(SandboxRunner::docker(SandboxConfig::from_env()))
    }

    pub fn runner(&self) -> &SandboxRunner {
        &self.runner
    }

    /// Provision a Dockerfile if needed, then build, run and classify the repository
    pub async fn analyze(&self, request: &SandboxRequest) -> SandboxResult {
        info!("Analyzing {}", request.repo_root.display());

        let provisioned = DockerfileProvisioner::provision(&request.repo_root, &request.context);
        if let Some(error) = &provisioned.error {
            warn!("Continuing without a provisioned Dockerfile: {}", error);
        }

        let mut result = self
            .runner
            .run(&request.repo_root, &request.context)
            .await;

        result.dockerfile_source = provisioned.source;
        if provisioned.source == DockerfileSource::Error {
            let detail = provisioned.error.as_deref().unwrap_or("unknown error");
            result
                .errors
                .insert(0, format!("Dockerfile generation failed: {}", detail));
        }

        result
    }
}
