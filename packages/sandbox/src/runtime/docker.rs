// ABOUTME: Docker implementation of the container runtime trait
// ABOUTME: Uses bollard to build images from a tarred context and manage capped containers

use super::{
    BuildOutput, ContainerRuntime, ContainerSpec, ContainerState, ImageBuildSpec,
    LabelledResources, RuntimeConnector,
};
use crate::types::PortBinding;
use crate::{Result, SandboxError};
use repoprobe_config::constants::DOCKER_HOST;
use async_trait::async_trait;
use bollard::{
    container::{
        Config, CreateContainerOptions, ListContainersOptions, LogOutput, LogsOptions,
        RemoveContainerOptions, StartContainerOptions, StopContainerOptions,
    },
    errors::Error as BollardError,
    image::{BuildImageOptions, ListImagesOptions, RemoveImageOptions},
    models::{ContainerInspectResponse, HostConfig, RestartPolicy, RestartPolicyNameEnum},
    Docker,
};
use futures::StreamExt;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

pub struct DockerRuntime {
    client: Docker,
}

impl DockerRuntime {
    /// Connect using DOCKER_HOST or the platform default socket/pipe and verify with a ping.
    /// `timeout` applies to every request made through this client.
    pub async fn connect(timeout: Duration) -> Result<Self> {
        debug!(
            "Connecting to Docker ({}={})",
            DOCKER_HOST,
            std::env::var(DOCKER_HOST).unwrap_or_else(|_| "<platform default>".to_string())
        );
        let client = Docker::connect_with_local_defaults()
            .map_err(|e| SandboxError::ClientInit(e.to_string()))?
            .with_timeout(timeout);

        client.ping().await.map_err(|e| {
            error!("Failed to connect to Docker daemon: {}", e);
            SandboxError::ClientInit(e.to_string())
        })?;

        info!("Connected to Docker daemon (timeout: {:?})", timeout);
        Ok(Self { client })
    }

    /// Wrap an existing client without pinging it
    pub fn with_client(client: Docker) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn build_image(&self, spec: &ImageBuildSpec) -> Result<BuildOutput> {
        info!(
            "Building image {} from {}",
            spec.tag,
            spec.context_dir.display()
        );

        let context_dir = spec.context_dir.clone();
        let context = tokio::task::spawn_blocking(move || create_build_context(&context_dir))
            .await
            .map_err(|e| SandboxError::Runtime(format!("Build context task failed: {}", e)))??;
        debug!("Build context for {} is {} bytes", spec.tag, context.len());

        let options = BuildImageOptions {
            dockerfile: spec.dockerfile.clone(),
            t: spec.tag.clone(),
            rm: true,
            forcerm: true,
            labels: spec.labels.clone(),
            ..Default::default()
        };

        let mut stream = self.client.build_image(options, None, Some(context.into()));
        let mut output = BuildOutput::default();

        while let Some(item) = stream.next().await {
            let info = item.map_err(build_error)?;
            if let Some(error) = info.error {
                return Err(SandboxError::BuildFailed(error));
            }
            if let Some(line) = info.stream {
                let line = line.trim_end();
                if !line.is_empty() {
                    debug!("[build {}] {}", spec.tag, line);
                    output.log.push(line.to_string());
                }
            }
        }

        info!("Built image {}", spec.tag);
        Ok(output)
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String> {
        debug!("Creating container {} from {}", spec.name, spec.image);

        let env: Vec<String> = spec
            .env
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();

        // No binds, no privileges: the build context is the only host data inside
        let host_config = HostConfig {
            memory: Some(spec.memory_bytes),
            memory_swap: Some(spec.memory_bytes),
            cpu_period: Some(spec.cpu_period),
            cpu_quota: Some(spec.cpu_quota),
            publish_all_ports: Some(true),
            privileged: Some(false),
            security_opt: Some(vec!["no-new-privileges".to_string()]),
            restart_policy: Some(RestartPolicy {
                name: Some(RestartPolicyNameEnum::NO),
                maximum_retry_count: Some(0),
            }),
            ..Default::default()
        };

        let config = Config {
            image: Some(spec.image.clone()),
            env: Some(env),
            labels: Some(spec.labels.clone()),
            host_config: Some(host_config),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            tty: Some(false),
            ..Default::default()
        };

        let options = CreateContainerOptions {
            name: spec.name.clone(),
            platform: None,
        };

        let response = self
            .client
            .create_container(Some(options), config)
            .await
            .map_err(|e| {
                error!("Failed to create container {}: {}", spec.name, e);
                SandboxError::ContainerStartFailed(e.to_string())
            })?;

        info!("Created container {} ({})", spec.name, response.id);
        Ok(response.id)
    }

    async fn start_container(&self, container_id: &str) -> Result<()> {
        self.client
            .start_container(container_id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| {
                error!("Failed to start container {}: {}", container_id, e);
                SandboxError::ContainerStartFailed(e.to_string())
            })?;

        info!("Started container {}", container_id);
        Ok(())
    }

    async fn inspect_container(&self, container_id: &str) -> Result<ContainerState> {
        let inspect = self.client.inspect_container(container_id, None).await?;

        let state = inspect.state.as_ref().ok_or_else(|| {
            SandboxError::Runtime("Container has no state information".to_string())
        })?;

        let status = state
            .status
            .as_ref()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "unknown".to_string());

        Ok(ContainerState {
            status,
            running: state.running.unwrap_or(false),
            exit_code: state.exit_code,
            port_bindings: port_bindings(&inspect),
        })
    }

    async fn container_logs(&self, container_id: &str, max_bytes: usize) -> Result<Vec<u8>> {
        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            follow: false,
            tail: "all".to_string(),
            ..Default::default()
        };

        let mut stream = self.client.logs(container_id, Some(options));
        let mut collected = Vec::new();

        while let Some(chunk) = stream.next().await {
            let message = match chunk? {
                LogOutput::StdOut { message }
                | LogOutput::StdErr { message }
                | LogOutput::Console { message } => message,
                LogOutput::StdIn { .. } => continue,
            };

            let remaining = max_bytes.saturating_sub(collected.len());
            collected.extend_from_slice(&message[..message.len().min(remaining)]);
            if collected.len() >= max_bytes {
                debug!(
                    "Log capture for {} reached {} bytes, truncating",
                    container_id, max_bytes
                );
                break;
            }
        }

        Ok(collected)
    }

    async fn stop_container(&self, container_id: &str, timeout_secs: u64) -> Result<()> {
        let options = StopContainerOptions {
            t: timeout_secs as i64,
        };

        match self.client.stop_container(container_id, Some(options)).await {
            Ok(_) => {
                debug!("Stopped container {}", container_id);
                Ok(())
            }
            // 304: already stopped, 404: already gone
            Err(BollardError::DockerResponseServerError {
                status_code: 304 | 404,
                ..
            }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn remove_container(&self, container_id: &str) -> Result<()> {
        let options = RemoveContainerOptions {
            force: true,
            v: true,
            ..Default::default()
        };

        match self
            .client
            .remove_container(container_id, Some(options))
            .await
        {
            Ok(_) => {
                debug!("Removed container {}", container_id);
                Ok(())
            }
            Err(e) if is_not_found(&e) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn remove_image(&self, tag: &str) -> Result<()> {
        let options = RemoveImageOptions {
            force: true,
            ..Default::default()
        };

        match self.client.remove_image(tag, Some(options), None).await {
            Ok(_) => {
                debug!("Removed image {}", tag);
                Ok(())
            }
            Err(e) if is_not_found(&e) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_labelled(&self, label: &str) -> Result<LabelledResources> {
        let filters = HashMap::from([("label".to_string(), vec![label.to_string()])]);

        let containers = self
            .client
            .list_containers(Some(ListContainersOptions {
                all: true,
                filters: filters.clone(),
                ..Default::default()
            }))
            .await?
            .into_iter()
            .filter_map(|container| container.id)
            .collect();

        let images = self
            .client
            .list_images(Some(ListImagesOptions {
                all: true,
                filters,
                ..Default::default()
            }))
            .await?
            .into_iter()
            .map(|image| image.id)
            .collect();

        Ok(LabelledResources { images, containers })
    }
}

/// Connects a fresh Docker client per sandbox run
pub struct DockerConnector {
    timeout: Duration,
}

impl DockerConnector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl RuntimeConnector for DockerConnector {
    async fn connect(&self) -> Result<Arc<dyn ContainerRuntime>> {
        let runtime = DockerRuntime::connect(self.timeout).await?;
        Ok(Arc::new(runtime))
    }
}

/// Errors the daemon reports about the build itself are build failures;
/// anything else is a transport problem.
fn build_error(e: BollardError) -> SandboxError {
    match e {
        BollardError::DockerStreamError { error } => SandboxError::BuildFailed(error),
        BollardError::DockerResponseServerError { message, .. } => {
            SandboxError::BuildFailed(message)
        }
        other => SandboxError::Docker(other),
    }
}

fn is_not_found(e: &BollardError) -> bool {
    matches!(
        e,
        BollardError::DockerResponseServerError {
            status_code: 404,
            ..
        }
    )
}

/// Tar the repository for the build context
fn create_build_context(dir: &Path) -> std::io::Result<Vec<u8>> {
    let mut archive = tar::Builder::new(Vec::new());
    // Keep symlinks as links so a hostile repo cannot pull host files into the context
    archive.follow_symlinks(false);
    archive.append_dir_all(".", dir)?;
    archive.into_inner()
}

/// Port bindings the runtime actually mapped. Empty once the container has
/// exited; ports the image merely declares are not reported.
fn port_bindings(inspect: &ContainerInspectResponse) -> Vec<PortBinding> {
    let mut bindings = Vec::new();

    if let Some(port_map) = inspect
        .network_settings
        .as_ref()
        .and_then(|ns| ns.ports.as_ref())
    {
        for (key, host_bindings) in port_map {
            let Some((container_port, protocol)) = parse_port_key(key) else {
                continue;
            };

            let host_ports: Vec<u16> = host_bindings
                .iter()
                .flatten()
                .filter_map(|binding| binding.host_port.as_deref())
                .filter_map(|port| port.parse().ok())
                .collect();

            if host_ports.is_empty() {
                bindings.push(PortBinding {
                    container_port,
                    host_port: None,
                    protocol,
                });
            } else {
                bindings.extend(host_ports.into_iter().map(|host_port| PortBinding {
                    container_port,
                    host_port: Some(host_port),
                    protocol: protocol.clone(),
                }));
            }
        }
    }

    bindings.sort_by(|a, b| {
        (a.container_port, a.host_port, &a.protocol).cmp(&(
            b.container_port,
            b.host_port,
            &b.protocol,
        ))
    });
    bindings.dedup();
    bindings
}

/// Parse "3000/tcp" into (3000, "tcp")
fn parse_port_key(key: &str) -> Option<(u16, String)> {
    let mut parts = key.splitn(2, '/');
    let port = parts.next()?.parse::<u16>().ok()?;
    let protocol = parts.next().unwrap_or("tcp").to_string();
    Some((port, protocol))
}
