// ABOUTME: Container runtime trait used by the sandbox runner
// ABOUTME: Abstracts image build, container lifecycle and label lookups behind an async interface

use crate::types::PortBinding;
use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

pub mod docker;

pub use docker::{DockerConnector, DockerRuntime};

/// Label marking every image and container created by a sandbox run
pub const MANAGED_LABEL: &str = "repoprobe.managed";
/// Label carrying the per-run identifier
pub const RUN_ID_LABEL: &str = "repoprobe.run_id";

/// Image build request
#[derive(Debug, Clone)]
pub struct ImageBuildSpec {
    /// Directory sent as the build context
    pub context_dir: PathBuf,
    /// Dockerfile path relative to the context
    pub dockerfile: String,
    pub tag: String,
    pub labels: HashMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct BuildOutput {
    /// Non-empty `stream` lines emitted by the builder
    pub log: Vec<String>,
}

/// Container creation request. Resource caps are always set.
#[derive(Debug, Clone)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub env: Vec<(String, String)>,
    pub labels: HashMap<String, String>,
    pub cpu_period: i64,
    pub cpu_quota: i64,
    pub memory_bytes: i64,
}

/// Snapshot of a container's state
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerState {
    pub status: String,
    pub running: bool,
    pub exit_code: Option<i64>,
    pub port_bindings: Vec<PortBinding>,
}

impl ContainerState {
    /// The process has terminated and will not come back
    pub fn has_stopped(&self) -> bool {
        !self.running && matches!(self.status.as_str(), "exited" | "dead")
    }

    /// Container ports the runtime exposed, ascending and unique
    pub fn exposed_ports(&self) -> Vec<u16> {
        let mut ports: Vec<u16> = self
            .port_bindings
            .iter()
            .map(|binding| binding.container_port)
            .collect();
        ports.sort_unstable();
        ports.dedup();
        ports
    }
}

/// Images and containers carrying a given label
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelledResources {
    pub images: Vec<String>,
    pub containers: Vec<String>,
}

impl LabelledResources {
    pub fn is_empty(&self) -> bool {
        self.images.is_empty() && self.containers.is_empty()
    }
}

/// Operations the sandbox runner needs from a container engine
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Build and tag an image; fails with `BuildFailed` when the build itself is rejected
    async fn build_image(&self, spec: &ImageBuildSpec) -> Result<BuildOutput>;

    /// Create (but do not start) a container and return its id
    async fn create_container(&self, spec: &ContainerSpec) -> Result<String>;

    async fn start_container(&self, container_id: &str) -> Result<()>;

    async fn inspect_container(&self, container_id: &str) -> Result<ContainerState>;

    /// Combined stdout/stderr, at most `max_bytes`
    async fn container_logs(&self, container_id: &str, max_bytes: usize) -> Result<Vec<u8>>;

    /// Stop a container; already stopped or missing containers are not an error
    async fn stop_container(&self, container_id: &str, timeout_secs: u64) -> Result<()>;

    /// Force-remove a container and its anonymous volumes; missing is not an error
    async fn remove_container(&self, container_id: &str) -> Result<()>;

    /// Force-remove an image by tag; missing is not an error
    async fn remove_image(&self, tag: &str) -> Result<()>;

    /// List images and containers (including stopped) matching `key=value`
    async fn list_labelled(&self, label: &str) -> Result<LabelledResources>;
}

/// Acquires a runtime client for one sandbox run
#[async_trait]
pub trait RuntimeConnector: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn ContainerRuntime>>;
}
