// ABOUTME: Common test utilities for sandbox integration tests
// ABOUTME: In-memory container runtime with scripted states and injectable failures

#![allow(dead_code)]

use async_trait::async_trait;
use repoprobe_sandbox::runtime::{
    BuildOutput, ContainerRuntime, ContainerSpec, ContainerState, ImageBuildSpec,
    LabelledResources, RuntimeConnector,
};
use repoprobe_sandbox::{PortBinding, Result, SandboxConfig, SandboxError, SandboxRunner};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Operation that should fail (or hang) in the mock runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Build,
    Create,
    Start,
    Inspect,
    Logs,
    Stop,
    RemoveContainer,
    RemoveImage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Daemon rejected the build
    Rejected,
    /// Transport-level error
    Transport,
    /// Never completes
    Hang,
    /// Applies the operation, then never answers
    Stall,
}

#[derive(Default)]
struct Inner {
    images: HashMap<String, HashMap<String, String>>,
    containers: HashMap<String, HashMap<String, String>>,
    calls: Vec<String>,
    build_specs: Vec<ImageBuildSpec>,
    container_specs: Vec<ContainerSpec>,
    /// Container id to name
    ids: HashMap<String, String>,
    inspections: usize,
    next_id: usize,
}

/// In-memory stand-in for the Docker daemon
#[derive(Default)]
pub struct MockRuntime {
    inner: Mutex<Inner>,
    faults: HashMap<Stage, Fault>,
    states: Vec<ContainerState>,
    logs: Vec<u8>,
}

impl MockRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fault(mut self, stage: Stage, fault: Fault) -> Self {
        self.faults.insert(stage, fault);
        self
    }

    /// States returned by successive inspections; the last one repeats
    pub fn with_states(mut self, states: Vec<ContainerState>) -> Self {
        self.states = states;
        self
    }

    pub fn with_logs(mut self, logs: impl Into<Vec<u8>>) -> Self {
        self.logs = logs.into();
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn called(&self, operation: &str) -> bool {
        self.calls().iter().any(|call| call == operation)
    }

    pub fn inspections(&self) -> usize {
        self.inner.lock().unwrap().inspections
    }

    pub fn build_specs(&self) -> Vec<ImageBuildSpec> {
        self.inner.lock().unwrap().build_specs.clone()
    }

    pub fn container_specs(&self) -> Vec<ContainerSpec> {
        self.inner.lock().unwrap().container_specs.clone()
    }

    /// Images and containers still present
    pub fn leftovers(&self) -> LabelledResources {
        let inner = self.inner.lock().unwrap();
        LabelledResources {
            images: inner.images.keys().cloned().collect(),
            containers: inner.containers.keys().cloned().collect(),
        }
    }

    /// Store the container under its name and hand back a fresh id
    fn register_container(&self, spec: &ContainerSpec) -> String {
        let mut inner = self.inner.lock().unwrap();
        if let Some((id, _)) = inner.ids.iter().find(|(_, name)| **name == spec.name) {
            return id.clone();
        }
        inner.next_id += 1;
        let id = format!("mock-container-{}", inner.next_id);
        inner.ids.insert(id.clone(), spec.name.clone());
        inner
            .containers
            .insert(spec.name.clone(), spec.labels.clone());
        id
    }

    async fn enter(&self, stage: Stage, operation: &str) -> Result<()> {
        self.inner.lock().unwrap().calls.push(operation.to_string());
        match self.faults.get(&stage) {
            None => Ok(()),
            Some(Fault::Hang) | Some(Fault::Stall) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            }
            Some(Fault::Rejected) => Err(SandboxError::BuildFailed(format!(
                "{} rejected by mock daemon",
                operation
            ))),
            Some(Fault::Transport) => Err(SandboxError::Runtime(format!(
                "{}: connection reset by mock daemon",
                operation
            ))),
        }
    }
}

#[async_trait]
impl ContainerRuntime for MockRuntime {
    async fn build_image(&self, spec: &ImageBuildSpec) -> Result<BuildOutput> {
        self.inner.lock().unwrap().build_specs.push(spec.clone());
        self.enter(Stage::Build, "build").await?;
        self.inner
            .lock()
            .unwrap()
            .images
            .insert(spec.tag.clone(), spec.labels.clone());
        Ok(BuildOutput {
            log: vec![format!("Successfully tagged {}", spec.tag)],
        })
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String> {
        self.inner.lock().unwrap().container_specs.push(spec.clone());
        let stalls = self.faults.get(&Stage::Create) == Some(&Fault::Stall);
        if stalls {
            self.register_container(spec);
        }
        self.enter(Stage::Create, "create").await?;
        Ok(self.register_container(spec))
    }

    async fn start_container(&self, _container_id: &str) -> Result<()> {
        self.enter(Stage::Start, "start").await
    }

    async fn inspect_container(&self, _container_id: &str) -> Result<ContainerState> {
        self.enter(Stage::Inspect, "inspect").await?;
        let mut inner = self.inner.lock().unwrap();
        let index = inner.inspections.min(self.states.len().saturating_sub(1));
        inner.inspections += 1;
        Ok(self
            .states
            .get(index)
            .cloned()
            .unwrap_or_else(|| exited(0, vec![])))
    }

    async fn container_logs(&self, _container_id: &str, max_bytes: usize) -> Result<Vec<u8>> {
        self.enter(Stage::Logs, "logs").await?;
        Ok(self.logs[..self.logs.len().min(max_bytes)].to_vec())
    }

    async fn stop_container(&self, _container_id: &str, _timeout_secs: u64) -> Result<()> {
        self.enter(Stage::Stop, "stop").await
    }

    async fn remove_container(&self, container_id: &str) -> Result<()> {
        self.enter(Stage::RemoveContainer, "remove_container").await?;
        let mut inner = self.inner.lock().unwrap();
        let name = inner
            .ids
            .get(container_id)
            .cloned()
            .unwrap_or_else(|| container_id.to_string());
        inner.containers.remove(&name);
        Ok(())
    }

    async fn remove_image(&self, tag: &str) -> Result<()> {
        self.enter(Stage::RemoveImage, "remove_image").await?;
        self.inner.lock().unwrap().images.remove(tag);
        Ok(())
    }

    async fn list_labelled(&self, label: &str) -> Result<LabelledResources> {
        let (key, value) = label.split_once('=').unwrap_or((label, ""));
        let matches = |labels: &HashMap<String, String>| {
            labels
                .get(key)
                .is_some_and(|v| value.is_empty() || v == value)
        };

        let inner = self.inner.lock().unwrap();
        Ok(LabelledResources {
            images: inner
                .images
                .iter()
                .filter(|(_, labels)| matches(labels))
                .map(|(tag, _)| tag.clone())
                .collect(),
            containers: inner
                .containers
                .iter()
                .filter(|(_, labels)| matches(labels))
                .map(|(id, _)| id.clone())
                .collect(),
        })
    }
}

/// Hands out one shared mock runtime, or fails like an absent daemon
pub struct MockConnector {
    runtime: Option<Arc<MockRuntime>>,
}

impl MockConnector {
    pub fn new(runtime: Arc<MockRuntime>) -> Self {
        Self {
            runtime: Some(runtime),
        }
    }

    pub fn unavailable() -> Self {
        Self { runtime: None }
    }
}

#[async_trait]
impl RuntimeConnector for MockConnector {
    async fn connect(&self) -> Result<Arc<dyn ContainerRuntime>> {
        match &self.runtime {
            Some(runtime) => Ok(Arc::clone(runtime) as Arc<dyn ContainerRuntime>),
            None => Err(SandboxError::ClientInit(
                "error trying to connect: No such file or directory".to_string(),
            )),
        }
    }
}

/// Fast timings so scripted runs finish in milliseconds
pub fn test_config() -> SandboxConfig {
    SandboxConfig {
        warmup: Duration::from_millis(200),
        poll_interval: Duration::from_millis(10),
        execution_timeout: Duration::from_secs(5),
        build_timeout: Duration::from_secs(5),
        ..SandboxConfig::default()
    }
}

pub fn runner_for(runtime: &Arc<MockRuntime>, config: SandboxConfig) -> SandboxRunner {
    SandboxRunner::new(config, Arc::new(MockConnector::new(Arc::clone(runtime))))
}

pub fn tcp(container_port: u16, host_port: u16) -> PortBinding {
    PortBinding {
        container_port,
        host_port: Some(host_port),
        protocol: "tcp".to_string(),
    }
}

pub fn running(port_bindings: Vec<PortBinding>) -> ContainerState {
    ContainerState {
        status: "running".to_string(),
        running: true,
        exit_code: Some(0),
        port_bindings,
    }
}

pub fn exited(exit_code: i64, port_bindings: Vec<PortBinding>) -> ContainerState {
    ContainerState {
        status: "exited".to_string(),
        running: false,
        exit_code: Some(exit_code),
        port_bindings,
    }
}
