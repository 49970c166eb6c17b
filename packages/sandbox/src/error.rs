// ABOUTME: Error types for sandbox runs
// ABOUTME: Separates daemon, build, start and timeout failures so the runner can classify them

use thiserror::Error;

/// Main error type for sandbox operations
#[derive(Error, Debug)]
pub enum SandboxError {
    /// The container runtime client could not be created or did not answer a ping
    #[error("Docker Client Init Failed: {0}")]
    ClientInit(String),

    /// The daemon rejected the build (bad Dockerfile, failing RUN step, missing COPY source)
    #[error("Docker build failed: {0}")]
    BuildFailed(String),

    /// Container could not be created or started
    #[error("Container failed to start: {0}")]
    ContainerStartFailed(String),

    /// Operation exceeded its time limit
    #[error("{operation} timed out after {seconds} seconds")]
    Timeout { operation: String, seconds: u64 },

    /// Transport or API errors from the Docker daemon
    #[error("Docker error: {0}")]
    Docker(#[from] bollard::errors::Error),

    /// Generic runtime failure reported by a non-Docker runtime
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SandboxError {
    /// True when the failure was produced by the build itself rather than the daemon connection
    pub fn is_build_rejection(&self) -> bool {
        matches!(
            self,
            SandboxError::BuildFailed(_) | SandboxError::Timeout { .. }
        )
    }
}

/// Type alias for Results that return SandboxError
pub type Result<T> = std::result::Result<T, SandboxError>;
