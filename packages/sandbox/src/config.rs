// ABOUTME: Resource limits and timing knobs for sandbox runs
// ABOUTME: Defaults mirror the design values and can be overridden from REPOPROBE_* variables

use repoprobe_config::constants::*;
use repoprobe_config::env::{
    parse_env_or_default_with_validation, string_env_or_default,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_CPU_LIMIT: f64 = 0.5;
pub const DEFAULT_MEMORY_LIMIT_MB: u64 = 512;
/// Docker refuses limits below 6 MiB
pub const MIN_MEMORY_LIMIT_MB: u64 = 6;
/// 1 TiB
pub const MAX_MEMORY_LIMIT_MB: u64 = 1024 * 1024;
pub const DEFAULT_DOCKER_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_WARMUP_SECS: u64 = 8;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
pub const DEFAULT_EXECUTION_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_BUILD_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_LOG_RETAIN_CHARS: usize = 15_000;
pub const DEFAULT_LOG_MAX_BYTES: usize = 1024 * 1024;
pub const DEFAULT_IMAGE_PREFIX: &str = "repo-analysis";

/// Settings for one sandbox runner. Cheap to clone, shared by concurrent runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Fraction of one CPU core the container may use
    pub cpu_limit: f64,
    pub memory_limit_mb: u64,
    /// Connection/request timeout for the Docker client
    pub docker_timeout: Duration,
    /// Upper bound on the warm-up wait; polling stops early once the process exits
    pub warmup: Duration,
    pub poll_interval: Duration,
    /// Hard limit on start + observe; the container is killed when it elapses
    pub execution_timeout: Duration,
    pub build_timeout: Duration,
    /// Characters of combined output kept in the result
    pub log_retain_chars: usize,
    /// Bytes of combined output read from the daemon for analysis
    pub log_max_bytes: usize,
    pub image_prefix: String,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            cpu_limit: DEFAULT_CPU_LIMIT,
            memory_limit_mb: DEFAULT_MEMORY_LIMIT_MB,
            docker_timeout: Duration::from_secs(DEFAULT_DOCKER_TIMEOUT_SECS),
            warmup: Duration::from_secs(DEFAULT_WARMUP_SECS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            execution_timeout: Duration::from_secs(DEFAULT_EXECUTION_TIMEOUT_SECS),
            build_timeout: Duration::from_secs(DEFAULT_BUILD_TIMEOUT_SECS),
            log_retain_chars: DEFAULT_LOG_RETAIN_CHARS,
            log_max_bytes: DEFAULT_LOG_MAX_BYTES,
            image_prefix: DEFAULT_IMAGE_PREFIX.to_string(),
        }
    }
}

impl SandboxConfig {
    /// Load configuration from the environment, falling back to defaults for
    /// unset or invalid values.
    pub fn from_env() -> Self {
        let cpu_limit = parse_env_or_default_with_validation(
            REPOPROBE_CPU_LIMIT,
            DEFAULT_CPU_LIMIT,
            |v: f64| v > 0.0 && v <= 64.0,
        );
        let memory_limit_mb = parse_env_or_default_with_validation(
            REPOPROBE_MEMORY_LIMIT_MB,
            DEFAULT_MEMORY_LIMIT_MB,
            |v: u64| (MIN_MEMORY_LIMIT_MB..=MAX_MEMORY_LIMIT_MB).contains(&v),
        );
        let docker_timeout = parse_env_or_default_with_validation(
            REPOPROBE_DOCKER_TIMEOUT_SECS,
            DEFAULT_DOCKER_TIMEOUT_SECS,
            |v: u64| v > 0,
        );
        let warmup = parse_env_or_default_with_validation(
            REPOPROBE_WARMUP_SECS,
            DEFAULT_WARMUP_SECS,
            |v: u64| v <= 600,
        );
        let poll_interval = parse_env_or_default_with_validation(
            REPOPROBE_POLL_INTERVAL_MS,
            DEFAULT_POLL_INTERVAL_MS,
            |v: u64| (10..=10_000).contains(&v),
        );
        let execution_timeout = parse_env_or_default_with_validation(
            REPOPROBE_EXECUTION_TIMEOUT_SECS,
            DEFAULT_EXECUTION_TIMEOUT_SECS,
            |v: u64| v > 0,
        );
        let build_timeout = parse_env_or_default_with_validation(
            REPOPROBE_BUILD_TIMEOUT_SECS,
            DEFAULT_BUILD_TIMEOUT_SECS,
            |v: u64| v > 0,
        );
        let log_retain_chars = parse_env_or_default_with_validation(
            REPOPROBE_LOG_RETAIN_CHARS,
            DEFAULT_LOG_RETAIN_CHARS,
            |v: usize| v > 0,
        );
        let log_max_bytes = parse_env_or_default_with_validation(
            REPOPROBE_LOG_MAX_BYTES,
            DEFAULT_LOG_MAX_BYTES,
            |v: usize| v >= 1024,
        );

        Self {
            cpu_limit,
            memory_limit_mb,
            docker_timeout: Duration::from_secs(docker_timeout),
            warmup: Duration::from_secs(warmup),
            poll_interval: Duration::from_millis(poll_interval),
            execution_timeout: Duration::from_secs(execution_timeout),
            build_timeout: Duration::from_secs(build_timeout),
            log_retain_chars,
            log_max_bytes,
            image_prefix: sanitize_image_prefix(&string_env_or_default(
                REPOPROBE_IMAGE_PREFIX,
                DEFAULT_IMAGE_PREFIX,
            )),
        }
    }

    /// CPU period/quota pair expressing `cpu_limit` of one core
    pub fn cpu_quota(&self) -> (i64, i64) {
        let period: i64 = 100_000;
        let quota = (self.cpu_limit * period as f64).round() as i64;
        // The kernel rejects quotas below 1ms
        (period, quota.max(1_000))
    }

    pub fn memory_limit_bytes(&self) -> i64 {
        let bytes = self.memory_limit_mb.saturating_mul(1024 * 1024);
        i64::try_from(bytes).unwrap_or(i64::MAX)
    }
}

/// Image references must be lowercase and limited to `[a-z0-9._-]`
fn sanitize_image_prefix(raw: &str) -> String {
    let cleaned: String = raw
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .collect();
    let cleaned = cleaned.trim_matches(|c| matches!(c, '-' | '_' | '.'));
    if cleaned.is_empty() {
        DEFAULT_IMAGE_PREFIX.to_string()
    } else {
        cleaned.to_string()
    }
}
