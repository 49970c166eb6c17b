// ABOUTME: Environment variable name constants
// ABOUTME: Centralized definitions of all environment variable names used across repoprobe

// Container Runtime Connection
pub const REPOPROBE_DOCKER_TIMEOUT_SECS: &str = "REPOPROBE_DOCKER_TIMEOUT_SECS";
pub const DOCKER_HOST: &str = "DOCKER_HOST";

// Resource Limits
pub const REPOPROBE_CPU_LIMIT: &str = "REPOPROBE_CPU_LIMIT";
pub const REPOPROBE_MEMORY_LIMIT_MB: &str = "REPOPROBE_MEMORY_LIMIT_MB";

// Run Timing
pub const REPOPROBE_WARMUP_SECS: &str = "REPOPROBE_WARMUP_SECS";
pub const REPOPROBE_POLL_INTERVAL_MS: &str = "REPOPROBE_POLL_INTERVAL_MS";
pub const REPOPROBE_EXECUTION_TIMEOUT_SECS: &str = "REPOPROBE_EXECUTION_TIMEOUT_SECS";
pub const REPOPROBE_BUILD_TIMEOUT_SECS: &str = "REPOPROBE_BUILD_TIMEOUT_SECS";

// Log Capture
pub const REPOPROBE_LOG_RETAIN_CHARS: &str = "REPOPROBE_LOG_RETAIN_CHARS";
pub const REPOPROBE_LOG_MAX_BYTES: &str = "REPOPROBE_LOG_MAX_BYTES";

// Naming
pub const REPOPROBE_IMAGE_PREFIX: &str = "REPOPROBE_IMAGE_PREFIX";

// Logging
pub const RUST_LOG: &str = "RUST_LOG";
