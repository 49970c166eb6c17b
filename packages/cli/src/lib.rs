// ABOUTME: Library half of the repoprobe CLI
// ABOUTME: Logging setup, context loading and human-readable report rendering

pub mod context;
pub mod logging;
pub mod report;
