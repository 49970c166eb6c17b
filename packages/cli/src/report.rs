// ABOUTME: Human-readable summary of a sandbox result
// ABOUTME: Colors the classification by severity; JSON output is handled by the caller

use colored::*;
use repoprobe_sandbox::{SandboxResult, Severity};
use std::fmt::Write;

fn severity_label(severity: Severity) -> ColoredString {
    match severity {
        Severity::Ok => "ok".green().bold(),
        Severity::Warning => "warning".yellow().bold(),
        Severity::Critical => "critical".red().bold(),
        Severity::Unknown => "unknown".dimmed(),
    }
}

/// Short multi-line summary for terminals
pub fn render_summary(result: &SandboxResult) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "{} {} ({})",
        "Classification:".bold(),
        result.classification,
        severity_label(result.health.severity)
    );
    let _ = writeln!(
        out,
        "{} {}",
        "Dockerfile:".bold(),
        result.dockerfile_source.as_str()
    );
    let _ = writeln!(
        out,
        "{} built={} in {}ms",
        "Build:".bold(),
        result.build.image_built,
        result.build.build_time_ms
    );

    let exit_code = result
        .execution
        .exit_code
        .map(|code| code.to_string())
        .unwrap_or_else(|| "-".to_string());
    let _ = writeln!(
        out,
        "{} status={} exit={} startup={}ms",
        "Execution:".bold(),
        result.execution.status,
        exit_code,
        result.execution.startup_time_ms
    );

    let detected = result
        .health
        .detected_app_port
        .map(|port| port.to_string())
        .unwrap_or_else(|| "none".to_string());
    let _ = writeln!(
        out,
        "{} detected={} exposed={:?}",
        "Ports:".bold(),
        detected,
        result.health.docker_exposed_ports
    );

    for error in &result.errors {
        let _ = writeln!(out, "  {} {}", "✗".red(), error);
    }
    for warning in &result.cleanup_warnings {
        let _ = writeln!(out, "  {} {}", "⚠".yellow(), warning);
    }

    out
}
