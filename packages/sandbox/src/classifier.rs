// ABOUTME: Deterministic health classification of an observed container run
// ABOUTME: Maps exit state, log findings and port data to one label and severity

use crate::types::{Classification, LogFinding, Severity};

/// Observed signals for one run
#[derive(Debug, Clone, Copy)]
pub struct HealthSignals<'a> {
    pub exit_code: Option<i64>,
    pub is_running: bool,
    pub findings: &'a [LogFinding],
    pub detected_port: Option<u16>,
    pub exposed_ports: &'a [u16],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthVerdict {
    pub classification: Classification,
    pub severity: Severity,
    pub port_mismatch: bool,
    /// Messages for the result's error list, in report order
    pub errors: Vec<String>,
}

/// Label and severity for a set of signals. Total and pure.
pub fn classify(
    exit_code: Option<i64>,
    is_running: bool,
    findings: &[LogFinding],
    detected_port: Option<u16>,
    exposed_ports: &[u16],
) -> (Classification, Severity) {
    match exit_code {
        Some(code) if code != 0 => return (Classification::CrashedOnStart, Severity::Critical),
        _ => {}
    }

    if !findings.is_empty() {
        return (Classification::UnhealthyRuntimeErrors, Severity::Critical);
    }

    match (is_running, detected_port) {
        (true, Some(port)) if !exposed_ports.contains(&port) => {
            (Classification::RunningPortMismatch, Severity::Warning)
        }
        (true, Some(_)) => (Classification::HealthyVerifiedPort, Severity::Ok),
        (true, None) if !exposed_ports.is_empty() => {
            (Classification::RunningBlindPorts, Severity::Warning)
        }
        (true, None) => (Classification::RunningNoPortDetected, Severity::Warning),
        (false, _) => (Classification::ExitedCleanly, Severity::Ok),
    }
}

/// True iff the app announced a port, the runtime exposed ports, and they disagree
pub fn port_mismatch(detected_port: Option<u16>, exposed_ports: &[u16]) -> bool {
    match detected_port {
        Some(port) => !exposed_ports.is_empty() && !exposed_ports.contains(&port),
        None => false,
    }
}

pub struct HealthClassifier;

impl HealthClassifier {
    /// Classify and build the error messages that accompany the label
    pub fn assess(signals: &HealthSignals<'_>) -> HealthVerdict {
        let (classification, severity) = classify(
            signals.exit_code,
            signals.is_running,
            signals.findings,
            signals.detected_port,
            signals.exposed_ports,
        );
        let mismatch = port_mismatch(signals.detected_port, signals.exposed_ports);

        let mut errors = Vec::new();
        if let (true, Some(port)) = (mismatch, signals.detected_port) {
            errors.push(format!(
                "Port Mismatch: App listens on {}, but Dockerfile exposes {:?}",
                port, signals.exposed_ports
            ));
        }

        match classification {
            Classification::CrashedOnStart => {
                if let Some(code) = signals.exit_code {
                    errors.push(format!("Exit Code {}", code));
                }
                errors.extend(signals.findings.iter().map(ToString::to_string));
            }
            Classification::UnhealthyRuntimeErrors => {
                errors.extend(signals.findings.iter().map(ToString::to_string));
            }
            _ => {}
        }

        HealthVerdict {
            classification,
            severity,
            port_mismatch: mismatch,
            errors,
        }
    }
}
