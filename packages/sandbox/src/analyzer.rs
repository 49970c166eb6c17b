// ABOUTME: Turns raw container output into labeled findings and a detected listening port
// ABOUTME: Pure functions over ordered regex tables; tolerant of any input bytes

use crate::types::LogFinding;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Characters of matched text kept per finding
pub const FINDING_DETAIL_MAX_CHARS: usize = 150;

/// Error signatures, checked independently and in order (case-insensitive)
const ERROR_SIGNATURES: &[(&str, &str)] = &[
    (r"MongooseError", "Database Connection Fail"),
    (r"ModuleNotFoundError", "Missing Python Dependency"),
    (r"ImportError", "Import Error"),
    (r"SyntaxError", "Syntax Error"),
    (r"ReferenceError", "Code Reference Error"),
    (r"TypeError", "Type Mismatch"),
    (r"Traceback \(most recent call last\)", "Python Crash Trace"),
    (r"Error: Cannot find module", "Missing Node Module"),
    (r"unhandledRejection", "Unhandled Promise Rejection"),
    (r"Address already in use", "Port Conflict"),
    (r"CRITICAL:", "Critical Log Level"),
    (r"Exception:", "Generic Exception"),
    (r"Error:", "Generic Error"),
];

/// Port announcements in priority order: framework phrasings first, bare host:port last
const PORT_PATTERNS: &[&str] = &[
    r"Running on http://.*:(\d+)",   // Flask / Werkzeug
    r"Listening on port (\d+)",
    r"started on port (\d+)",        // Spring Boot, Nest
    r"server listening on (\d+)",
    r":(\d+) \.\.\.",
    r"localhost:(\d+)",
    r"0\.0\.0\.0:(\d+)",
];

struct Signature {
    regex: Regex,
    label: &'static str,
}

// `.*` extends each match to the end of its line so the detail carries the message
static SIGNATURES: Lazy<Vec<Signature>> = Lazy::new(|| {
    ERROR_SIGNATURES
        .iter()
        .filter_map(|&(pattern, label)| {
            Regex::new(&format!("(?i){}.*", pattern))
                .ok()
                .map(|regex| Signature { regex, label })
        })
        .collect()
});

static PORT_REGEXES: Lazy<Vec<Regex>> = Lazy::new(|| {
    PORT_PATTERNS
        .iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .collect()
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogAnalysis {
    pub findings: Vec<LogFinding>,
    pub detected_port: Option<u16>,
}

pub struct LogAnalyzer;

impl LogAnalyzer {
    /// Analyze decoded log text
    pub fn analyze(log_text: &str) -> LogAnalysis {
        LogAnalysis {
            findings: Self::find_errors(log_text),
            detected_port: Self::detect_port(log_text),
        }
    }

    /// Analyze raw output; invalid UTF-8 is replaced rather than rejected
    pub fn analyze_bytes(raw: &[u8]) -> LogAnalysis {
        Self::analyze(&String::from_utf8_lossy(raw))
    }

    /// One finding per signature that fires, carrying its first match
    pub fn find_errors(log_text: &str) -> Vec<LogFinding> {
        SIGNATURES
            .iter()
            .filter_map(|signature| {
                signature.regex.find(log_text).map(|m| LogFinding {
                    label: signature.label.to_string(),
                    detail: truncate_chars(m.as_str().trim(), FINDING_DETAIL_MAX_CHARS),
                })
            })
            .collect()
    }

    /// The first pattern whose first match carries a valid TCP port wins.
    /// No match means no port; nothing is guessed.
    pub fn detect_port(log_text: &str) -> Option<u16> {
        PORT_REGEXES.iter().find_map(|regex| {
            regex
                .captures(log_text)
                .and_then(|captures| captures.get(1))
                .and_then(|port| port.as_str().parse::<u16>().ok())
                .filter(|port| *port != 0)
        })
    }
}

pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => text[..byte_index].to_string(),
        None => text.to_string(),
    }
}
