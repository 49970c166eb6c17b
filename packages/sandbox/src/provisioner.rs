// ABOUTME: Ensures a repository has a Dockerfile before the sandbox build
// ABOUTME: Never overwrites user files; renders a language template with a sanitized start command

use crate::templates::TemplateKind;
use crate::types::{DockerfileSource, InferredContext, ProvisionResult};
use std::fs;
use std::path::Path;
use tracing::{debug, error, info};

pub const DOCKERFILE_NAME: &str = "Dockerfile";

/// Substituted when the inferred start command is empty after sanitization
pub const FALLBACK_START_COMMAND: &str = "echo 'No start command determined'";

const QUOTE_CHARS: [char; 2] = ['"', '\''];

/// Makes sure a build specification exists at the repository root
pub struct DockerfileProvisioner;

impl DockerfileProvisioner {
    /// Locate or generate `Dockerfile` in `repo_root`.
    ///
    /// Write failures are reported as `DockerfileSource::Error`; callers still
    /// attempt the run and let the build fail on its own.
    pub fn provision<P: AsRef<Path>>(repo_root: P, context: &InferredContext) -> ProvisionResult {
        let repo_root = repo_root.as_ref();
        let dockerfile_path = repo_root.join(DOCKERFILE_NAME);

        if dockerfile_path.exists() {
            info!("Using existing Dockerfile at {}", dockerfile_path.display());
            return ProvisionResult {
                source: DockerfileSource::Existing,
                path: dockerfile_path,
                content: None,
                error: None,
            };
        }

        info!(
            "No Dockerfile in {}, generating one for language '{}'",
            repo_root.display(),
            context.language
        );

        let kind = TemplateKind::from_language(&context.language);
        let command = sanitize_start_command(&context.start_instruction);
        debug!("Template {:?}, start command: {}", kind, command);

        let rendered = exec_form(&command).map(|cmd| kind.render(&cmd));
        let write_result = rendered.and_then(|content| {
            fs::write(&dockerfile_path, &content)?;
            Ok(content)
        });

        match write_result {
            Ok(content) => ProvisionResult {
                source: DockerfileSource::Generated,
                path: dockerfile_path,
                content: Some(content),
                error: None,
            },
            Err(e) => {
                error!("Failed to generate Dockerfile: {}", e);
                ProvisionResult {
                    source: DockerfileSource::Error,
                    path: dockerfile_path,
                    content: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

/// Reduce an inferred start instruction to a single shell command.
///
/// Drops everything from the first `(` and the first line break, then peels
/// quotes wrapped around the whole command. Applying it twice yields the same
/// string.
pub fn sanitize_start_command(raw: &str) -> String {
    let command = raw.split('(').next().unwrap_or_default();
    let command = command.split(['\n', '\r']).next().unwrap_or_default();
    let command = strip_wrapping_quotes(command);

    if command.is_empty() {
        FALLBACK_START_COMMAND.to_string()
    } else {
        command.to_string()
    }
}

/// Encode a command as a Dockerfile exec-form array running under `/bin/sh -c`.
/// JSON encoding escapes embedded double quotes and backslashes.
pub fn exec_form(command: &str) -> crate::Result<String> {
    Ok(serde_json::to_string(&["/bin/sh", "-c", command])?)
}

fn strip_wrapping_quotes(input: &str) -> &str {
    let mut current = input.trim();
    loop {
        let next = strip_one_quote_layer(current).trim();
        if next.len() == current.len() {
            return current;
        }
        current = next;
    }
}

fn strip_one_quote_layer(s: &str) -> &str {
    let (first, last) = match (s.chars().next(), s.chars().last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return s,
    };

    // Matched pair around the whole command
    if s.len() >= 2 && first == last && QUOTE_CHARS.contains(&first) {
        return &s[1..s.len() - 1];
    }

    // A lone opening or closing quote left behind by truncation, e.g. `"npm start (runs ...)"`
    if QUOTE_CHARS.contains(&first) && s.matches(first).count() % 2 == 1 {
        return &s[1..];
    }
    if QUOTE_CHARS.contains(&last) && s.matches(last).count() % 2 == 1 {
        return &s[..s.len() - 1];
    }

    s
}
