// ABOUTME: Builds the inferred context passed to the sandbox from CLI input
// ABOUTME: Accepts a JSON file from the upstream classifier, with flags taking precedence

use anyhow::{Context, Result};
use repoprobe_sandbox::InferredContext;
use std::fs;
use std::path::Path;

/// Load `{language, startInstruction}` from `file` if given, then apply flag overrides
pub fn load_context(
    file: Option<&Path>,
    language: Option<&str>,
    start: Option<&str>,
) -> Result<InferredContext> {
    let mut context = match file {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("Failed to read context file {}", path.display()))?;
            serde_json::from_str::<InferredContext>(&raw)
                .with_context(|| format!("Invalid context JSON in {}", path.display()))?
        }
        None => InferredContext::default(),
    };

    if let Some(language) = language {
        context.language = language.to_string();
    }
    if let Some(start) = start {
        context.start_instruction = start.to_string();
    }

    Ok(context)
}
