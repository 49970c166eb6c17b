pub mod logs;
pub mod sandbox;

use clap::Args;
use repoprobe_cli::context::load_context;
use repoprobe_sandbox::InferredContext;
use std::path::PathBuf;

/// Inferred context supplied by the upstream classifier
#[derive(Args, Debug)]
pub struct ContextArgs {
    /// JSON file with `language` and `startInstruction`
    #[arg(long)]
    pub context: Option<PathBuf>,
    /// Primary language, e.g. "Python" or "TypeScript"
    #[arg(long)]
    pub language: Option<String>,
    /// Start command, e.g. "npm start"
    #[arg(long)]
    pub start: Option<String>,
}

impl ContextArgs {
    pub fn load(&self) -> anyhow::Result<InferredContext> {
        load_context(
            self.context.as_deref(),
            self.language.as_deref(),
            self.start.as_deref(),
        )
    }
}
