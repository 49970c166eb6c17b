// ABOUTME: Offline log analysis command
// ABOUTME: Runs the error signature and port tables over a saved log without Docker

use anyhow::{Context, Result};
use repoprobe_sandbox::LogAnalyzer;
use std::io::Read;
use std::path::PathBuf;

pub fn analyze_logs_command(file: Option<PathBuf>) -> Result<()> {
    let raw = match file {
        Some(path) => std::fs::read(&path)
            .with_context(|| format!("Failed to read log file {}", path.display()))?,
        None => {
            let mut buffer = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buffer)
                .context("Failed to read logs from stdin")?;
            buffer
        }
    };

    let analysis = LogAnalyzer::analyze_bytes(&raw);
    println!("{}", serde_json::to_string_pretty(&analysis)?);
    Ok(())
}
