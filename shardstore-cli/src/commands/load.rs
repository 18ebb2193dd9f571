//! Load Command
//!
//! Rebuilds an object and writes it to stdout or a file.

use super::format_bytes;
use crate::symbols;
use anyhow::{Context, Result};
use console::style;
use shardstore_storage::StoreEngine;
use std::path::PathBuf;

/// Load configuration
pub struct LoadConfig {
    pub key: String,
    /// Write here instead of stdout
    pub output: Option<PathBuf>,
}

/// Run load command
pub async fn run(engine: &StoreEngine, config: LoadConfig) -> Result<()> {
    match &config.output {
        None => {
            engine
                .load(&config.key, tokio::io::stdout())
                .await
                .context("Failed to load file")?;
        }
        Some(path) => {
            // Reconstruct fully before touching the output file
            let mut data = Vec::new();
            let size = engine
                .load(&config.key, &mut data)
                .await
                .context("Failed to load file")?;

            tokio::fs::write(path, &data)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;

            println!(
                "{} Loaded {} to {} ({})",
                style(symbols::CHECK).green(),
                style(&config.key).bold(),
                path.display(),
                format_bytes(size)
            );
        }
    }

    Ok(())
}
