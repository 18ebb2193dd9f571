//! Save Command
//!
//! Stores a local file as an erasure-coded object keyed by its file name.

use super::format_bytes;
use crate::symbols;
use anyhow::{Context, Result};
use console::style;
use shardstore_storage::StoreEngine;
use std::path::{Path, PathBuf};
use tokio::fs::File;

/// Save configuration
pub struct SaveConfig {
    pub path: PathBuf,
}

/// Run save command
pub async fn run(engine: &StoreEngine, config: SaveConfig) -> Result<()> {
    let key = object_key(&config.path)?;

    let file = File::open(&config.path)
        .await
        .with_context(|| format!("Failed to open {}", config.path.display()))?;

    let summary = engine
        .save(&key, file)
        .await
        .context("Failed to save file")?;

    println!(
        "{} Saved {} ({}) as {} fragments of {}",
        style(symbols::CHECK).green(),
        style(&summary.key).bold(),
        format_bytes(summary.original_len as u64),
        summary.targets,
        format_bytes(summary.shard_len as u64)
    );

    Ok(())
}

/// The object key is the file's own name
fn object_key(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .with_context(|| format!("Cannot derive an object key from {}", path.display()))
}
