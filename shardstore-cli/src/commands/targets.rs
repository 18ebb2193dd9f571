//! Targets Command
//!
//! Lists the discovered targets in shard order.

use crate::symbols;
use anyhow::{Context, Result};
use console::style;
use shardstore_core::ErasureConfig;
use shardstore_storage::targets;
use shardstore_storage::ShardTarget;
use std::path::PathBuf;

/// Targets configuration
pub struct TargetsConfig {
    pub base_dir: PathBuf,
    pub erasure: ErasureConfig,
}

/// Run targets command
pub async fn run(config: TargetsConfig) -> Result<()> {
    let found = targets::discover(&config.base_dir)
        .await
        .with_context(|| format!("Failed to find targets under {}", config.base_dir.display()))?;

    let k = config.erasure.data_shards;
    let total = config.erasure.total_shards();

    println!();
    println!(
        "{} (k={}, m={})",
        style("Targets").bold().underlined(),
        k,
        config.erasure.parity_shards
    );
    for (index, target) in found.iter().enumerate() {
        let role = if index < k {
            style("data").cyan()
        } else if index < total {
            style("parity").magenta()
        } else {
            style("unused").dim()
        };
        println!("  [{:>3}] {:<6} {}", index, role, target.address());
    }
    println!();

    if found.len() < total {
        println!(
            "{} {} targets found, {} needed",
            style(symbols::WARN).yellow(),
            found.len(),
            total
        );
        anyhow::bail!("Not enough targets for k={}, m={}", k, config.erasure.parity_shards);
    }

    Ok(())
}
