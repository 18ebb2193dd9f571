//! Verify Command
//!
//! Reports which fragments of an object are available and whether parity
//! still matches the data.

use crate::symbols;
use anyhow::{Context, Result};
use console::style;
use shardstore_storage::{StoreEngine, VerifyReport};

/// Run verify command
pub async fn run(engine: &StoreEngine, key: &str) -> Result<()> {
    let report = engine
        .verify(key)
        .await
        .context("Failed to verify object")?;

    print_report(&report);

    if !report.is_healthy() {
        anyhow::bail!("Object {} is not healthy", key);
    }
    Ok(())
}

fn print_report(report: &VerifyReport) {
    println!();
    println!("{}", style(format!("Object: {}", report.key)).bold().underlined());
    println!("  Fragments: {}/{} present", report.present, report.total);
    for index in &report.absent_indices {
        println!("    {} shard {} unavailable", style(symbols::CROSS).red(), index);
    }

    match report.original_len {
        Some(len) => println!("  Length:    {} bytes", len),
        None => println!("  Length:    unknown"),
    }

    let parity = match report.parity_consistent {
        Some(true) => style("consistent".to_string()).green(),
        Some(false) => style("INCONSISTENT".to_string()).red(),
        None => style("not checked (fragments missing)".to_string()).dim(),
    };
    println!("  Parity:    {}", parity);

    let status = if report.is_healthy() && report.absent_indices.is_empty() {
        style(format!("{} healthy", symbols::CHECK)).green()
    } else if report.is_healthy() {
        style(format!("{} degraded (recoverable)", symbols::WARN)).yellow()
    } else {
        style(format!("{} unhealthy", symbols::CROSS)).red()
    };
    println!("  Status:    {}", status);
    println!();
}
