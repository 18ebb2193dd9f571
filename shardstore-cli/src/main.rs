//! ShardStore CLI
//!
//! Command-line front end for the erasure-coded object store.
//!
//! # Commands
//! - `save` - Store a local file under its file name
//! - `load` - Rebuild an object and write it to stdout
//! - `verify` - Report fragment availability and parity health
//! - `targets` - List discovered targets in shard order
//! - `config` - Show or initialize configuration
//!
//! # Configuration
//! Config file: ~/.shardstore/config.toml
//! Logs go to stderr (`RUST_LOG` to adjust), so `load` output stays clean.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shardstore_core::ErasureConfig;
use shardstore_storage::{StoreConfig, StoreEngine};
use std::path::PathBuf;

mod commands;
mod config;
mod symbols;

use commands::{load, save, targets, verify};
use config::{Overrides, StoreSettings};

#[derive(Parser)]
#[command(name = "shardstore")]
#[command(about = "Erasure-coded object store over local directories")]
#[command(version)]
struct Cli {
    /// Directory whose child directories are the targets (overrides config file)
    #[arg(long, global = true, env = "SHARDSTORE_BASE_DIR")]
    base_dir: Option<PathBuf>,

    /// Number of data shards, k (overrides config file)
    #[arg(short = 'k', long, global = true, env = "SHARDSTORE_DATA_SHARDS")]
    data_shards: Option<usize>,

    /// Number of parity shards, m (overrides config file)
    #[arg(short = 'm', long, global = true, env = "SHARDSTORE_PARITY_SHARDS")]
    parity_shards: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a local file; its file name becomes the object key
    Save {
        /// Path to the file
        path: PathBuf,
    },

    /// Rebuild an object and write it to stdout
    Load {
        /// Object key
        key: String,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check fragment availability and parity for an object
    Verify {
        /// Object key
        key: String,
    },

    /// List discovered targets and their shard index
    Targets,

    /// Show or initialize configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration
    Show,

    /// Show config file path
    Path,

    /// Initialize config file with defaults
    Init {
        /// Overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging; stdout is reserved for object data
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    // Load configuration from ~/.shardstore/config.toml
    let cfg = config::load_config();

    // CLI args override config file
    let cwd = std::env::current_dir().context("Could not determine current directory")?;
    let settings = cfg.resolve(
        Overrides {
            data_shards: cli.data_shards,
            parity_shards: cli.parity_shards,
            base_dir: cli.base_dir,
        },
        &cwd,
    );

    match cli.command {
        Commands::Save { path } => {
            let engine = open_store(&settings).await?;
            save::run(&engine, save::SaveConfig { path }).await?;
        }

        Commands::Load { key, output } => {
            let engine = open_store(&settings).await?;
            load::run(&engine, load::LoadConfig { key, output }).await?;
        }

        Commands::Verify { key } => {
            let engine = open_store(&settings).await?;
            verify::run(&engine, &key).await?;
        }

        Commands::Targets => {
            let config = targets::TargetsConfig {
                base_dir: settings.base_dir.clone(),
                erasure: erasure_config(&settings)?,
            };
            targets::run(config).await?;
        }

        Commands::Config { command } => {
            handle_config_command(command, &settings)?;
        }
    }

    Ok(())
}

fn erasure_config(settings: &StoreSettings) -> Result<ErasureConfig> {
    ErasureConfig::new(settings.data_shards, settings.parity_shards)
        .context("Invalid erasure configuration")
}

/// Discover targets and build the engine; fails before any object I/O when
/// the configuration is unusable
async fn open_store(settings: &StoreSettings) -> Result<StoreEngine> {
    let erasure = erasure_config(settings)?;
    let config = StoreConfig::discover(erasure, &settings.base_dir)
        .await
        .with_context(|| format!("Failed to create store at {}", settings.base_dir.display()))?;
    tracing::debug!(?config, "store opened");
    Ok(StoreEngine::new(config)?)
}

/// Handle config subcommands
fn handle_config_command(command: Option<ConfigCommands>, settings: &StoreSettings) -> Result<()> {
    use console::style;

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("{}", style("ShardStore Configuration").bold().underlined());
            println!();
            println!("{}", style("[store]").cyan());
            println!("  data_shards = {}", settings.data_shards);
            println!("  parity_shards = {}", settings.parity_shards);
            println!("  base_dir = \"{}\"", settings.base_dir.display());
            println!();

            // Show config file path
            if let Ok(path) = config::config_file_path() {
                println!("{} {}", style("Config file:").dim(), path.display());
                if !path.exists() {
                    println!(
                        "{} Run '{}' to create it",
                        style("(not created yet)").yellow(),
                        style("shardstore config init").green()
                    );
                }
            }
        }

        Some(ConfigCommands::Path) => {
            println!("{}", config::config_file_path()?.display());
        }

        Some(ConfigCommands::Init { force }) => {
            let path = config::config_file_path()?;
            if path.exists() && !force {
                println!(
                    "{} Config file already exists at {}",
                    style(symbols::WARN).yellow(),
                    path.display()
                );
                println!("Use --force to overwrite");
                return Ok(());
            }

            let path = config::save_config(&config::ShardStoreConfig::default())?;
            println!(
                "{} Config file created at {}",
                style(symbols::CHECK).green(),
                path.display()
            );
        }
    }

    Ok(())
}
