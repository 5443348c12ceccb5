//! Command-line interface for the cornbelt weather data pipeline.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `collect` | Fetch data from Open-Meteo and write record files |
//! | `load` | Load record files into SQLite |
//! | `report` | Print aggregate weather reports |
//! | `check` | Inspect record files |
//! | `config` | Manage configuration |
//! | `completions` | Generate shell completions |

mod cli;
mod commands;
mod format;

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use cornbelt_core::Config;
use cornbelt_core::config::default_config_path;
use time::UtcOffset;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::format::FormatOptions;

fn main() -> Result<()> {
    // The local offset can only be read while the process is single-threaded.
    let local_offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);

    let runtime = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
    runtime.block_on(run(local_offset))
}

async fn run(local_offset: UtcOffset) -> Result<()> {
    let cli = Cli::parse();

    // Handle completions command early (before tracing init)
    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "cornbelt", &mut io::stdout());
        return Ok(());
    }

    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    // stdout carries command output
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let config = load_config(&config_path, cli.config.is_some())?;
    let database = resolve_database(cli.database.clone(), &config);
    let opts = FormatOptions::new(cli.no_color);

    match cli.command {
        Commands::Collect { args, output } => {
            commands::cmd_collect(args, output.format, config, local_offset, &opts).await
        }
        Commands::Load { data_dir, output } => {
            commands::cmd_load(data_dir, output.format, &config, &database, &opts)
        }
        Commands::Report { year, output } => {
            commands::cmd_report(year, output.format, &database, &opts)
        }
        Commands::Check { data_dir, output } => {
            commands::cmd_check(data_dir, output.format, &config, &opts)
        }
        Commands::Config { action } => {
            commands::cmd_config(action, &config, &config_path, &database)
        }
        Commands::Completions { .. } => {
            // Already handled above
            unreachable!()
        }
    }
}

/// Load the config file. A missing file means defaults unless the path was
/// given explicitly.
fn load_config(path: &Path, explicit: bool) -> Result<Config> {
    if path.exists() {
        tracing::debug!("Loading configuration from {}", path.display());
        Config::load(path).with_context(|| format!("Failed to load {}", path.display()))
    } else if explicit {
        anyhow::bail!("Configuration file not found: {}", path.display())
    } else {
        Ok(Config::default())
    }
}

/// `--database` wins over the config file, which wins over the platform default.
fn resolve_database(flag: Option<PathBuf>, config: &Config) -> PathBuf {
    flag.or_else(|| config.database.clone())
        .unwrap_or_else(cornbelt_store::default_db_path)
}
