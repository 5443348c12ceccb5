//! Load command - import record files into the database.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cornbelt_core::Config;
use cornbelt_store::{Loader, Store};

use crate::cli::OutputFormat;
use crate::format::{FormatOptions, format_json, format_load_text};

/// Execute the load command.
pub fn cmd_load(
    data_dir: Option<PathBuf>,
    format: OutputFormat,
    config: &Config,
    database: &Path,
    opts: &FormatOptions,
) -> Result<()> {
    let registry = config.registry().context("Invalid location configuration")?;
    let data_dir = data_dir.unwrap_or_else(|| config.output_dir.clone());

    let store = Store::open(database)
        .with_context(|| format!("Failed to open database {}", database.display()))?;

    let summary = Loader::new(&store, &registry)
        .run(&data_dir)
        .with_context(|| format!("Failed to load {}", data_dir.display()))?;

    let formatted = match format {
        OutputFormat::Json => format_json(&summary)?,
        OutputFormat::Text => format_load_text(&summary, opts),
    };
    print!("{}", formatted);

    Ok(())
}
