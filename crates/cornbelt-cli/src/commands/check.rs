//! Check command - inspect record files without loading them.

use std::path::PathBuf;

use anyhow::{Context, Result};
use cornbelt_core::Config;
use cornbelt_core::persist;
use serde::Serialize;
use tracing::warn;

use crate::cli::OutputFormat;
use crate::format::{FormatOptions, UnreadableFile, format_check_text, format_json};

#[derive(Serialize)]
struct CheckOutput<'a> {
    files: &'a [cornbelt_core::FileSummary],
    unreadable: &'a [UnreadableFile],
}

/// Execute the check command.
pub fn cmd_check(
    data_dir: Option<PathBuf>,
    format: OutputFormat,
    config: &Config,
    opts: &FormatOptions,
) -> Result<()> {
    let data_dir = data_dir.unwrap_or_else(|| config.output_dir.clone());
    let paths = persist::list_json_files(&data_dir)
        .with_context(|| format!("Failed to list {}", data_dir.display()))?;

    if paths.is_empty() {
        warn!("No JSON files in {}", data_dir.display());
    }

    let mut files = Vec::new();
    let mut unreadable = Vec::new();
    for path in paths {
        match persist::inspect(&path) {
            Ok(summary) => files.push(summary),
            Err(e) => unreadable.push(UnreadableFile {
                path,
                error: e.to_string(),
            }),
        }
    }

    let formatted = match format {
        OutputFormat::Json => format_json(&CheckOutput {
            files: &files,
            unreadable: &unreadable,
        })?,
        OutputFormat::Text => format_check_text(&files, &unreadable, opts),
    };
    print!("{}", formatted);

    Ok(())
}
