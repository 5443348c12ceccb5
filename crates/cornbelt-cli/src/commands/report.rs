//! Report command - aggregate queries over the database.

use std::path::Path;

use anyhow::{Context, Result, bail};
use cornbelt_store::{Report, Store};

use crate::cli::OutputFormat;
use crate::format::{FormatOptions, format_json, format_report_text};

/// Execute the report command.
///
/// Sections that fail are shown as unavailable; the command only fails when
/// the database cannot be opened or nothing could be produced.
pub fn cmd_report(year: i32, format: OutputFormat, database: &Path, opts: &FormatOptions) -> Result<()> {
    if !database.exists() {
        bail!(
            "Database does not exist yet: {}. Run 'cornbelt load' first.",
            database.display()
        );
    }

    let store = Store::open(database)
        .with_context(|| format!("Failed to open database {}", database.display()))?;

    let report = Report::generate(&store, year);
    if report.failed_sections() == Report::SECTIONS {
        bail!("Every report query failed");
    }

    let formatted = match format {
        OutputFormat::Json => format_json(&report)?,
        OutputFormat::Text => format_report_text(&report, opts),
    };
    print!("{}", formatted);

    Ok(())
}
