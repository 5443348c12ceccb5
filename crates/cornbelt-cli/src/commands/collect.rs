//! Collect command - fetch weather data and write record files.

use anyhow::{Context, Result, bail};
use cornbelt_core::{Config, OpenMeteoClient, Pipeline, PipelineOptions};
use time::{Date, OffsetDateTime, UtcOffset};
use tracing::warn;

use crate::cli::{CollectArgs, OutputFormat};
use crate::format::{FormatOptions, format_json, format_outcomes_text};

/// Execute the collect command.
///
/// Fails when no step succeeded for any location or when the run was
/// interrupted with Ctrl-C.
pub async fn cmd_collect(
    args: CollectArgs,
    format: OutputFormat,
    mut config: Config,
    local_offset: UtcOffset,
    opts: &FormatOptions,
) -> Result<()> {
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }
    config.validate().context("Invalid configuration")?;

    let registry = config.registry()?;
    for name in &args.locations {
        if !registry.contains(name) {
            warn!("Unknown location '{}' ignored", name);
        }
    }

    let client = OpenMeteoClient::new(&config).context("Failed to create API client")?;
    let pipeline = Pipeline::new(&client, &config).context("Failed to set up pipeline")?;

    let options = PipelineOptions {
        historical: !args.skip_historical,
        forecast: !args.skip_forecast,
        combined: !args.no_combined,
        locations: args.locations,
        run_date: run_date(OffsetDateTime::now_utc(), local_offset),
        csv: args.csv,
    };

    let report = pipeline.run_until(&options, shutdown_signal()).await;

    let formatted = match format {
        OutputFormat::Json => format_json(&report)?,
        OutputFormat::Text => format_outcomes_text(&report, opts),
    };
    print!("{}", formatted);

    if report.interrupted {
        bail!("Collection interrupted");
    }
    if !report.any_success() {
        bail!("No collection step succeeded");
    }
    Ok(())
}

/// Today's date in the local time zone, stamped on forecast and combined files.
fn run_date(now: OffsetDateTime, local_offset: UtcOffset) -> Date {
    now.to_offset(local_offset).date()
}

/// Resolves on Ctrl-C. If the handler cannot be installed it never resolves.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{datetime, offset};

    #[test]
    fn test_run_date_uses_local_offset() {
        let now = datetime!(2025-09-28 03:30 UTC);
        assert_eq!(run_date(now, UtcOffset::UTC), time::macros::date!(2025 - 09 - 28));
        assert_eq!(run_date(now, offset!(-5)), time::macros::date!(2025 - 09 - 27));
        assert_eq!(run_date(now, offset!(+9)), time::macros::date!(2025 - 09 - 28));
    }
}
