//! Output formatting utilities for text and JSON output.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Result;
use cornbelt_core::{FileSummary, PipelineReport};
use cornbelt_store::{LoadSummary, Report};
use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::builder::Builder;
use tabled::settings::object::Columns;
use tabled::settings::{Alignment, Style};
use tabled::{Table, Tabled};

/// Formatting options for output.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatOptions {
    /// Disable colored output.
    pub no_color: bool,
}

impl FormatOptions {
    pub fn new(no_color: bool) -> Self {
        Self { no_color }
    }

    /// `[label]` in green or red.
    fn marker(&self, label: &str, ok: bool) -> String {
        if self.no_color {
            format!("[{}]", label)
        } else if ok {
            format!("[{}]", label.green())
        } else {
            format!("[{}]", label.red())
        }
    }

    fn title(&self, text: &str) -> String {
        if self.no_color {
            text.to_string()
        } else {
            format!("{}", text.bold())
        }
    }
}

/// Pretty JSON followed by a newline.
pub fn format_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)? + "\n")
}

fn number(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.2}", v))
}

fn text(value: Option<&str>) -> String {
    value.unwrap_or("-").to_string()
}

/// Render rows with rounded borders. Columns from `numbers_from` on are
/// right-aligned. Empty when there are no rows.
fn render<T: Tabled>(rows: Vec<T>, numbers_from: usize) -> String {
    if rows.is_empty() {
        return String::new();
    }
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    table.modify(Columns::new(numbers_from..), Alignment::right());
    format!("{}\n", table)
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

fn section(out: &mut String, opts: &FormatOptions, heading: &str, body: Option<String>) {
    let _ = writeln!(out, "{}", opts.title(heading));
    match body {
        Some(body) if body.is_empty() => out.push_str("(no data)\n"),
        Some(body) => out.push_str(&body),
        None => out.push_str("(unavailable, see log)\n"),
    }
    out.push('\n');
}

// ============================================================================
// Collect
// ============================================================================

pub fn format_outcomes_text(report: &PipelineReport, opts: &FormatOptions) -> String {
    let mut out = String::new();
    for outcome in &report.outcomes {
        let ok = outcome.successes();
        let total = outcome.steps().len();
        let label = match ok {
            0 => "FAILED",
            n if n == total => "OK",
            _ => "PARTIAL",
        };
        let steps: Vec<String> = outcome
            .steps()
            .iter()
            .map(|(step, success)| format!("{}{}", if *success { "+" } else { "-" }, step))
            .collect();
        let _ = writeln!(
            out,
            "{} {}: {}/{} ({})",
            opts.marker(label, ok > 0),
            outcome.location,
            ok,
            total,
            steps.join(" ")
        );
    }
    let _ = writeln!(
        out,
        "{}/{} locations collected{}",
        report.successful_locations(),
        report.outcomes.len(),
        if report.interrupted { " (interrupted)" } else { "" }
    );
    out
}

// ============================================================================
// Load
// ============================================================================

pub fn format_load_text(summary: &LoadSummary, opts: &FormatOptions) -> String {
    #[derive(Tabled)]
    struct FileRow {
        #[tabled(rename = "File")]
        file: String,
        #[tabled(rename = "Type")]
        data_type: String,
        #[tabled(rename = "Inserted")]
        inserted: usize,
    }

    #[derive(Tabled)]
    struct LocationRow {
        #[tabled(rename = "Location")]
        location: String,
        #[tabled(rename = "Rows")]
        records: u64,
        #[tabled(rename = "First")]
        first: String,
        #[tabled(rename = "Last")]
        last: String,
    }

    let mut out = String::new();

    let files = summary
        .files
        .iter()
        .map(|f| FileRow {
            file: file_label(&f.path),
            data_type: f.data_type.to_string(),
            inserted: f.inserted,
        })
        .collect();
    section(&mut out, opts, "Files", Some(render(files, 2)));

    let v = &summary.verification;
    let locations = v
        .per_location
        .iter()
        .map(|l| LocationRow {
            location: l.location.clone(),
            records: l.records,
            first: text(l.first_date.as_deref()),
            last: text(l.last_date.as_deref()),
        })
        .collect();
    section(&mut out, opts, "Database", Some(render(locations, 1)));

    let _ = writeln!(
        out,
        "New locations: {}  New rows: {}",
        summary.locations_inserted,
        summary.inserted()
    );
    let _ = writeln!(
        out,
        "Historical: {}  Forecast: {}  Total: {}",
        v.historical, v.forecast, v.total
    );
    out
}

// ============================================================================
// Report
// ============================================================================

pub fn format_report_text(report: &Report, opts: &FormatOptions) -> String {
    #[derive(Tabled)]
    struct AverageRow {
        #[tabled(rename = "Location")]
        location: String,
        #[tabled(rename = "Avg max")]
        avg_max: String,
        #[tabled(rename = "Avg min")]
        avg_min: String,
        #[tabled(rename = "Avg mean")]
        avg_mean: String,
    }

    #[derive(Tabled)]
    struct RainRow {
        #[tabled(rename = "Location")]
        location: String,
        #[tabled(rename = "Days")]
        total_days: u64,
        #[tabled(rename = "Rainy")]
        rainy_days: u64,
        #[tabled(rename = "Rainy %")]
        rainy_pct: String,
        #[tabled(rename = "Avg mm")]
        avg_precipitation: String,
    }

    #[derive(Tabled)]
    struct ExtremeRow {
        #[tabled(rename = "Location")]
        location: String,
        #[tabled(rename = "Max")]
        max: String,
        #[tabled(rename = "On")]
        max_date: String,
        #[tabled(rename = "Min")]
        min: String,
        #[tabled(rename = "On")]
        min_date: String,
    }

    #[derive(Tabled)]
    struct MonthRow {
        #[tabled(rename = "Location")]
        location: String,
        #[tabled(rename = "Month")]
        month: String,
        #[tabled(rename = "Avg mm")]
        avg_precipitation: String,
        #[tabled(rename = "Days")]
        days: u64,
    }

    #[derive(Tabled)]
    struct RecentRow {
        #[tabled(rename = "Location")]
        location: String,
        #[tabled(rename = "Type")]
        data_type: String,
        #[tabled(rename = "Avg max")]
        avg_max: String,
        #[tabled(rename = "Avg mm")]
        avg_precipitation: String,
        #[tabled(rename = "Days")]
        days: u64,
    }

    let mut out = String::new();
    let rule = "=".repeat(72);
    let _ = writeln!(out, "{}\n{}\n{}\n", rule, opts.title("WEATHER ANALYSIS REPORT"), rule);

    section(
        &mut out,
        opts,
        "1. Average temperatures (historical, °C)",
        report.temperature_averages.as_ref().map(|rows| {
            let rows = rows
                .iter()
                .map(|r| AverageRow {
                    location: r.location.clone(),
                    avg_max: number(r.avg_max),
                    avg_min: number(r.avg_min),
                    avg_mean: number(r.avg_mean),
                })
                .collect();
            render(rows, 1)
        }),
    );

    section(
        &mut out,
        opts,
        "2. Precipitation days (historical)",
        report.precipitation_days.as_ref().map(|rows| {
            let rows = rows
                .iter()
                .map(|r| RainRow {
                    location: r.location.clone(),
                    total_days: r.total_days,
                    rainy_days: r.rainy_days,
                    rainy_pct: number(r.rainy_pct),
                    avg_precipitation: number(r.avg_precipitation),
                })
                .collect();
            render(rows, 1)
        }),
    );

    section(
        &mut out,
        opts,
        "3. Temperature extremes (historical, °C)",
        report.temperature_extremes.as_ref().map(|rows| {
            let rows = rows
                .iter()
                .map(|r| ExtremeRow {
                    location: r.location.clone(),
                    max: number(r.max_temperature),
                    max_date: text(r.max_date.as_deref()),
                    min: number(r.min_temperature),
                    min_date: text(r.min_date.as_deref()),
                })
                .collect();
            render(rows, 1)
        }),
    );

    section(
        &mut out,
        opts,
        &format!("4. Monthly precipitation ({})", report.year),
        report.monthly_precipitation.as_ref().map(|rows| {
            let rows = rows
                .iter()
                .map(|r| MonthRow {
                    location: r.location.clone(),
                    month: r.month_name.clone(),
                    avg_precipitation: number(r.avg_precipitation),
                    days: r.days,
                })
                .collect();
            render(rows, 2)
        }),
    );

    section(
        &mut out,
        opts,
        &format!(
            "5. Recent {} days vs forecast",
            cornbelt_store::RECENT_WINDOW_DAYS
        ),
        report.recent_vs_forecast.as_ref().map(|rows| {
            let rows = rows
                .iter()
                .map(|r| RecentRow {
                    location: r.location.clone(),
                    data_type: r.data_type.clone(),
                    avg_max: number(r.avg_max),
                    avg_precipitation: number(r.avg_precipitation),
                    days: r.days,
                })
                .collect();
            render(rows, 2)
        }),
    );

    section(
        &mut out,
        opts,
        "Summary",
        report.summary.as_ref().map(|s| {
            format!(
                "Total records:    {}\nHistorical range: {} to {}\nLocations:        {}\nGenerated:        {}\n",
                s.total_records,
                text(s.first_date.as_deref()),
                text(s.last_date.as_deref()),
                s.locations,
                s.generated_at
            )
        }),
    );

    out
}

// ============================================================================
// Check
// ============================================================================

/// A file that could not be inspected.
#[derive(Debug, Clone, Serialize)]
pub struct UnreadableFile {
    pub path: PathBuf,
    pub error: String,
}

pub fn format_check_text(
    files: &[FileSummary],
    unreadable: &[UnreadableFile],
    opts: &FormatOptions,
) -> String {
    let mut out = String::new();

    if !files.is_empty() {
        let mut builder = Builder::default();
        builder.push_record(["", "File", "Kind", "Records", "Location", "First", "Last", "Columns"]);
        for file in files {
            let clean = file.null_counts.is_empty();
            builder.push_record([
                opts.marker(if clean { "OK" } else { "NULLS" }, clean),
                file_label(&file.path),
                file.kind.map_or("unknown", |k| k.as_str()).to_string(),
                file.records.to_string(),
                text(file.location.as_deref()),
                text(file.first_date.as_deref()),
                text(file.last_date.as_deref()),
                file.variables.len().to_string(),
            ]);
        }
        let mut table = builder.build();
        table.with(Style::rounded());
        table.modify(Columns::one(3), Alignment::right());
        table.modify(Columns::one(7), Alignment::right());
        let _ = writeln!(out, "{}", table);

        for file in files.iter().filter(|f| !f.null_counts.is_empty()) {
            let _ = writeln!(out, "Nulls in {}:", file_label(&file.path));
            for (column, nulls) in &file.null_counts {
                let _ = writeln!(out, "    {}: {}", column, nulls);
            }
        }
    }

    for file in unreadable {
        let _ = writeln!(out, "{} {}", opts.marker("ERROR", false), file.path.display());
        let _ = writeln!(out, "    {}", file.error);
    }

    let _ = writeln!(
        out,
        "{} file(s) checked, {} unreadable",
        files.len() + unreadable.len(),
        unreadable.len()
    );
    out
}
