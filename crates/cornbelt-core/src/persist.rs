//! Record files: naming, writing, reading and inspection.
//!
//! Files are JSON Lines, one record object per line, UTF-8. Dates are written
//! as `YYYY-MM-DD` and missing values as `null`. [`write_csv`] writes the same
//! records as CSV for spreadsheet use.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::Date;
use tracing::{debug, error, info, warn};

use cornbelt_types::{
    Batch, DailyValues, DataType, Variable, WeatherRecord, format_date, format_stamp, parse_date,
};

use crate::error::{Error, Result};

/// Kind of record file, used as the file name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Historical,
    Forecast,
    /// Merged historical and forecast records. Never loaded into the store.
    Combined,
}

impl FileKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FileKind::Historical => "historical",
            FileKind::Forecast => "forecast",
            FileKind::Combined => "combined",
        }
    }

    /// Detect the kind from a file name such as `forecast_iowa_center_20250101.json`.
    pub fn from_file_name(name: &str) -> Option<Self> {
        if !name.ends_with(".json") {
            return None;
        }
        [FileKind::Historical, FileKind::Forecast, FileKind::Combined]
            .into_iter()
            .find(|kind| {
                name.strip_prefix(kind.as_str())
                    .is_some_and(|rest| rest.starts_with('_'))
            })
    }

    /// Store data type for loadable kinds.
    pub fn data_type(self) -> Option<DataType> {
        match self {
            FileKind::Historical => Some(DataType::Historical),
            FileKind::Forecast => Some(DataType::Forecast),
            FileKind::Combined => None,
        }
    }
}

impl From<DataType> for FileKind {
    fn from(data_type: DataType) -> Self {
        match data_type {
            DataType::Historical => FileKind::Historical,
            DataType::Forecast => FileKind::Forecast,
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build a file name `<kind>_<location>_<stamp>.json`.
///
/// The location is lowercased and spaces become underscores.
///
/// ```
/// use cornbelt_core::persist::{FileKind, file_name};
///
/// assert_eq!(
///     file_name(FileKind::Forecast, "Iowa Center", "20250928"),
///     "forecast_iowa_center_20250928.json"
/// );
/// ```
pub fn file_name(kind: impl Into<FileKind>, location: &str, stamp: &str) -> String {
    let location = location.trim().to_lowercase().replace(' ', "_");
    format!("{}_{}_{}.json", kind.into().as_str(), location, stamp)
}

/// Historical files are stamped with the archive end date (`YYYY-MM-DD`).
pub fn historical_file_name(location: &str, end_date: Date) -> String {
    file_name(FileKind::Historical, location, &format_date(end_date))
}

/// Forecast and combined files are stamped with the run date (`YYYYMMDD`).
pub fn dated_file_name(kind: FileKind, location: &str, run_date: Date) -> String {
    file_name(kind, location, &format_stamp(run_date))
}

/// Write a batch as JSON Lines.
///
/// Returns `false` without touching the filesystem when the batch has no
/// records, and `false` on any I/O failure or when the written file is
/// empty. Failures are logged, never propagated.
pub fn write(batch: &Batch, destination: &Path) -> bool {
    if batch.records.is_empty() {
        warn!("No records to save to {}", destination.display());
        return false;
    }
    if !batch.date_errors.is_empty() {
        debug!(
            "Dropping {} row(s) with unparsable dates from {}",
            batch.date_errors.len(),
            destination.display()
        );
    }

    report_write(batch, destination, write_lines(batch, destination))
}

/// Write a batch as CSV with a header row of `date`, `location` and every
/// daily variable. Missing values are empty fields.
///
/// Same contract as [`write`].
pub fn write_csv(batch: &Batch, destination: &Path) -> bool {
    if batch.records.is_empty() {
        warn!("No records to save to {}", destination.display());
        return false;
    }

    report_write(batch, destination, write_csv_rows(batch, destination))
}

/// Path of the CSV copy written next to a record file.
pub fn csv_path(destination: &Path) -> PathBuf {
    destination.with_extension("csv")
}

fn report_write(batch: &Batch, destination: &Path, result: io::Result<u64>) -> bool {
    match result {
        Ok(0) => {
            error!("File {} is empty after writing", destination.display());
            false
        }
        Ok(bytes) => {
            info!(
                "Saved {} records to {} ({} bytes)",
                batch.records.len(),
                destination.display(),
                bytes
            );
            true
        }
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            error!("Permission denied writing {}: {}", destination.display(), e);
            false
        }
        Err(e) => {
            error!("Failed to write {}: {}", destination.display(), e);
            false
        }
    }
}

fn create_parent(destination: &Path) -> io::Result<()> {
    if let Some(parent) = destination.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn write_lines(batch: &Batch, destination: &Path) -> io::Result<u64> {
    create_parent(destination)?;

    let mut writer = BufWriter::new(File::create(destination)?);
    for record in &batch.records {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    drop(writer);

    Ok(fs::metadata(destination)?.len())
}

fn write_csv_rows(batch: &Batch, destination: &Path) -> io::Result<u64> {
    create_parent(destination)?;

    let mut writer = csv::Writer::from_writer(File::create(destination)?);
    let header = ["date", "location"]
        .into_iter()
        .chain(Variable::ALL.iter().map(|v| v.as_str()));
    writer.write_record(header)?;

    for record in &batch.records {
        let mut row = vec![format_date(record.date), record.location.clone()];
        row.extend(Variable::ALL.iter().map(|&variable| match variable {
            Variable::WeatherCode => record
                .values
                .weather_code
                .map(|code| code.to_string())
                .unwrap_or_default(),
            _ => record.get(variable).map(|v| v.to_string()).unwrap_or_default(),
        }));
        writer.write_record(&row)?;
    }
    writer.flush()?;
    drop(writer);

    Ok(fs::metadata(destination)?.len())
}

/// One row as stored on disk, before its date is checked.
#[derive(Deserialize)]
struct StoredRow {
    #[serde(default)]
    date: Value,
    #[serde(default)]
    location: String,
    #[serde(flatten)]
    values: DailyValues,
}

impl StoredRow {
    fn into_record(self) -> std::result::Result<WeatherRecord, String> {
        let parsed = match &self.date {
            Value::String(raw) => parse_date(raw).map_err(|_| raw.clone()),
            other => Err(other.to_string()),
        };
        parsed.map(|date| WeatherRecord {
            date,
            location: self.location,
            values: self.values,
        })
    }
}

/// Read raw JSON objects with the line (or array position) they came from.
fn read_rows(path: &Path) -> Result<Vec<(usize, Map<String, Value>)>> {
    let content = fs::read_to_string(path).map_err(|e| Error::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    let json_error = |line: usize, source: serde_json::Error| Error::Json {
        path: path.to_path_buf(),
        line,
        source,
    };

    if content.trim_start().starts_with('[') {
        let rows: Vec<Map<String, Value>> =
            serde_json::from_str(&content).map_err(|e| json_error(e.line(), e))?;
        return Ok(rows.into_iter().enumerate().map(|(i, row)| (i + 1, row)).collect());
    }

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line)
                .map(|row| (i + 1, row))
                .map_err(|e| json_error(i + 1, e))
        })
        .collect()
}

/// Read a record file written by [`write`] (or a JSON array of records).
///
/// Rows whose date cannot be parsed are kept in [`Batch::date_errors`].
pub fn read_batch(path: &Path) -> Result<Batch> {
    let mut batch = Batch::default();

    for (line, row) in read_rows(path)? {
        let row: StoredRow = serde_json::from_value(Value::Object(row)).map_err(|e| Error::Json {
            path: path.to_path_buf(),
            line,
            source: e,
        })?;
        match row.into_record() {
            Ok(record) => batch.records.push(record),
            Err(raw) => batch.date_errors.push(raw),
        }
    }

    debug!(
        "Read {} records ({} with bad dates) from {}",
        batch.records.len(),
        batch.date_errors.len(),
        path.display()
    );
    Ok(batch)
}

/// Summary of one record file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileSummary {
    pub path: PathBuf,
    pub kind: Option<FileKind>,
    pub records: usize,
    pub first_date: Option<String>,
    pub last_date: Option<String>,
    pub location: Option<String>,
    /// Value columns present in the file, in first-seen order.
    pub variables: Vec<String>,
    /// Null (or absent) counts per column, only for columns with nulls.
    pub null_counts: BTreeMap<String, usize>,
}

/// Inspect a record file: row count, date span, location, columns and nulls.
pub fn inspect(path: &Path) -> Result<FileSummary> {
    let rows = read_rows(path)?;
    let batch = read_batch(path)?;

    let mut variables: Vec<String> = Vec::new();
    let mut seen = BTreeSet::new();
    for (_, row) in &rows {
        for key in row.keys() {
            if key != "date" && key != "location" && seen.insert(key.clone()) {
                variables.push(key.clone());
            }
        }
    }

    let mut null_counts = BTreeMap::new();
    let columns = ["date", "location"]
        .into_iter()
        .chain(variables.iter().map(String::as_str));
    for column in columns {
        let nulls = rows
            .iter()
            .filter(|(_, row)| row.get(column).is_none_or(Value::is_null))
            .count();
        if nulls > 0 {
            null_counts.insert(column.to_string(), nulls);
        }
    }

    let range = batch.date_range();
    Ok(FileSummary {
        path: path.to_path_buf(),
        kind: path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(FileKind::from_file_name),
        records: rows.len(),
        first_date: range.map(|(first, _)| format_date(first)),
        last_date: range.map(|(_, last)| format_date(last)),
        location: batch.records.first().map(|r| r.location.clone()),
        variables,
        null_counts,
    })
}

/// List `*.json` files in a directory, sorted by name.
pub fn list_json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| Error::Read {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    Ok(files)
}
