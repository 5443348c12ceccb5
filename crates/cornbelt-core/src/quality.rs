//! Data quality validation.
//!
//! Validation never fails: every problem found in a batch becomes an entry in
//! the returned [`QualityReport`].

use std::collections::BTreeMap;

use tracing::{info, warn};

use cornbelt_types::{Batch, DateRange, MissingData, QualityReport, QualityStatus, Variable};

/// Columns with more than this share of missing values are flagged.
pub const MISSING_THRESHOLD_PCT: f64 = 10.0;

/// Plausible daily temperature bounds in °C (inclusive).
pub const TEMPERATURE_RANGE: (f64, f64) = (-50.0, 60.0);

/// Validate a batch against all daily variables.
///
/// # Example
///
/// ```
/// use cornbelt_core::quality::validate;
/// use cornbelt_types::{Batch, QualityStatus};
///
/// let report = validate(&Batch::default(), "iowa_center");
/// assert_eq!(report.status, QualityStatus::Error);
/// ```
pub fn validate(batch: &Batch, location: &str) -> QualityReport {
    validate_columns(batch, location, &Variable::ALL)
}

/// Validate a batch, accounting missing values only for `columns`.
///
/// Used when the request asked for a subset of variables, so unrequested
/// columns are not reported as missing.
pub fn validate_columns(batch: &Batch, location: &str, columns: &[Variable]) -> QualityReport {
    info!("Validating data quality for {}", location);

    if batch.is_empty() {
        warn!("No records to validate for {}", location);
        return QualityReport::empty(location);
    }

    let mut data_issues = Vec::new();

    if let Some(first) = batch.date_errors.first() {
        data_issues.push(format!(
            "date: {} unparsable value(s), first: '{}'",
            batch.date_errors.len(),
            first
        ));
    }

    // rows with unparsable dates count towards the denominator
    let rows = batch.len();
    let mut missing_data = BTreeMap::new();
    if !batch.records.is_empty() {
        let mut columns = columns.to_vec();
        columns.sort();
        columns.dedup();

        for variable in columns {
            let count = batch
                .records
                .iter()
                .filter(|r| r.get(variable).is_none())
                .count();
            if count == 0 {
                continue;
            }

            let pct = count as f64 / rows as f64 * 100.0;
            missing_data.insert(
                variable,
                MissingData {
                    count,
                    percentage: round2(pct),
                },
            );
            if pct > MISSING_THRESHOLD_PCT {
                data_issues.push(format!("{}: {:.1}% missing", variable, pct));
            }
        }
    }

    let (low, high) = TEMPERATURE_RANGE;
    for variable in Variable::TEMPERATURES {
        let out_of_range = batch
            .records
            .iter()
            .filter_map(|r| r.get(variable))
            .any(|t| !(low..=high).contains(&t));
        if out_of_range {
            data_issues.push(format!(
                "{}: values out of range ({}°C to {}°C)",
                variable, low, high
            ));
        }
    }

    let status = if data_issues.is_empty() {
        QualityStatus::Ok
    } else {
        warn!(
            "Data quality issues for {}: {} issue(s) found",
            location,
            data_issues.len()
        );
        QualityStatus::Warning
    };

    QualityReport {
        location: location.to_string(),
        total_records: batch.len(),
        date_range: batch
            .date_range()
            .map(|(start, end)| DateRange { start, end }),
        missing_data,
        data_issues,
        status,
        message: None,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
