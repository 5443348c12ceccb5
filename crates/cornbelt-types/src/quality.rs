//! Data quality report produced by the validator.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use time::Date;

use crate::record::{Variable, iso_date};

/// Overall verdict of a quality check.
///
/// Ordered by severity: `Ok < Warning < Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityStatus {
    Ok,
    Warning,
    Error,
}

impl fmt::Display for QualityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityStatus::Ok => write!(f, "ok"),
            QualityStatus::Warning => write!(f, "warning"),
            QualityStatus::Error => write!(f, "error"),
        }
    }
}

/// Missing-value tally for one column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MissingData {
    pub count: usize,
    /// Share of rows with no value, in percent, rounded to two decimals.
    pub percentage: f64,
}

/// Inclusive range of dates covered by a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(with = "iso_date")]
    pub start: Date,
    #[serde(with = "iso_date")]
    pub end: Date,
}

/// Result of validating one batch.
///
/// Constructed once by the validator and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub location: String,
    pub total_records: usize,
    pub date_range: Option<DateRange>,
    /// Only columns with at least one missing value, keyed in column order.
    pub missing_data: BTreeMap<Variable, MissingData>,
    pub data_issues: Vec<String>,
    pub status: QualityStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl QualityReport {
    /// Report for a batch with nothing in it.
    pub fn empty(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            total_records: 0,
            date_range: None,
            missing_data: BTreeMap::new(),
            data_issues: Vec::new(),
            status: QualityStatus::Error,
            message: Some("empty batch".to_string()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == QualityStatus::Ok
    }

    pub fn is_error(&self) -> bool {
        self.status == QualityStatus::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn test_status_ordering() {
        assert!(QualityStatus::Error > QualityStatus::Warning);
        assert!(QualityStatus::Warning > QualityStatus::Ok);
    }

    #[test]
    fn test_empty_report() {
        let report = QualityReport::empty("iowa_center");
        assert!(report.is_error());
        assert_eq!(report.message.as_deref(), Some("empty batch"));
        assert_eq!(report.total_records, 0);
    }

    #[test]
    fn test_report_serializes_with_column_keys() {
        let mut missing_data = BTreeMap::new();
        missing_data.insert(
            Variable::SoilMoisture0To100cmMean,
            MissingData {
                count: 2,
                percentage: 20.0,
            },
        );
        let report = QualityReport {
            location: "iowa_center".to_string(),
            total_records: 10,
            date_range: Some(DateRange {
                start: date!(2024 - 01 - 01),
                end: date!(2024 - 01 - 10),
            }),
            missing_data,
            data_issues: vec!["soil_moisture_0_to_100cm_mean: 20.0% missing".to_string()],
            status: QualityStatus::Warning,
            message: None,
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "warning");
        assert_eq!(json["date_range"]["start"], "2024-01-01");
        assert_eq!(json["missing_data"]["soil_moisture_0_to_100cm_mean"]["count"], 2);
        assert!(json.get("message").is_none());

        let back: QualityReport = serde_json::from_value(json).unwrap();
        assert_eq!(back, report);
    }
}
