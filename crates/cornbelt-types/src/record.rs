//! Daily weather records, variables, data types and batches.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::Date;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

use crate::error::{ValidationError, ValidationResult};

/// Calendar date format used in files, the store and request parameters.
pub const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Compact date format used to stamp forecast and combined file names.
pub const STAMP_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year][month][day]");

/// Parse a calendar date.
///
/// Accepts `YYYY-MM-DD` and datetime strings whose first ten characters are
/// a date (`2024-01-01T00:00:00.000`, `2024-01-01 00:00:00`).
///
/// ```
/// use cornbelt_types::parse_date;
///
/// assert!(parse_date("2024-02-29").is_ok());
/// assert!(parse_date("2024-02-29T00:00:00.000").is_ok());
/// assert!(parse_date("2023-02-29").is_err());
/// ```
pub fn parse_date(raw: &str) -> ValidationResult<Date> {
    let trimmed = raw.trim();
    let day = trimmed.split(['T', ' ']).next().unwrap_or(trimmed);
    Date::parse(day, DATE_FORMAT).map_err(|_| ValidationError::InvalidDate(raw.to_string()))
}

/// Format a date as `YYYY-MM-DD`.
pub fn format_date(date: Date) -> String {
    date.format(DATE_FORMAT)
        .unwrap_or_else(|_| date.to_string())
}

/// Format a date as `YYYYMMDD`.
pub fn format_stamp(date: Date) -> String {
    date.format(STAMP_FORMAT)
        .unwrap_or_else(|_| format_date(date).replace('-', ""))
}

/// Serde adapter for `YYYY-MM-DD` dates.
pub mod iso_date {
    use super::*;

    pub fn serialize<S: Serializer>(date: &Date, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_date(*date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Date, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_date(&raw).map_err(serde::de::Error::custom)
    }
}

/// Weather codes arrive as JSON integers from the API and as floats from
/// files written by dataframe tooling (`3.0`).
mod weather_code {
    use super::*;

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i32>, D::Error> {
        let raw = Option::<f64>::deserialize(deserializer)?;
        Ok(raw.filter(|v| v.is_finite()).map(|v| v.round() as i32))
    }
}

/// The nine daily values recorded for one location and day.
///
/// Every value is optional; `None` is serialized as `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyValues {
    #[serde(default, deserialize_with = "weather_code::deserialize")]
    pub weather_code: Option<i32>,
    #[serde(default)]
    pub temperature_2m_max: Option<f64>,
    #[serde(default)]
    pub temperature_2m_min: Option<f64>,
    #[serde(default)]
    pub daylight_duration: Option<f64>,
    #[serde(default)]
    pub precipitation_sum: Option<f64>,
    #[serde(default)]
    pub shortwave_radiation_sum: Option<f64>,
    #[serde(default)]
    pub et0_fao_evapotranspiration: Option<f64>,
    #[serde(default)]
    pub soil_moisture_0_to_100cm_mean: Option<f64>,
    #[serde(default)]
    pub vapour_pressure_deficit_max: Option<f64>,
}

/// One day of weather at one location.
///
/// # Examples
///
/// ```
/// use cornbelt_types::{WeatherRecord, parse_date};
///
/// let mut record = WeatherRecord::new(parse_date("2024-07-01").unwrap(), "iowa_center");
/// record.values.temperature_2m_max = Some(31.5);
///
/// let json = serde_json::to_string(&record).unwrap();
/// assert!(json.starts_with(r#"{"date":"2024-07-01","location":"iowa_center""#));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    #[serde(with = "iso_date")]
    pub date: Date,
    pub location: String,
    #[serde(flatten)]
    pub values: DailyValues,
}

impl WeatherRecord {
    /// Create a record with every value missing.
    pub fn new(date: Date, location: impl Into<String>) -> Self {
        Self {
            date,
            location: location.into(),
            values: DailyValues::default(),
        }
    }

    /// Value of one variable as a float.
    pub fn get(&self, variable: Variable) -> Option<f64> {
        variable.value(&self.values)
    }
}

/// The daily variables requested from the API, in column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Variable {
    #[serde(rename = "weather_code")]
    WeatherCode,
    #[serde(rename = "temperature_2m_max")]
    Temperature2mMax,
    #[serde(rename = "temperature_2m_min")]
    Temperature2mMin,
    #[serde(rename = "daylight_duration")]
    DaylightDuration,
    #[serde(rename = "precipitation_sum")]
    PrecipitationSum,
    #[serde(rename = "shortwave_radiation_sum")]
    ShortwaveRadiationSum,
    #[serde(rename = "et0_fao_evapotranspiration")]
    Et0FaoEvapotranspiration,
    #[serde(rename = "soil_moisture_0_to_100cm_mean")]
    SoilMoisture0To100cmMean,
    #[serde(rename = "vapour_pressure_deficit_max")]
    VapourPressureDeficitMax,
}

impl Variable {
    /// All variables in column order.
    pub const ALL: [Variable; 9] = [
        Variable::WeatherCode,
        Variable::Temperature2mMax,
        Variable::Temperature2mMin,
        Variable::DaylightDuration,
        Variable::PrecipitationSum,
        Variable::ShortwaveRadiationSum,
        Variable::Et0FaoEvapotranspiration,
        Variable::SoilMoisture0To100cmMean,
        Variable::VapourPressureDeficitMax,
    ];

    /// Variables subject to the plausible temperature range check.
    pub const TEMPERATURES: [Variable; 2] = [Variable::Temperature2mMax, Variable::Temperature2mMin];

    /// Open-Meteo parameter name, also the column name in files and the store.
    pub fn as_str(self) -> &'static str {
        match self {
            Variable::WeatherCode => "weather_code",
            Variable::Temperature2mMax => "temperature_2m_max",
            Variable::Temperature2mMin => "temperature_2m_min",
            Variable::DaylightDuration => "daylight_duration",
            Variable::PrecipitationSum => "precipitation_sum",
            Variable::ShortwaveRadiationSum => "shortwave_radiation_sum",
            Variable::Et0FaoEvapotranspiration => "et0_fao_evapotranspiration",
            Variable::SoilMoisture0To100cmMean => "soil_moisture_0_to_100cm_mean",
            Variable::VapourPressureDeficitMax => "vapour_pressure_deficit_max",
        }
    }

    /// Read this variable from a set of daily values.
    pub fn value(self, values: &DailyValues) -> Option<f64> {
        match self {
            Variable::WeatherCode => values.weather_code.map(f64::from),
            Variable::Temperature2mMax => values.temperature_2m_max,
            Variable::Temperature2mMin => values.temperature_2m_min,
            Variable::DaylightDuration => values.daylight_duration,
            Variable::PrecipitationSum => values.precipitation_sum,
            Variable::ShortwaveRadiationSum => values.shortwave_radiation_sum,
            Variable::Et0FaoEvapotranspiration => values.et0_fao_evapotranspiration,
            Variable::SoilMoisture0To100cmMean => values.soil_moisture_0_to_100cm_mean,
            Variable::VapourPressureDeficitMax => values.vapour_pressure_deficit_max,
        }
    }

    /// Write this variable into a set of daily values.
    ///
    /// Weather codes are rounded to the nearest integer. Non-finite values
    /// are stored as missing.
    pub fn set(self, values: &mut DailyValues, value: Option<f64>) {
        let value = value.filter(|v| v.is_finite());
        match self {
            Variable::WeatherCode => values.weather_code = value.map(|v| v.round() as i32),
            Variable::Temperature2mMax => values.temperature_2m_max = value,
            Variable::Temperature2mMin => values.temperature_2m_min = value,
            Variable::DaylightDuration => values.daylight_duration = value,
            Variable::PrecipitationSum => values.precipitation_sum = value,
            Variable::ShortwaveRadiationSum => values.shortwave_radiation_sum = value,
            Variable::Et0FaoEvapotranspiration => values.et0_fao_evapotranspiration = value,
            Variable::SoilMoisture0To100cmMean => values.soil_moisture_0_to_100cm_mean = value,
            Variable::VapourPressureDeficitMax => values.vapour_pressure_deficit_max = value,
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variable {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Variable::ALL
            .into_iter()
            .find(|v| v.as_str() == s.trim())
            .ok_or_else(|| ValidationError::UnknownVariable(s.to_string()))
    }
}

/// Whether a record was observed or forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Historical,
    Forecast,
}

impl DataType {
    /// Lowercase label used in file names, the store and reports.
    pub fn as_str(self) -> &'static str {
        match self {
            DataType::Historical => "historical",
            DataType::Forecast => "forecast",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "historical" => Ok(DataType::Historical),
            "forecast" => Ok(DataType::Forecast),
            _ => Err(ValidationError::UnknownDataType(s.to_string())),
        }
    }
}

/// An ordered sequence of records from one fetch, file read, or merge.
///
/// `date_errors` holds the raw date values of rows that could not be decoded
/// into a [`WeatherRecord`]. They count towards the batch size so the quality
/// validator can report them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    pub records: Vec<WeatherRecord>,
    pub date_errors: Vec<String>,
}

impl Batch {
    /// Batch of well-formed records.
    pub fn new(records: Vec<WeatherRecord>) -> Self {
        Self {
            records,
            date_errors: Vec::new(),
        }
    }

    /// Total rows, including rows with unparsable dates.
    pub fn len(&self) -> usize {
        self.records.len() + self.date_errors.len()
    }

    /// True when there are no rows at all.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.date_errors.is_empty()
    }

    /// Earliest and latest record date.
    pub fn date_range(&self) -> Option<(Date, Date)> {
        let first = self.records.iter().map(|r| r.date).min()?;
        let last = self.records.iter().map(|r| r.date).max()?;
        Some((first, last))
    }

    /// Iterate the well-formed records.
    pub fn iter(&self) -> std::slice::Iter<'_, WeatherRecord> {
        self.records.iter()
    }
}

impl From<Vec<WeatherRecord>> for Batch {
    fn from(records: Vec<WeatherRecord>) -> Self {
        Self::new(records)
    }
}

impl FromIterator<WeatherRecord> for Batch {
    fn from_iter<I: IntoIterator<Item = WeatherRecord>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Batch {
    type Item = &'a WeatherRecord;
    type IntoIter = std::slice::Iter<'a, WeatherRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
