//! Aggregate weather reports.
//!
//! Each query is independent and read-only. [`Report::generate`] runs them
//! all and keeps going when one fails, leaving that section empty.

use serde::Serialize;
use time::OffsetDateTime;
use time::macros::format_description;
use tracing::{debug, error};

use crate::error::{Error, Result};
use crate::store::Store;

/// Year used by the monthly precipitation section unless overridden.
pub const DEFAULT_REPORT_YEAR: i32 = 2024;

/// Days of recent history compared against the forecast.
pub const RECENT_WINDOW_DAYS: u32 = 30;

/// Average daily temperatures over the historical record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemperatureAverage {
    pub location: String,
    pub avg_max: Option<f64>,
    pub avg_min: Option<f64>,
    pub avg_mean: Option<f64>,
}

/// How often it rained.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrecipitationDays {
    pub location: String,
    pub total_days: u64,
    pub rainy_days: u64,
    pub rainy_pct: Option<f64>,
    pub avg_precipitation: Option<f64>,
}

/// Hottest and coldest days, with the first date each occurred.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemperatureExtremes {
    pub location: String,
    pub max_temperature: Option<f64>,
    pub max_date: Option<String>,
    pub min_temperature: Option<f64>,
    pub min_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyPrecipitation {
    pub location: String,
    pub month: u8,
    pub month_name: String,
    pub avg_precipitation: Option<f64>,
    pub days: u64,
}

/// Recent history or forecast averages for one location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentComparison {
    pub location: String,
    pub data_type: String,
    pub avg_max: Option<f64>,
    pub avg_precipitation: Option<f64>,
    pub days: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutiveSummary {
    pub total_records: u64,
    pub first_date: Option<String>,
    pub last_date: Option<String>,
    pub locations: u64,
    pub generated_at: String,
}

/// All report sections. A section is `None` when its query failed.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub year: i32,
    pub temperature_averages: Option<Vec<TemperatureAverage>>,
    pub precipitation_days: Option<Vec<PrecipitationDays>>,
    pub temperature_extremes: Option<Vec<TemperatureExtremes>>,
    pub monthly_precipitation: Option<Vec<MonthlyPrecipitation>>,
    pub recent_vs_forecast: Option<Vec<RecentComparison>>,
    pub summary: Option<ExecutiveSummary>,
}

impl Report {
    /// Number of sections in a report.
    pub const SECTIONS: usize = 6;

    /// Run every query against the store.
    pub fn generate(store: &Store, year: i32) -> Self {
        Self {
            year,
            temperature_averages: section("temperature averages", store.temperature_averages()),
            precipitation_days: section("precipitation days", store.precipitation_days()),
            temperature_extremes: section("temperature extremes", store.temperature_extremes()),
            monthly_precipitation: section(
                "monthly precipitation",
                store.monthly_precipitation(year),
            ),
            recent_vs_forecast: section("recent vs forecast", store.recent_vs_forecast()),
            summary: section("summary", store.executive_summary()),
        }
    }

    /// Number of sections that could not be produced.
    pub fn failed_sections(&self) -> usize {
        [
            self.temperature_averages.is_none(),
            self.precipitation_days.is_none(),
            self.temperature_extremes.is_none(),
            self.monthly_precipitation.is_none(),
            self.recent_vs_forecast.is_none(),
            self.summary.is_none(),
        ]
        .into_iter()
        .filter(|failed| *failed)
        .count()
    }
}

fn section<T>(name: &str, result: Result<T>) -> Option<T> {
    match result {
        Ok(rows) => {
            debug!("Report section '{}' ready", name);
            Some(rows)
        }
        Err(e) => {
            error!("Report section '{}' failed: {}", name, e);
            None
        }
    }
}

fn month_name(month: u8) -> String {
    time::Month::try_from(month)
        .map(|m| m.to_string())
        .unwrap_or_else(|_| month.to_string())
}

// Report queries
impl Store {
    pub fn temperature_averages(&self) -> Result<Vec<TemperatureAverage>> {
        let mut stmt = self.conn().prepare(
            "SELECT l.location_name,
                    ROUND(AVG(w.temperature_2m_max), 2),
                    ROUND(AVG(w.temperature_2m_min), 2),
                    ROUND((AVG(w.temperature_2m_max) + AVG(w.temperature_2m_min)) / 2, 2)
             FROM weather_data w
             JOIN locations l ON w.location_id = l.id
             WHERE w.data_type = 'historical'
             GROUP BY l.location_name
             ORDER BY l.location_name",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok(TemperatureAverage {
                    location: row.get(0)?,
                    avg_max: row.get(1)?,
                    avg_min: row.get(2)?,
                    avg_mean: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    pub fn precipitation_days(&self) -> Result<Vec<PrecipitationDays>> {
        let mut stmt = self.conn().prepare(
            "SELECT l.location_name,
                    COUNT(*),
                    SUM(CASE WHEN w.precipitation_sum > 0 THEN 1 ELSE 0 END) AS rainy,
                    ROUND(100.0 * SUM(CASE WHEN w.precipitation_sum > 0 THEN 1 ELSE 0 END)
                          / COUNT(*), 2),
                    ROUND(AVG(w.precipitation_sum), 2)
             FROM weather_data w
             JOIN locations l ON w.location_id = l.id
             WHERE w.data_type = 'historical'
             GROUP BY l.location_name
             ORDER BY rainy DESC, l.location_name",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok(PrecipitationDays {
                    location: row.get(0)?,
                    total_days: row.get::<_, i64>(1)? as u64,
                    rainy_days: row.get::<_, i64>(2)? as u64,
                    rainy_pct: row.get(3)?,
                    avg_precipitation: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    pub fn temperature_extremes(&self) -> Result<Vec<TemperatureExtremes>> {
        let mut stmt = self.conn().prepare(
            "WITH ext AS (
                SELECT location_id,
                       MAX(temperature_2m_max) AS max_t,
                       MIN(temperature_2m_min) AS min_t
                FROM weather_data
                WHERE data_type = 'historical'
                GROUP BY location_id
             )
             SELECT l.location_name,
                    e.max_t,
                    (SELECT w.date FROM weather_data w
                     WHERE w.location_id = e.location_id
                       AND w.data_type = 'historical'
                       AND w.temperature_2m_max = e.max_t
                     ORDER BY w.date LIMIT 1),
                    e.min_t,
                    (SELECT w.date FROM weather_data w
                     WHERE w.location_id = e.location_id
                       AND w.data_type = 'historical'
                       AND w.temperature_2m_min = e.min_t
                     ORDER BY w.date LIMIT 1)
             FROM ext e
             JOIN locations l ON e.location_id = l.id
             ORDER BY l.location_name",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok(TemperatureExtremes {
                    location: row.get(0)?,
                    max_temperature: row.get(1)?,
                    max_date: row.get(2)?,
                    min_temperature: row.get(3)?,
                    min_date: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Average precipitation per location and month of `year`.
    pub fn monthly_precipitation(&self, year: i32) -> Result<Vec<MonthlyPrecipitation>> {
        if !(0..=9999).contains(&year) {
            return Err(Error::InvalidValue(format!("report year {year}")));
        }

        let mut stmt = self.conn().prepare(
            "SELECT l.location_name,
                    CAST(strftime('%m', w.date) AS INTEGER) AS month,
                    ROUND(AVG(w.precipitation_sum), 2),
                    COUNT(*)
             FROM weather_data w
             JOIN locations l ON w.location_id = l.id
             WHERE w.data_type = 'historical'
               AND strftime('%Y', w.date) = ?1
             GROUP BY l.location_name, month
             ORDER BY l.location_name, month",
        )?;

        let rows = stmt
            .query_map([format!("{year:04}")], |row| {
                let month: u8 = row.get(1)?;
                Ok(MonthlyPrecipitation {
                    location: row.get(0)?,
                    month,
                    month_name: month_name(month),
                    avg_precipitation: row.get(2)?,
                    days: row.get::<_, i64>(3)? as u64,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Forecast averages next to the last stretch of history.
    ///
    /// Historical rows are limited to [`RECENT_WINDOW_DAYS`] before the most
    /// recent historical date in the whole table.
    pub fn recent_vs_forecast(&self) -> Result<Vec<RecentComparison>> {
        let mut stmt = self.conn().prepare(
            "SELECT l.location_name,
                    w.data_type,
                    ROUND(AVG(w.temperature_2m_max), 2),
                    ROUND(AVG(w.precipitation_sum), 2),
                    COUNT(*)
             FROM weather_data w
             JOIN locations l ON w.location_id = l.id
             WHERE w.data_type = 'forecast'
                OR (w.data_type = 'historical'
                    AND w.date >= date(
                        (SELECT MAX(date) FROM weather_data WHERE data_type = 'historical'),
                        ?1))
             GROUP BY l.location_name, w.data_type
             ORDER BY l.location_name, w.data_type DESC",
        )?;

        let window = format!("-{RECENT_WINDOW_DAYS} days");
        let rows = stmt
            .query_map([window], |row| {
                Ok(RecentComparison {
                    location: row.get(0)?,
                    data_type: row.get(1)?,
                    avg_max: row.get(2)?,
                    avg_precipitation: row.get(3)?,
                    days: row.get::<_, i64>(4)? as u64,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    pub fn executive_summary(&self) -> Result<ExecutiveSummary> {
        let total_records = self.count_weather(None)?;
        let locations = self.count_locations()?;

        let (first_date, last_date): (Option<String>, Option<String>) = self
            .conn()
            .query_row(
                "SELECT MIN(date), MAX(date) FROM weather_data WHERE data_type = 'historical'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;

        let generated_at = OffsetDateTime::now_utc()
            .format(format_description!(
                "[year]-[month]-[day] [hour]:[minute]:[second] UTC"
            ))
            .map_err(|e| Error::InvalidValue(e.to_string()))?;

        Ok(ExecutiveSummary {
            total_records,
            first_date,
            last_date,
            locations,
            generated_at,
        })
    }
}
