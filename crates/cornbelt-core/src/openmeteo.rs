//! HTTP client for the Open-Meteo archive and forecast APIs.
//!
//! Both endpoints return daily data in columnar form:
//!
//! ```json
//! {"daily": {"time": ["2024-01-01", ...], "temperature_2m_max": [1.5, ...], ...}}
//! ```
//!
//! The client turns each column position into one [`WeatherRecord`].
//!
//! # Example
//!
//! ```no_run
//! use cornbelt_core::{Config, OpenMeteoClient, WeatherSource};
//! use cornbelt_types::LocationRegistry;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let client = OpenMeteoClient::new(&config)?;
//!
//! let registry = LocationRegistry::default();
//! let iowa = registry.get("iowa_center").unwrap();
//! let batch = client.fetch_forecast(iowa).await?;
//! println!("{} forecast days", batch.len());
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde::Deserialize;
use time::Date;
use tracing::{debug, info, warn};

use cornbelt_types::{
    Batch, Location, ValidationError, Variable, WeatherRecord, format_date, parse_date,
};

use crate::config::{ApiConfig, Config, ForecastConfig, HistoricalConfig};
use crate::error::{Error, Result};
use crate::retry::{RetryConfig, with_retry};
use crate::source::WeatherSource;

/// Open-Meteo client configured from a [`Config`].
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    client: Client,
    api: ApiConfig,
    variables: Vec<Variable>,
    historical: HistoricalConfig,
    forecast: ForecastConfig,
    retry: RetryConfig,
}

/// Daily columns keyed by variable name, plus the `time` axis.
#[derive(Debug, Deserialize)]
struct DailyColumns {
    time: Vec<Option<String>>,
    #[serde(flatten)]
    columns: HashMap<String, Vec<Option<f64>>>,
}

#[derive(Debug, Deserialize)]
struct DailyResponse {
    daily: Option<DailyColumns>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    reason: Option<String>,
}

impl OpenMeteoClient {
    /// Create a client using the API, window and variable settings of `config`.
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.api.timeout())
            .user_agent(concat!("cornbelt/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            api: config.api.clone(),
            variables: config.variables.clone(),
            historical: config.historical,
            forecast: config.forecast,
            retry: config.retry(),
        })
    }

    /// Replace the retry policy.
    #[must_use]
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Fetch archived daily data for a coordinate pair.
    ///
    /// Coordinates and dates are checked before any request is sent.
    pub async fn fetch_archive(
        &self,
        location_name: &str,
        latitude: f64,
        longitude: f64,
        start_date: Option<Date>,
        end_date: Option<Date>,
    ) -> Result<Batch> {
        check_coordinates(latitude, longitude)?;
        let start = start_date.ok_or(ValidationError::MissingParameter("start_date"))?;
        let end = end_date.ok_or(ValidationError::MissingParameter("end_date"))?;
        if start > end {
            return Err(ValidationError::InvalidDate(format!(
                "start_date {} is after end_date {}",
                format_date(start),
                format_date(end)
            ))
            .into());
        }

        info!(
            "Fetching historical data for {} ({} to {})",
            location_name,
            format_date(start),
            format_date(end)
        );

        let mut params = self.base_params(latitude, longitude);
        params.push(("start_date", format_date(start)));
        params.push(("end_date", format_date(end)));

        self.fetch_daily(&self.api.archive_url, &params, location_name)
            .await
    }

    /// Fetch past days plus forecast days for a coordinate pair.
    pub async fn fetch_outlook(
        &self,
        location_name: &str,
        latitude: f64,
        longitude: f64,
        past_days: u8,
        forecast_days: u8,
    ) -> Result<Batch> {
        check_coordinates(latitude, longitude)?;
        if forecast_days == 0 {
            return Err(ValidationError::MissingParameter("forecast_days").into());
        }

        info!(
            "Fetching forecast for {} ({} past day(s), {} forecast day(s))",
            location_name, past_days, forecast_days
        );

        let mut params = self.base_params(latitude, longitude);
        params.push(("past_days", past_days.to_string()));
        params.push(("forecast_days", forecast_days.to_string()));

        self.fetch_daily(&self.api.forecast_url, &params, location_name)
            .await
    }

    fn base_params(&self, latitude: f64, longitude: f64) -> Vec<(&'static str, String)> {
        let daily = self
            .variables
            .iter()
            .map(|v| v.as_str())
            .collect::<Vec<_>>()
            .join(",");
        vec![
            ("latitude", latitude.to_string()),
            ("longitude", longitude.to_string()),
            ("daily", daily),
            ("timezone", self.api.timezone.clone()),
        ]
    }

    async fn fetch_daily(
        &self,
        url: &str,
        params: &[(&'static str, String)],
        location_name: &str,
    ) -> Result<Batch> {
        let operation = format!("fetch {}", location_name);
        let response: DailyResponse = with_retry(&self.retry, &operation, || async {
            let response = self.client.get(url).query(params).send().await?;
            let status = response.status();
            if status.is_success() {
                return response.json::<DailyResponse>().await.map_err(Error::from);
            }

            let retry_after = retry_after(response.headers());
            let message = response
                .json::<ApiErrorBody>()
                .await
                .ok()
                .and_then(|body| body.reason)
                .unwrap_or_else(|| status.to_string());
            Err(Error::Api {
                status: status.as_u16(),
                message,
                retry_after,
            })
        })
        .await?;

        let daily = response
            .daily
            .ok_or_else(|| Error::InvalidResponse("response has no 'daily' object".to_string()))?;
        let batch = decode_daily(daily, location_name, &self.variables)?;

        info!("Received {} days for {}", batch.len(), location_name);
        Ok(batch)
    }
}

#[async_trait]
impl WeatherSource for OpenMeteoClient {
    async fn fetch_historical(&self, location: &Location) -> Result<Batch> {
        self.fetch_archive(
            location.name(),
            location.latitude(),
            location.longitude(),
            Some(self.historical.start_date),
            Some(self.historical.end_date),
        )
        .await
    }

    async fn fetch_forecast(&self, location: &Location) -> Result<Batch> {
        self.fetch_outlook(
            location.name(),
            location.latitude(),
            location.longitude(),
            self.forecast.past_days,
            self.forecast.forecast_days,
        )
        .await
    }
}

/// `Retry-After` in delay-seconds form. HTTP dates are ignored.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn check_coordinates(latitude: f64, longitude: f64) -> Result<()> {
    Location::new("request", latitude, longitude)?;
    Ok(())
}

/// Turn columnar daily data into a batch of records.
fn decode_daily(daily: DailyColumns, location: &str, variables: &[Variable]) -> Result<Batch> {
    let days = daily.time.len();

    for (name, values) in &daily.columns {
        if values.len() != days {
            return Err(Error::InvalidResponse(format!(
                "column '{}' has {} values for {} days",
                name,
                values.len(),
                days
            )));
        }
    }
    for variable in variables {
        if !daily.columns.contains_key(variable.as_str()) {
            warn!("Response for {} has no '{}' column", location, variable);
        }
    }

    let mut batch = Batch::default();
    for (i, raw_date) in daily.time.into_iter().enumerate() {
        let raw_date = raw_date.unwrap_or_default();
        let Ok(date) = parse_date(&raw_date) else {
            debug!("Unparsable date '{}' in response for {}", raw_date, location);
            batch.date_errors.push(raw_date);
            continue;
        };

        let mut record = WeatherRecord::new(date, location);
        for &variable in variables {
            let value = daily
                .columns
                .get(variable.as_str())
                .and_then(|column| column[i]);
            variable.set(&mut record.values, value);
        }
        batch.records.push(record);
    }

    Ok(batch)
}
