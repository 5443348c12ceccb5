//! Mock weather source for testing.
//!
//! [`MockSource`] implements [`WeatherSource`] from canned batches so the
//! collection pipeline can run without network access.
//!
//! # Features
//!
//! - **Canned data**: register a historical and/or forecast batch per location
//! - **Failure injection**: make every fetch for a location fail
//! - **Call counting**: check how many requests the pipeline made

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use time::{Date, Duration};

use cornbelt_types::{Batch, Location, WeatherRecord};

use crate::error::{Error, Result};
use crate::source::WeatherSource;

/// A weather source backed by in-memory batches.
///
/// Locations without a registered batch return an empty batch.
///
/// # Example
///
/// ```
/// use cornbelt_core::{MockSource, WeatherSource, mock::sample_batch};
/// use cornbelt_types::LocationRegistry;
/// use time::macros::date;
///
/// #[tokio::main]
/// async fn main() {
///     let registry = LocationRegistry::default();
///     let iowa = registry.get("iowa_center").unwrap();
///
///     let source = MockSource::new()
///         .with_forecast("iowa_center", sample_batch("iowa_center", date!(2025 - 09 - 28), 8));
///
///     let batch = source.fetch_forecast(iowa).await.unwrap();
///     assert_eq!(batch.len(), 8);
///     assert_eq!(source.call_count(), 1);
/// }
/// ```
#[derive(Debug, Default)]
pub struct MockSource {
    historical: HashMap<String, Batch>,
    forecast: HashMap<String, Batch>,
    failing: HashSet<String>,
    calls: AtomicU32,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the historical batch for a location.
    #[must_use]
    pub fn with_historical(mut self, location: &str, batch: Batch) -> Self {
        self.historical.insert(location.to_string(), batch);
        self
    }

    /// Register the forecast batch for a location.
    #[must_use]
    pub fn with_forecast(mut self, location: &str, batch: Batch) -> Self {
        self.forecast.insert(location.to_string(), batch);
        self
    }

    /// Make every fetch for this location fail with a 503.
    #[must_use]
    pub fn failing_for(mut self, location: &str) -> Self {
        self.failing.insert(location.to_string());
        self
    }

    /// Number of fetch calls made so far.
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::Relaxed)
    }

    fn respond(&self, store: &HashMap<String, Batch>, location: &Location) -> Result<Batch> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if self.failing.contains(location.name()) {
            return Err(Error::Api {
                status: 503,
                message: format!("mock failure for {}", location.name()),
                retry_after: None,
            });
        }
        Ok(store.get(location.name()).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl WeatherSource for MockSource {
    async fn fetch_historical(&self, location: &Location) -> Result<Batch> {
        self.respond(&self.historical, location)
    }

    async fn fetch_forecast(&self, location: &Location) -> Result<Batch> {
        self.respond(&self.forecast, location)
    }
}

/// Generate `days` consecutive, complete and plausible records.
///
/// Values vary deterministically with the day offset so aggregates in tests
/// are predictable: rain falls on every third day.
pub fn sample_batch(location: &str, start: Date, days: u32) -> Batch {
    (0..days)
        .map(|offset| {
            let step = f64::from(offset % 10);
            let mut record = WeatherRecord::new(start + Duration::days(i64::from(offset)), location);
            let v = &mut record.values;
            v.weather_code = Some(if offset % 3 == 0 { 61 } else { 1 });
            v.temperature_2m_max = Some(20.0 + step);
            v.temperature_2m_min = Some(8.0 + step / 2.0);
            v.daylight_duration = Some(43_200.0);
            v.precipitation_sum = Some(if offset % 3 == 0 { 2.5 } else { 0.0 });
            v.shortwave_radiation_sum = Some(18.0);
            v.et0_fao_evapotranspiration = Some(3.2);
            v.soil_moisture_0_to_100cm_mean = Some(0.32);
            v.vapour_pressure_deficit_max = Some(1.1);
            record
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cornbelt_types::LocationRegistry;
    use time::macros::date;

    #[tokio::test]
    async fn test_mock_returns_registered_batches() {
        let registry = LocationRegistry::default();
        let iowa = registry.get("iowa_center").unwrap();
        let illinois = registry.get("illinois_center").unwrap();

        let source = MockSource::new()
            .with_historical("iowa_center", sample_batch("iowa_center", date!(2024 - 01 - 01), 10));

        assert_eq!(source.fetch_historical(iowa).await.unwrap().len(), 10);
        assert!(source.fetch_historical(illinois).await.unwrap().is_empty());
        assert!(source.fetch_forecast(iowa).await.unwrap().is_empty());
        assert_eq!(source.call_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_failure_injection() {
        let registry = LocationRegistry::default();
        let iowa = registry.get("iowa_center").unwrap();
        let source = MockSource::new().failing_for("iowa_center");

        let result = source.fetch_forecast(iowa).await;
        assert!(matches!(result, Err(Error::Api { status: 503, .. })));
    }

    #[test]
    fn test_sample_batch_shape() {
        let batch = sample_batch("a", date!(2024 - 12 - 30), 4);
        assert_eq!(batch.len(), 4);
        assert_eq!(batch.records[3].date, date!(2025 - 01 - 02));
        assert_eq!(batch.records[0].values.precipitation_sum, Some(2.5));
        assert_eq!(batch.records[1].values.precipitation_sum, Some(0.0));
        assert_eq!(
            batch.date_range(),
            Some((date!(2024 - 12 - 30), date!(2025 - 01 - 02)))
        );
    }
}
