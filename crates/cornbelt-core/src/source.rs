//! Trait abstraction over weather data providers.
//!
//! The [`WeatherSource`] trait lets the pipeline run against the real
//! Open-Meteo client or against [`MockSource`](crate::MockSource) in tests.

use async_trait::async_trait;

use cornbelt_types::{Batch, Location};

use crate::error::Result;

/// A provider of daily weather records.
///
/// # Example
///
/// ```ignore
/// use cornbelt_core::{Result, WeatherSource};
/// use cornbelt_types::Location;
///
/// async fn count_days<S: WeatherSource>(source: &S, location: &Location) -> Result<usize> {
///     Ok(source.fetch_forecast(location).await?.len())
/// }
/// ```
#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// Fetch the configured archive window for a location.
    async fn fetch_historical(&self, location: &Location) -> Result<Batch>;

    /// Fetch recent past days plus the forecast window for a location.
    async fn fetch_forecast(&self, location: &Location) -> Result<Batch>;
}
