//! Collection pipeline: fetch, validate, merge and persist per location.
//!
//! Each location goes through up to three steps: historical, forecast and
//! combined. A step either succeeds (its file was written) or fails; failures
//! are logged and never abort the run. Locations are processed one after
//! another.

use std::future::Future;
use std::path::PathBuf;

use serde::Serialize;
use time::Date;
use tracing::{error, info, warn};

use cornbelt_types::{Batch, DataType, Location, LocationRegistry};

use crate::config::Config;
use crate::error::Result;
use crate::merge::merge;
use crate::persist::{self, FileKind};
use crate::quality::validate_columns;
use crate::source::WeatherSource;

/// What to collect in one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    pub historical: bool,
    pub forecast: bool,
    /// Write a merged file when both other steps succeed.
    pub combined: bool,
    /// Restrict to these locations. Empty means all.
    pub locations: Vec<String>,
    /// Stamp for forecast and combined file names.
    pub run_date: Date,
    /// Also write a CSV copy next to every record file.
    pub csv: bool,
}

impl PipelineOptions {
    /// Every step, every location.
    pub fn new(run_date: Date) -> Self {
        Self {
            historical: true,
            forecast: true,
            combined: true,
            locations: Vec::new(),
            run_date,
            csv: false,
        }
    }
}

/// Per-location step results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationOutcome {
    pub location: String,
    pub historical: bool,
    pub forecast: bool,
    pub combined: bool,
}

impl LocationOutcome {
    fn new(location: &str) -> Self {
        Self {
            location: location.to_string(),
            historical: false,
            forecast: false,
            combined: false,
        }
    }

    /// `(step name, succeeded)` in processing order.
    pub fn steps(&self) -> [(&'static str, bool); 3] {
        [
            ("historical", self.historical),
            ("forecast", self.forecast),
            ("combined", self.combined),
        ]
    }

    pub fn successes(&self) -> usize {
        self.steps().iter().filter(|(_, ok)| *ok).count()
    }
}

/// Outcome of a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    pub outcomes: Vec<LocationOutcome>,
    /// The run was stopped before every location was processed.
    pub interrupted: bool,
}

impl PipelineReport {
    /// True if any step at any location succeeded.
    pub fn any_success(&self) -> bool {
        self.outcomes.iter().any(|o| o.successes() > 0)
    }

    /// Locations with at least one successful step.
    pub fn successful_locations(&self) -> usize {
        self.outcomes.iter().filter(|o| o.successes() > 0).count()
    }

    /// Log the final per-location summary.
    pub fn log_summary(&self) {
        info!("{}", "=".repeat(60));
        info!("PIPELINE SUMMARY");
        info!("{}", "=".repeat(60));

        for outcome in &self.outcomes {
            let ok = outcome.successes();
            let total = outcome.steps().len();
            let marker = match ok {
                0 => "FAILED",
                n if n == total => "OK",
                _ => "PARTIAL",
            };
            info!("[{}] {}: {}/{} steps succeeded", marker, outcome.location, ok, total);
            for (step, success) in outcome.steps() {
                info!("    {} {}", if success { "+" } else { "-" }, step);
            }
        }

        info!("{}", "-".repeat(60));
        info!(
            "{}/{} locations processed",
            self.successful_locations(),
            self.outcomes.len()
        );
        if self.interrupted {
            warn!("Run was interrupted");
        }
    }
}

/// Drives collection for the configured locations.
pub struct Pipeline<'a, S: WeatherSource + ?Sized> {
    source: &'a S,
    config: &'a Config,
    registry: LocationRegistry,
}

impl<'a, S: WeatherSource + ?Sized> Pipeline<'a, S> {
    /// Create a pipeline. Fails if the configured locations are invalid.
    pub fn new(source: &'a S, config: &'a Config) -> Result<Self> {
        let registry = config.registry()?;
        Ok(Self {
            source,
            config,
            registry,
        })
    }

    /// Run to completion.
    pub async fn run(&self, options: &PipelineOptions) -> PipelineReport {
        self.run_until(options, std::future::pending()).await
    }

    /// Run until done or until `shutdown` resolves.
    ///
    /// A location in progress when `shutdown` fires is abandoned and does not
    /// appear in the report.
    pub async fn run_until<F>(&self, options: &PipelineOptions, shutdown: F) -> PipelineReport
    where
        F: Future<Output = ()>,
    {
        info!("Starting weather data collection");
        let mut report = PipelineReport::default();

        let locations = self.registry.select(&options.locations);
        if locations.is_empty() {
            error!("No valid locations to process");
            report.log_summary();
            return report;
        }

        tokio::pin!(shutdown);
        for location in locations {
            info!("Processing location: {}", location.name());
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    warn!("Interrupted while processing {}", location.name());
                    report.interrupted = true;
                    break;
                }
                outcome = self.process_location(location, options) => {
                    report.outcomes.push(outcome);
                }
            }
        }

        report.log_summary();
        report
    }

    async fn process_location(&self, location: &Location, options: &PipelineOptions) -> LocationOutcome {
        let mut outcome = LocationOutcome::new(location.name());

        let historical = if options.historical {
            let name = persist::historical_file_name(location.name(), self.config.historical.end_date);
            self.collect(location, DataType::Historical, name, options.csv).await
        } else {
            None
        };
        outcome.historical = historical.is_some();

        let forecast = if options.forecast {
            let name = persist::dated_file_name(FileKind::Forecast, location.name(), options.run_date);
            self.collect(location, DataType::Forecast, name, options.csv).await
        } else {
            None
        };
        outcome.forecast = forecast.is_some();

        if options.combined
            && let (Some(historical), Some(forecast)) = (&historical, &forecast)
            && let Some(combined) = merge(historical, forecast)
        {
            let name = persist::dated_file_name(FileKind::Combined, location.name(), options.run_date);
            outcome.combined = self.save(&combined, &name, options.csv);
            if outcome.combined {
                info!("Combined dataset written for {}", location.name());
            }
        }

        outcome
    }

    /// Fetch, validate and write one step. Returns the batch if it was saved.
    async fn collect(
        &self,
        location: &Location,
        data_type: DataType,
        file_name: String,
        csv: bool,
    ) -> Option<Batch> {
        let fetched = match data_type {
            DataType::Historical => self.source.fetch_historical(location).await,
            DataType::Forecast => self.source.fetch_forecast(location).await,
        };
        let batch = match fetched {
            Ok(batch) => batch,
            Err(e) => {
                error!("Failed to fetch {} data for {}: {}", data_type, location.name(), e);
                return None;
            }
        };

        if batch.is_empty() {
            warn!("No {} data received for {}", data_type, location.name());
            return None;
        }

        let quality = validate_columns(&batch, location.name(), &self.config.variables);
        if quality.is_error() {
            error!("Invalid {} data for {}", data_type, location.name());
            return None;
        }
        for issue in &quality.data_issues {
            warn!("{} {}: {}", location.name(), data_type, issue);
        }

        if self.save(&batch, &file_name, csv) {
            info!("Saved {} data for {}", data_type, location.name());
            Some(batch)
        } else {
            error!("Failed to save {} data for {}", data_type, location.name());
            None
        }
    }

    /// Write the record file. A failed CSV copy is logged but does not fail
    /// the step.
    fn save(&self, batch: &Batch, file_name: &str, csv: bool) -> bool {
        let path = self.output_path(file_name);
        if !persist::write(batch, &path) {
            return false;
        }
        if csv && !persist::write_csv(batch, &persist::csv_path(&path)) {
            warn!("CSV copy of {} was not written", file_name);
        }
        true
    }

    fn output_path(&self, file_name: &str) -> PathBuf {
        self.config.output_dir.join(file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockSource, sample_batch};
    use time::macros::date;

    const RUN_DATE: Date = date!(2025 - 09 - 28);

    fn config_in(dir: &std::path::Path) -> Config {
        Config {
            output_dir: dir.to_path_buf(),
            ..Config::default()
        }
    }

    fn full_source() -> MockSource {
        let mut source = MockSource::new();
        for name in ["iowa_center", "illinois_center"] {
            source = source
                .with_historical(name, sample_batch(name, date!(2025 - 09 - 01), 27))
                .with_forecast(name, sample_batch(name, date!(2025 - 09 - 27), 8));
        }
        source
    }

    #[tokio::test]
    async fn test_full_run_writes_all_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let source = full_source();

        let pipeline = Pipeline::new(&source, &config).unwrap();
        let report = pipeline.run(&PipelineOptions::new(RUN_DATE)).await;

        assert!(report.any_success());
        assert!(!report.interrupted);
        assert_eq!(report.outcomes.len(), 2);
        assert!(report.outcomes.iter().all(|o| o.successes() == 3));
        assert_eq!(source.call_count(), 4);

        for name in [
            "historical_iowa_center_2025-09-27.json",
            "forecast_iowa_center_20250928.json",
            "combined_iowa_center_20250928.json",
            "historical_illinois_center_2025-09-27.json",
        ] {
            assert!(dir.path().join(name).exists(), "missing {name}");
        }

        // 27 historical days + 8 forecast days overlapping on 2025-09-27
        let combined = persist::read_batch(&dir.path().join("combined_iowa_center_20250928.json")).unwrap();
        assert_eq!(combined.len(), 34);
    }

    #[tokio::test]
    async fn test_csv_copies_written_alongside() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let source = full_source();

        let mut options = PipelineOptions::new(RUN_DATE);
        options.locations = vec!["iowa_center".to_string()];
        options.csv = true;
        let report = Pipeline::new(&source, &config).unwrap().run(&options).await;
        assert_eq!(report.outcomes[0].successes(), 3);

        let csv = std::fs::read_to_string(dir.path().join("combined_iowa_center_20250928.csv")).unwrap();
        // header plus 34 merged days
        assert_eq!(csv.lines().count(), 35);
        assert!(dir.path().join("historical_iowa_center_2025-09-27.csv").exists());
        assert!(dir.path().join("forecast_iowa_center_20250928.csv").exists());
        // csv copies are not record files
        assert_eq!(persist::list_json_files(dir.path()).unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_skip_forecast_skips_combined() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let source = full_source();

        let mut options = PipelineOptions::new(RUN_DATE);
        options.forecast = false;
        let report = Pipeline::new(&source, &config).unwrap().run(&options).await;

        for outcome in &report.outcomes {
            assert!(outcome.historical);
            assert!(!outcome.forecast);
            assert!(!outcome.combined);
        }
        assert!(!dir.path().join("forecast_iowa_center_20250928.json").exists());
        assert_eq!(source.call_count(), 2);
    }

    #[tokio::test]
    async fn test_failures_are_isolated_per_location() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let source = full_source().failing_for("iowa_center");

        let report = Pipeline::new(&source, &config)
            .unwrap()
            .run(&PipelineOptions::new(RUN_DATE))
            .await;

        assert_eq!(report.outcomes[0].successes(), 0);
        assert_eq!(report.outcomes[1].successes(), 3);
        assert_eq!(report.successful_locations(), 1);
        assert!(report.any_success());
    }

    #[tokio::test]
    async fn test_empty_fetch_fails_step() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let source = MockSource::new();

        let report = Pipeline::new(&source, &config)
            .unwrap()
            .run(&PipelineOptions::new(RUN_DATE))
            .await;

        assert_eq!(report.outcomes.len(), 2);
        assert!(!report.any_success());
        assert!(persist::list_json_files(dir.path()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_location_filter() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let source = full_source();

        let mut options = PipelineOptions::new(RUN_DATE);
        options.locations = vec!["illinois_center".to_string()];
        let report = Pipeline::new(&source, &config).unwrap().run(&options).await;
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.outcomes[0].location, "illinois_center");

        options.locations = vec!["ohio_center".to_string()];
        let report = Pipeline::new(&source, &config).unwrap().run(&options).await;
        assert!(report.outcomes.is_empty());
        assert!(!report.any_success());
    }

    #[tokio::test]
    async fn test_shutdown_stops_run() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let source = full_source();

        let report = Pipeline::new(&source, &config)
            .unwrap()
            .run_until(&PipelineOptions::new(RUN_DATE), std::future::ready(()))
            .await;

        assert!(report.interrupted);
        assert!(report.outcomes.is_empty());
        assert!(!report.any_success());
    }

    #[test]
    fn test_pipeline_rejects_invalid_locations() {
        let source = MockSource::new();
        let config = Config {
            locations: Vec::new(),
            ..Config::default()
        };
        assert!(Pipeline::new(&source, &config).is_err());
    }
}
