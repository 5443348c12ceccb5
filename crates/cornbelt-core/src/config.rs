//! Pipeline configuration.
//!
//! A [`Config`] is loaded once at startup from a TOML file (every field has a
//! default), validated, and then passed by reference to every stage.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::Date;
use time::macros::date;

use cornbelt_types::{
    Location, LocationRegistry, ValidationResult, Variable, default_locations, iso_date,
};

use crate::retry::RetryConfig;

/// Open-Meteo accepts at most 16 forecast days.
pub const MAX_FORECAST_DAYS: u8 = 16;

/// Open-Meteo accepts at most 92 past days on the forecast endpoint.
pub const MAX_PAST_DAYS: u8 = 92;

/// Pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory the collection step writes record files to.
    pub output_dir: PathBuf,
    /// SQLite database path. `None` uses the platform data directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,
    /// Daily variables to request, in column order.
    pub variables: Vec<Variable>,
    /// Locations to collect, in processing order.
    pub locations: Vec<Location>,
    /// Historical archive window.
    pub historical: HistoricalConfig,
    /// Forecast window.
    pub forecast: ForecastConfig,
    /// API endpoints and request behavior.
    pub api: ApiConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("data/raw"),
            database: None,
            variables: Variable::ALL.to_vec(),
            locations: default_locations(),
            historical: HistoricalConfig::default(),
            forecast: ForecastConfig::default(),
            api: ApiConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default path, falling back to defaults
    /// when no file exists.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Save configuration to a file, creating parent directories.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Write {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Validate the configuration and return every problem found.
    ///
    /// # Example
    ///
    /// ```
    /// use cornbelt_core::Config;
    ///
    /// let config = Config::default();
    /// config.validate().expect("default config should be valid");
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if let Err(e) = LocationRegistry::new(self.locations.clone()) {
            errors.push(FieldError::new("locations", e.to_string()));
        }

        if self.variables.is_empty() {
            errors.push(FieldError::new("variables", "at least one variable is required"));
        }
        let mut seen = HashSet::new();
        for variable in &self.variables {
            if !seen.insert(variable) {
                errors.push(FieldError::new(
                    "variables",
                    format!("duplicate variable '{}'", variable),
                ));
            }
        }

        errors.extend(self.historical.validate());
        errors.extend(self.forecast.validate());
        errors.extend(self.api.validate());

        if self.output_dir.as_os_str().is_empty() {
            errors.push(FieldError::new("output_dir", "output directory cannot be empty"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Load and validate configuration from a file.
    pub fn load_validated<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Build the location registry from the configured locations.
    pub fn registry(&self) -> ValidationResult<LocationRegistry> {
        LocationRegistry::new(self.locations.clone())
    }

    /// Retry policy for API requests.
    pub fn retry(&self) -> RetryConfig {
        RetryConfig::new(self.api.max_retries)
            .initial_delay(Duration::from_millis(self.api.retry_delay_ms))
            .max_delay(Duration::from_secs(self.api.retry_max_delay_secs))
    }
}

/// Archive date window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoricalConfig {
    #[serde(with = "iso_date")]
    pub start_date: Date,
    /// Also used to stamp historical file names.
    #[serde(with = "iso_date")]
    pub end_date: Date,
}

impl Default for HistoricalConfig {
    fn default() -> Self {
        Self {
            start_date: date!(2020 - 01 - 01),
            end_date: date!(2025 - 09 - 27),
        }
    }
}

impl HistoricalConfig {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.start_date > self.end_date {
            errors.push(FieldError::new(
                "historical.start_date",
                format!(
                    "start date {} is after end date {}",
                    self.start_date, self.end_date
                ),
            ));
        }
        errors
    }
}

/// Forecast window relative to the run date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub past_days: u8,
    pub forecast_days: u8,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            past_days: 1,
            forecast_days: 7,
        }
    }
}

impl ForecastConfig {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.forecast_days == 0 || self.forecast_days > MAX_FORECAST_DAYS {
            errors.push(FieldError::new(
                "forecast.forecast_days",
                format!(
                    "must be between 1 and {} (got {})",
                    MAX_FORECAST_DAYS, self.forecast_days
                ),
            ));
        }
        if self.past_days > MAX_PAST_DAYS {
            errors.push(FieldError::new(
                "forecast.past_days",
                format!("must be at most {} (got {})", MAX_PAST_DAYS, self.past_days),
            ));
        }
        errors
    }
}

/// Weather API settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub archive_url: String,
    pub forecast_url: String,
    /// IANA timezone name, or `auto` to use the location's local time.
    pub timezone: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    /// Delay before the first retry; later retries back off exponentially.
    pub retry_delay_ms: u64,
    /// Upper bound on any single wait between retries.
    pub retry_max_delay_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            archive_url: "https://archive-api.open-meteo.com/v1/archive".to_string(),
            forecast_url: "https://api.open-meteo.com/v1/forecast".to_string(),
            timezone: "auto".to_string(),
            timeout_secs: 30,
            max_retries: 3,
            retry_delay_ms: 1000,
            retry_max_delay_secs: 30,
        }
    }
}

impl ApiConfig {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();

        for (field, url) in [
            ("api.archive_url", &self.archive_url),
            ("api.forecast_url", &self.forecast_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                errors.push(FieldError::new(
                    field,
                    format!("URL must start with http:// or https://, got '{}'", url),
                ));
            }
        }

        if self.timezone.trim().is_empty() {
            errors.push(FieldError::new("api.timezone", "timezone cannot be empty"));
        }

        if self.timeout_secs == 0 {
            errors.push(FieldError::new("api.timeout_secs", "timeout must be at least 1 second"));
        }

        if Duration::from_millis(self.retry_delay_ms) > Duration::from_secs(self.retry_max_delay_secs) {
            errors.push(FieldError::new(
                "api.retry_max_delay_secs",
                "maximum retry delay must not be shorter than retry_delay_ms",
            ));
        }

        errors
    }

    /// Request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Configuration validation failed:\n{}", format_field_errors(.0))]
    Validation(Vec<FieldError>),
}

/// A single validation failure with the field it applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// The field path (e.g., `api.timeout_secs`).
    pub field: String,
    pub message: String,
}

impl FieldError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cornbelt")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.output_dir, PathBuf::from("data/raw"));
        assert_eq!(config.locations.len(), 2);
        assert_eq!(config.variables.len(), 9);
        assert_eq!(config.historical.end_date, date!(2025 - 09 - 27));
        assert_eq!(config.forecast.past_days, 1);
        assert_eq!(config.forecast.forecast_days, 7);
        assert_eq!(config.api.timeout(), Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_partial_toml_uses_defaults() {
        let toml = r#"
            output_dir = "/tmp/weather"

            [forecast]
            forecast_days = 14

            [[locations]]
            name = "nebraska_center"
            lat = 41.5
            lon = -99.8
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("/tmp/weather"));
        assert_eq!(config.forecast.forecast_days, 14);
        assert_eq!(config.forecast.past_days, 1);
        assert_eq!(config.locations.len(), 1);
        assert_eq!(config.locations[0].name(), "nebraska_center");
        assert_eq!(config.api, ApiConfig::default());
    }

    #[test]
    fn test_config_rejects_invalid_coordinates_on_parse() {
        let toml = r#"
            [[locations]]
            name = "bad"
            latitude = 95.0
            longitude = 0.0
        "#;
        assert!(toml::from_str::<Config>(toml).is_err());
    }

    #[test]
    fn test_config_save_and_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.database = Some(PathBuf::from("/tmp/test.db"));
        config.variables = vec![Variable::Temperature2mMax, Variable::PrecipitationSum];
        config.historical.start_date = date!(2023 - 01 - 01);

        config.save(&config_path).unwrap();
        let loaded = Config::load(&config_path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_load_nonexistent() {
        let result = Config::load("/nonexistent/path/config.toml");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_config_load_invalid_toml() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("invalid.toml");
        std::fs::write(&config_path, "this is not valid { toml").unwrap();

        let result = Config::load(&config_path);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let mut config = Config::default();
        config.locations.clear();
        config.variables.clear();
        config.historical.start_date = date!(2026 - 01 - 01);
        config.forecast.forecast_days = 0;
        config.api.archive_url = "ftp://example.com".to_string();
        config.api.timeout_secs = 0;

        let Err(ConfigError::Validation(errors)) = config.validate() else {
            panic!("expected validation errors");
        };
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"locations"));
        assert!(fields.contains(&"variables"));
        assert!(fields.contains(&"historical.start_date"));
        assert!(fields.contains(&"forecast.forecast_days"));
        assert!(fields.contains(&"api.archive_url"));
        assert!(fields.contains(&"api.timeout_secs"));
    }

    #[test]
    fn test_validate_duplicate_locations_and_variables() {
        let mut config = Config::default();
        config.locations.push(config.locations[0].clone());
        config.variables.push(Variable::WeatherCode);

        let Err(ConfigError::Validation(errors)) = config.validate() else {
            panic!("expected validation errors");
        };
        assert_eq!(errors.len(), 2);
        assert!(errors[0].message.contains("iowa_center"));
        assert!(errors[1].message.contains("weather_code"));
    }

    #[test]
    fn test_retry_from_api_settings() {
        let mut config = Config::default();
        config.api.max_retries = 5;
        config.api.retry_delay_ms = 250;
        config.api.retry_max_delay_secs = 4;
        let retry = config.retry();
        assert_eq!(retry.max_retries, 5);
        assert_eq!(retry.initial_delay, Duration::from_millis(250));
        assert_eq!(retry.max_delay, Duration::from_secs(4));

        config.api.retry_max_delay_secs = 0;
        let Err(ConfigError::Validation(errors)) = config.validate() else {
            panic!("expected validation errors");
        };
        assert_eq!(errors[0].field, "api.retry_max_delay_secs");
    }

    #[test]
    fn test_default_config_path() {
        assert!(default_config_path().ends_with("cornbelt/config.toml"));
    }

    #[test]
    fn test_validation_error_display() {
        let error = ConfigError::Validation(vec![
            FieldError::new("api.timezone", "timezone cannot be empty"),
            FieldError::new("output_dir", "output directory cannot be empty"),
        ]);
        let display = error.to_string();
        assert!(display.contains("  - api.timezone: timezone cannot be empty"));
        assert!(display.contains("  - output_dir:"));
    }
}
