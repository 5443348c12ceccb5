//! Collection pipeline for daily Open-Meteo weather data.
//!
//! This crate fetches daily observations and forecasts, checks their quality,
//! merges them and writes them to JSON Lines files for the store to load.
//!
//! # Features
//!
//! - Open-Meteo archive and forecast client with retry ([`OpenMeteoClient`])
//! - Data quality validation ([`quality::validate`])
//! - Merge of historical and forecast records ([`merge::merge`])
//! - Record file writing, reading and inspection ([`persist`])
//! - The per-location collection [`Pipeline`]
//! - TOML configuration ([`Config`])
//!
//! # Example
//!
//! ```no_run
//! use cornbelt_core::{Config, OpenMeteoClient, Pipeline, PipelineOptions};
//! use time::OffsetDateTime;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default()?;
//!     let client = OpenMeteoClient::new(&config)?;
//!
//!     let pipeline = Pipeline::new(&client, &config)?;
//!     let report = pipeline
//!         .run(&PipelineOptions::new(OffsetDateTime::now_utc().date()))
//!         .await;
//!     println!("any success: {}", report.any_success());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod merge;
pub mod mock;
pub mod openmeteo;
pub mod persist;
pub mod pipeline;
pub mod quality;
pub mod retry;
pub mod source;

pub use config::{ApiConfig, Config, ConfigError, FieldError, ForecastConfig, HistoricalConfig};
pub use error::{Error, Result};
pub use mock::MockSource;
pub use openmeteo::OpenMeteoClient;
pub use persist::{FileKind, FileSummary};
pub use pipeline::{LocationOutcome, Pipeline, PipelineOptions, PipelineReport};
pub use retry::{RetryConfig, with_retry};
pub use source::WeatherSource;

// Re-export types crate
pub use cornbelt_types;
