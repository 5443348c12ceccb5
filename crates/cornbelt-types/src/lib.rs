//! Shared types for the cornbelt weather pipeline.
//!
//! This crate holds the plain data types passed between the fetch, validate,
//! persist and load stages. It performs no I/O.
//!
//! # Features
//!
//! - Validated [`Location`]s and the [`LocationRegistry`]
//! - Daily [`WeatherRecord`]s grouped into a [`Batch`]
//! - The [`Variable`] and [`DataType`] enumerations
//! - The [`QualityReport`] produced by validation
//!
//! # Example
//!
//! ```
//! use cornbelt_types::{Batch, LocationRegistry, WeatherRecord, parse_date};
//!
//! let registry = LocationRegistry::default();
//! let iowa = registry.get("iowa_center").unwrap();
//!
//! let batch: Batch = (1..=3)
//!     .map(|day| {
//!         let date = parse_date(&format!("2024-06-0{day}")).unwrap();
//!         WeatherRecord::new(date, iowa.name())
//!     })
//!     .collect();
//! assert_eq!(batch.len(), 3);
//! ```

pub mod error;
pub mod location;
pub mod quality;
pub mod record;

pub use error::{ValidationError, ValidationResult};
pub use location::{Location, LocationRegistry, default_locations};
pub use quality::{DateRange, MissingData, QualityReport, QualityStatus};
pub use record::{
    Batch, DATE_FORMAT, DailyValues, DataType, STAMP_FORMAT, Variable, WeatherRecord, format_date,
    format_stamp, iso_date, parse_date,
};
