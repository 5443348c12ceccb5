//! Relational storage for collected weather data.
//!
//! This crate loads the record files written by `cornbelt-core` into SQLite
//! and runs the aggregate reports over them.
//!
//! # Features
//!
//! - Locations and daily weather rows keyed by location, date and data type
//! - Idempotent batch loading; re-running a load inserts nothing new
//! - Foreign-key relaxation scoped to a guard during bulk loads
//! - Temperature, precipitation and forecast comparison reports
//!
//! # Example
//!
//! ```no_run
//! use cornbelt_store::{Loader, Report, Store};
//! use cornbelt_types::LocationRegistry;
//!
//! let store = Store::open_default()?;
//! let registry = LocationRegistry::default();
//!
//! let summary = Loader::new(&store, &registry).run("data/raw".as_ref())?;
//! println!("{} new rows", summary.inserted());
//!
//! let report = Report::generate(&store, 2024);
//! println!("{:?}", report.summary);
//! # Ok::<(), cornbelt_store::Error>(())
//! ```

mod error;
mod guard;
mod loader;
mod report;
mod schema;
mod store;

pub use error::{Error, Result};
pub use guard::ForeignKeyGuard;
pub use loader::{DataFile, LoadSummary, LoadedFile, Loader, Verification};
pub use report::{
    DEFAULT_REPORT_YEAR, ExecutiveSummary, MonthlyPrecipitation, PrecipitationDays,
    RECENT_WINDOW_DAYS, RecentComparison, Report, TemperatureAverage, TemperatureExtremes,
};
pub use store::{LocationSummary, Store};

/// Default database path following platform conventions.
///
/// - Linux: `~/.local/share/cornbelt/weather.db`
/// - macOS: `~/Library/Application Support/cornbelt/weather.db`
/// - Windows: `C:\Users\<user>\AppData\Local\cornbelt\weather.db`
pub fn default_db_path() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("cornbelt")
        .join("weather.db")
}
