//! Loading persisted record files into the store.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{error, info, warn};

use cornbelt_core::persist::{self, FileKind};
use cornbelt_types::{DataType, LocationRegistry, WeatherRecord};

use crate::error::{Error, Result};
use crate::store::{LocationSummary, Store};

/// Loads record batches and files for the locations of one registry.
pub struct Loader<'a> {
    store: &'a Store,
    registry: &'a LocationRegistry,
}

/// A record file picked up by [`Loader::discover`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFile {
    pub path: PathBuf,
    pub data_type: DataType,
}

/// Rows inserted from one file.
#[derive(Debug, Clone, Serialize)]
pub struct LoadedFile {
    pub path: PathBuf,
    pub data_type: DataType,
    pub inserted: usize,
}

/// Row counts after a load.
#[derive(Debug, Clone, Serialize)]
pub struct Verification {
    pub locations: u64,
    pub historical: u64,
    pub forecast: u64,
    pub total: u64,
    pub per_location: Vec<LocationSummary>,
}

/// Outcome of [`Loader::run`].
#[derive(Debug, Clone, Serialize)]
pub struct LoadSummary {
    pub locations_inserted: usize,
    pub files: Vec<LoadedFile>,
    pub verification: Verification,
}

impl LoadSummary {
    /// Rows inserted across all files.
    pub fn inserted(&self) -> usize {
        self.files.iter().map(|f| f.inserted).sum()
    }

    pub fn log(&self) {
        let v = &self.verification;
        info!(
            "Loaded {} new rows from {} files",
            self.inserted(),
            self.files.len()
        );
        info!(
            "Database holds {} locations, {} historical and {} forecast rows ({} total)",
            v.locations, v.historical, v.forecast, v.total
        );
        for loc in &v.per_location {
            info!(
                "  {}: {} rows ({} to {})",
                loc.location,
                loc.records,
                loc.first_date.as_deref().unwrap_or("-"),
                loc.last_date.as_deref().unwrap_or("-")
            );
        }
    }
}

impl<'a> Loader<'a> {
    pub fn new(store: &'a Store, registry: &'a LocationRegistry) -> Self {
        Self { store, registry }
    }

    /// Insert records of one data type, skipping those for unknown locations.
    ///
    /// A record is loaded only when its location is in the registry and in
    /// the locations table. Existing rows are left untouched, so loading the
    /// same records twice inserts nothing the second time.
    pub fn load(&self, records: &[WeatherRecord], data_type: DataType) -> Result<usize> {
        let ids = self.store.location_ids()?;

        let mut rows = Vec::with_capacity(records.len());
        let mut skipped = 0;
        for record in records {
            let id = self
                .registry
                .contains(&record.location)
                .then(|| ids.get(&record.location))
                .flatten();
            match id {
                Some(&id) => rows.push((id, record)),
                None => {
                    warn!(
                        "Skipping {} record for unknown location '{}' on {}",
                        data_type, record.location, record.date
                    );
                    skipped += 1;
                }
            }
        }

        if rows.is_empty() {
            return Ok(0);
        }

        let inserted = self.store.insert_weather(&rows, data_type)?;
        info!(
            "Inserted {} new {} records ({} already present, {} skipped)",
            inserted,
            data_type,
            rows.len() - inserted,
            skipped
        );
        Ok(inserted)
    }

    /// Load one record file. A file that cannot be read contributes nothing.
    pub fn load_file(&self, path: &Path, data_type: DataType) -> Result<usize> {
        let batch = match persist::read_batch(path) {
            Ok(batch) => batch,
            Err(e) => {
                error!("Skipping {}: {}", path.display(), e);
                return Ok(0);
            }
        };

        if !batch.date_errors.is_empty() {
            warn!(
                "{}: {} row(s) with unparsable dates ignored",
                path.display(),
                batch.date_errors.len()
            );
        }

        info!("Loading {} ({} records)", path.display(), batch.records.len());
        self.load(&batch.records, data_type)
    }

    /// Find historical and forecast files in `dir`, historical first, each
    /// group sorted by name. Combined files are not loaded.
    pub fn discover(dir: &Path) -> Result<Vec<DataFile>> {
        let files = persist::list_json_files(dir).map_err(|e| Error::DataDirectory {
            path: dir.to_path_buf(),
            source: e,
        })?;

        let mut found: Vec<DataFile> = files
            .into_iter()
            .filter_map(|path| {
                let kind = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .and_then(FileKind::from_file_name)?;
                let data_type = kind.data_type()?;
                Some(DataFile { path, data_type })
            })
            .collect();

        // list_json_files is already sorted by name; stable sort keeps it
        found.sort_by_key(|f| f.data_type != DataType::Historical);
        Ok(found)
    }

    /// Full load of a data directory.
    ///
    /// Locations are inserted first, then every historical and forecast file
    /// with foreign-key enforcement relaxed. Enforcement is restored and
    /// integrity verified before the row counts are gathered.
    pub fn run(&self, data_dir: &Path) -> Result<LoadSummary> {
        let files = Self::discover(data_dir)?;
        if files.is_empty() {
            warn!("No historical or forecast files in {}", data_dir.display());
        }

        let locations_inserted = self.store.insert_locations(self.registry)?;

        let guard = self.store.relax_foreign_keys()?;
        let mut loaded = Vec::with_capacity(files.len());
        for file in files {
            let inserted = self.load_file(&file.path, file.data_type)?;
            loaded.push(LoadedFile {
                path: file.path,
                data_type: file.data_type,
                inserted,
            });
        }
        guard.restore()?;

        let summary = LoadSummary {
            locations_inserted,
            files: loaded,
            verification: self.verify()?,
        };
        summary.log();
        Ok(summary)
    }

    /// Gather row counts per data type and per location.
    pub fn verify(&self) -> Result<Verification> {
        let historical = self.store.count_weather(Some(DataType::Historical))?;
        let forecast = self.store.count_weather(Some(DataType::Forecast))?;
        Ok(Verification {
            locations: self.store.count_locations()?,
            historical,
            forecast,
            total: self.store.count_weather(None)?,
            per_location: self.store.location_summaries()?,
        })
    }
}
