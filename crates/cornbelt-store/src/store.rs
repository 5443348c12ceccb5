//! Main store implementation.

use std::collections::HashMap;
use std::path::Path;

use rusqlite::{Connection, params};
use serde::Serialize;
use tracing::{debug, info};

use cornbelt_types::{DataType, LocationRegistry, WeatherRecord, format_date};

use crate::error::{Error, Result};
use crate::guard::ForeignKeyGuard;
use crate::schema;

/// SQLite-based store for daily weather records.
pub struct Store {
    conn: Connection,
}

/// Row count and date span for one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationSummary {
    pub location: String,
    pub records: u64,
    pub first_date: Option<String>,
    pub last_date: Option<String>,
}

impl Store {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| Error::CreateDirectory {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        info!("Opening database at {}", path.display());
        let conn = Connection::open(path)?;

        // Enforcement is per connection, so every open starts enforced.
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;

        schema::initialize(&conn)?;

        Ok(Self { conn })
    }

    /// Open the default database location.
    pub fn open_default() -> Result<Self> {
        Self::open(crate::default_db_path())
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Whether foreign-key enforcement is currently on for this connection.
    pub fn foreign_keys_enabled(&self) -> Result<bool> {
        let enabled: bool = self
            .conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))?;
        Ok(enabled)
    }

    /// Suspend foreign-key enforcement until the returned guard is restored
    /// or dropped.
    pub fn relax_foreign_keys(&self) -> Result<ForeignKeyGuard<'_>> {
        ForeignKeyGuard::relax(&self.conn)
    }
}

// Location operations
impl Store {
    /// Insert every registry location. Existing names are left untouched.
    ///
    /// Returns the number of newly inserted locations.
    pub fn insert_locations(&self, registry: &LocationRegistry) -> Result<usize> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO locations (location_name) VALUES (?1)
             ON CONFLICT(location_name) DO NOTHING",
        )?;

        let mut inserted = 0;
        for name in registry.names() {
            inserted += stmt.execute([name])?;
        }

        info!(
            "{} locations inserted or verified ({} new)",
            registry.len(),
            inserted
        );
        Ok(inserted)
    }

    /// Map of location name to id.
    pub fn location_ids(&self) -> Result<HashMap<String, i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT location_name, id FROM locations")?;
        let ids = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<std::result::Result<HashMap<_, _>, _>>()?;
        Ok(ids)
    }

    /// Id of a single location.
    pub fn location_id(&self, name: &str) -> Result<i64> {
        self.location_ids()?
            .remove(name)
            .ok_or_else(|| Error::LocationNotFound(name.to_string()))
    }

    /// Number of rows in the locations table.
    pub fn count_locations(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM locations", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

// Weather data operations
impl Store {
    /// Insert records in one transaction, ignoring rows that already exist
    /// under `(location_id, date, data_type)`.
    ///
    /// Every record's location must be present in `location_ids`; callers
    /// filter beforehand. On any failure the whole batch is rolled back.
    /// Returns the number of rows actually inserted.
    pub fn insert_weather(
        &self,
        records: &[(i64, &WeatherRecord)],
        data_type: DataType,
    ) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO weather_data (
                    location_id, date, data_type, weather_code,
                    temperature_2m_max, temperature_2m_min, daylight_duration,
                    shortwave_radiation_sum, precipitation_sum,
                    et0_fao_evapotranspiration, soil_moisture_0_to_100cm_mean,
                    vapour_pressure_deficit_max
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                ON CONFLICT(location_id, date, data_type) DO NOTHING",
            )?;

            for (location_id, record) in records {
                let v = &record.values;
                inserted += stmt.execute(params![
                    location_id,
                    format_date(record.date),
                    data_type.as_str(),
                    v.weather_code,
                    v.temperature_2m_max,
                    v.temperature_2m_min,
                    v.daylight_duration,
                    v.shortwave_radiation_sum,
                    v.precipitation_sum,
                    v.et0_fao_evapotranspiration,
                    v.soil_moisture_0_to_100cm_mean,
                    v.vapour_pressure_deficit_max,
                ])?;
            }
        }
        tx.commit()?;

        debug!(
            "Inserted {} of {} {} records",
            inserted,
            records.len(),
            data_type
        );
        Ok(inserted)
    }

    /// Count weather rows, optionally of one data type.
    pub fn count_weather(&self, data_type: Option<DataType>) -> Result<u64> {
        let count: i64 = match data_type {
            Some(dt) => self.conn.query_row(
                "SELECT COUNT(*) FROM weather_data WHERE data_type = ?",
                [dt.as_str()],
                |row| row.get(0),
            )?,
            None => self
                .conn
                .query_row("SELECT COUNT(*) FROM weather_data", [], |row| row.get(0))?,
        };
        Ok(count as u64)
    }

    /// Row count and date span per location, in name order.
    pub fn location_summaries(&self) -> Result<Vec<LocationSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT l.location_name, COUNT(w.id), MIN(w.date), MAX(w.date)
             FROM locations l
             LEFT JOIN weather_data w ON w.location_id = l.id
             GROUP BY l.id, l.location_name
             ORDER BY l.location_name",
        )?;

        let summaries = stmt
            .query_map([], |row| {
                Ok(LocationSummary {
                    location: row.get(0)?,
                    records: row.get::<_, i64>(1)? as u64,
                    first_date: row.get(2)?,
                    last_date: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(summaries)
    }
}
