//! Scoped relaxation of foreign-key enforcement.
//!
//! Bulk loads run with enforcement off. [`ForeignKeyGuard`] makes sure it is
//! switched back on: explicitly through [`ForeignKeyGuard::restore`], which
//! also verifies integrity, or on drop if the load bails out early.

use rusqlite::Connection;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};

/// Keeps foreign-key enforcement off while alive.
///
/// # Example
///
/// ```
/// use cornbelt_store::Store;
///
/// let store = Store::open_in_memory()?;
/// let guard = store.relax_foreign_keys()?;
/// assert!(!store.foreign_keys_enabled()?);
///
/// guard.restore()?;
/// assert!(store.foreign_keys_enabled()?);
/// # Ok::<(), cornbelt_store::Error>(())
/// ```
#[must_use = "enforcement is restored when the guard is dropped"]
pub struct ForeignKeyGuard<'a> {
    conn: &'a Connection,
    restored: bool,
}

impl<'a> ForeignKeyGuard<'a> {
    pub(crate) fn relax(conn: &'a Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = OFF;")?;
        debug!("Foreign key enforcement suspended");
        Ok(Self {
            conn,
            restored: false,
        })
    }

    /// Re-enable enforcement and verify that no row references a missing
    /// location.
    pub fn restore(mut self) -> Result<()> {
        self.restored = true;
        enable(self.conn)?;
        check(self.conn)?;
        info!("Foreign key enforcement restored, integrity verified");
        Ok(())
    }
}

impl Drop for ForeignKeyGuard<'_> {
    fn drop(&mut self) {
        if self.restored {
            return;
        }
        warn!("Foreign key guard dropped without restore; re-enabling enforcement");
        if let Err(e) = enable(self.conn) {
            error!("{}", e);
        }
    }
}

fn enable(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(Error::IntegrityRestore)?;

    // the pragma is silently ignored inside an open transaction
    let enabled: bool = conn
        .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
        .map_err(Error::IntegrityRestore)?;
    if !enabled {
        return Err(Error::IntegrityRestore(rusqlite::Error::InvalidQuery));
    }
    Ok(())
}

fn check(conn: &Connection) -> Result<()> {
    let mut stmt = conn
        .prepare("PRAGMA foreign_key_check")
        .map_err(Error::IntegrityRestore)?;
    let tables = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .and_then(|rows| rows.collect::<std::result::Result<Vec<_>, _>>())
        .map_err(Error::IntegrityRestore)?;

    match tables.first() {
        None => Ok(()),
        Some(table) => Err(Error::ForeignKeyViolations {
            count: tables.len(),
            table: table.clone(),
        }),
    }
}
