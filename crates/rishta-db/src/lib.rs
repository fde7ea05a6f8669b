pub mod migrations;
pub mod models;
pub mod queries;

use anyhow::Result;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

/// SQLite-backed store. A single connection is shared behind a mutex; every
/// multi-statement state transition runs inside one SQL transaction on it.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;

        migrations::run(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Fresh private database, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::run(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.lock();
        f(&conn)
    }

    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self.lock();
        f(&mut conn)
    }

    /// A panic while the lock was held leaves any open transaction to roll
    /// back on drop, so the connection itself is still usable.
    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| {
            warn!("DB lock was poisoned by a panicking caller; recovering");
            self.conn.clear_poison();
            poisoned.into_inner()
        })
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::*;

    #[test]
    fn store_survives_a_panic_inside_a_transaction() {
        let db = Database::open_in_memory().unwrap();
        let res = catch_unwind(AssertUnwindSafe(|| {
            db.with_conn_mut(|conn| -> Result<()> {
                let tx = conn.transaction()?;
                tx.execute("UPDATE app_settings SET maintenance_mode = 1", [])?;
                panic!("handler bug");
            })
        }));
        assert!(res.is_err());

        let settings = db.get_settings().unwrap();
        assert!(!settings.maintenance_mode);
    }
}
