// ABOUTME: SQLite-backed key/value table implementing the LocalBackend trait.
// ABOUTME: Gives the fallback store crash-safe writes in a single database file.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, OptionalExtension, params};

use crate::local::{LocalBackend, LocalError};

/// A single-table key/value store. The connection is guarded by a mutex
/// so the backend can be shared across tasks.
pub struct SqliteLocal {
    conn: Mutex<Connection>,
}

impl SqliteLocal {
    /// Open or create the database at the given path and ensure the
    /// key/value table exists.
    pub fn open(path: &Path) -> Result<Self, LocalError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::init(conn)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, LocalError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, LocalError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl LocalBackend for SqliteLocal {
    fn get_item(&self, key: &str) -> Result<Option<String>, LocalError> {
        let conn = self.conn.lock().map_err(|_| LocalError::Poisoned)?;
        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), LocalError> {
        let conn = self.conn.lock().map_err(|_| LocalError::Poisoned)?;
        conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at",
            params![key, value, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), LocalError> {
        let conn = self.conn.lock().map_err(|_| LocalError::Poisoned)?;
        conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}
