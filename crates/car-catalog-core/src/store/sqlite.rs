use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension};

use super::CatalogStore;
use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::types::{AssetIdentifier, StoreRow};

/// Embedded SQLite backend
pub struct SqliteStore {
    conn: Connection,
    target: String,
}

impl SqliteStore {
    /// Open the database named by `config` and confirm it answers.
    ///
    /// Any failure is reported as `StoreUnavailable`.
    pub fn connect(config: &StoreConfig) -> Result<Self> {
        let target = config.describe();
        let unavailable = |e: rusqlite::Error| Error::StoreUnavailable {
            target: target.clone(),
            reason: e.to_string(),
        };

        let conn = if config.database == ":memory:" {
            Connection::open_in_memory()
        } else {
            Connection::open(&config.database)
        }
        .map_err(unavailable)?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )
        .map_err(unavailable)?;

        let store = Self {
            conn,
            target: target.clone(),
        };
        store.ping().map_err(|e| Error::StoreUnavailable {
            target: target.clone(),
            reason: e.to_string(),
        })?;

        info!("Connected to store {}", target);
        Ok(store)
    }

    /// In-memory store, used by tests and dry runs
    pub fn open_in_memory() -> Result<Self> {
        Self::connect(&StoreConfig {
            database: ":memory:".to_string(),
            ..StoreConfig::default()
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl CatalogStore for SqliteStore {
    fn ping(&self) -> Result<()> {
        self.conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }

    fn ensure_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS cars (
                Make  TEXT NOT NULL,
                Model TEXT,
                Year  INTEGER NULL,
                ID    TEXT UNIQUE NOT NULL,
                URL   TEXT NOT NULL,
                PRIMARY KEY (Make, ID)
            );",
        )?;
        debug!("Schema ensured on {}", self.target);
        Ok(())
    }

    fn upsert(&self, row: &StoreRow) -> Result<()> {
        self.conn.execute(
            "INSERT INTO cars (Make, Model, Year, ID, URL)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(Make, ID) DO UPDATE SET
                Model = excluded.Model,
                Year  = excluded.Year,
                URL   = excluded.URL
             ON CONFLICT(ID) DO UPDATE SET
                Model = excluded.Model,
                Year  = excluded.Year,
                URL   = excluded.URL",
            params![row.make, row.model, row.year, row.id.as_str(), row.url],
        )?;
        Ok(())
    }

    fn delete_one(&self, id: &AssetIdentifier) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM cars WHERE ID = ?1", params![id.as_str()])?;
        Ok(deleted > 0)
    }

    fn delete_all(&self) -> Result<usize> {
        Ok(self.conn.execute("DELETE FROM cars", [])?)
    }

    fn fetch(&self, id: &AssetIdentifier) -> Result<Option<StoreRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT Make, Model, Year, ID, URL FROM cars WHERE ID = ?1",
                params![id.as_str()],
                |row| {
                    Ok(StoreRow {
                        make: row.get(0)?,
                        model: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                        year: row.get(2)?,
                        id: AssetIdentifier::from(row.get::<_, String>(3)?),
                        url: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM cars", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
