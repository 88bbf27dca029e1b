//! SQLite store with an explicit read-only connection pool

use super::{parse_date, HistoricalStore, QueryParam, Record, SourceQuery};
use crate::error::{ForecastError, Result};
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Pool of read-only connections to one database file.
///
/// Connections are opened on demand and handed back after each use; at most
/// `max_idle` are kept around. Concurrent callers are never blocked, so more
/// than `max_idle` connections can be open at once.
#[derive(Debug)]
pub struct ConnectionPool {
    path: PathBuf,
    max_idle: usize,
    idle: Mutex<Vec<Connection>>,
}

impl ConnectionPool {
    /// Open a pool, validating the database with one eager connection
    pub fn open<P: AsRef<Path>>(path: P, max_idle: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let first = Self::connect(&path)?;
        debug!(path = %path.display(), max_idle, "opened sqlite pool");
        Ok(Self {
            path,
            max_idle: max_idle.max(1),
            idle: Mutex::new(vec![first]),
        })
    }

    fn connect(path: &Path) -> Result<Connection> {
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY
            | OpenFlags::SQLITE_OPEN_NO_MUTEX
            | OpenFlags::SQLITE_OPEN_URI;
        Connection::open_with_flags(path, flags).map_err(|e| {
            ForecastError::Store(format!("Cannot open '{}': {}", path.display(), e))
        })
    }

    /// Run `f` with a pooled connection, returning the connection afterwards
    pub fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let reused = self
            .idle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop();
        let conn = match reused {
            Some(conn) => conn,
            None => Self::connect(&self.path)?,
        };

        let result = f(&conn);

        let mut idle = self
            .idle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if idle.len() < self.max_idle {
            idle.push(conn);
        }
        result
    }

    /// Number of idle connections currently held
    pub fn idle_count(&self) -> usize {
        self.idle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

/// Historical store reading from SQLite
#[derive(Debug)]
pub struct SqliteStore {
    pool: ConnectionPool,
}

impl SqliteStore {
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }
}

impl HistoricalStore for SqliteStore {
    fn fetch(&self, query: &SourceQuery) -> Result<Vec<Record>> {
        let (sql, params) = query.to_sql();
        let bound: Vec<String> = params.iter().map(QueryParam::as_text).collect();
        let width = query.value_columns().len();
        debug!(%sql, params = bound.len(), "querying sqlite store");

        self.pool.with_connection(|conn| {
            let mut stmt = conn.prepare_cached(&sql)?;
            let rows = stmt.query_map(rusqlite::params_from_iter(bound.iter()), |row| {
                let date: String = row.get(0)?;
                let mut values = Vec::with_capacity(width);
                for idx in 0..width {
                    values.push(row.get::<_, Option<f64>>(idx + 1)?);
                }
                Ok((date, values))
            })?;

            let mut records = Vec::new();
            for row in rows {
                let (date, values) = row?;
                records.push(Record {
                    date: parse_date(&date)?,
                    values,
                });
            }
            Ok(records)
        })
    }
}
