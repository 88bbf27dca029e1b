//! Service configuration
//!
//! Everything the pipeline needs to start: the series registry file, the
//! historical store backend, the artifact registry root and where request
//! workspaces are created. Values come from `FORECAST_*` environment variables
//! or the equivalent CLI flags.

use crate::error::{ForecastError, Result};
use crate::store::{ConnectionPool, CsvStore, HistoricalStore, SqliteStore};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

pub const REGISTRY_VAR: &str = "FORECAST_REGISTRY";
pub const STORE_VAR: &str = "FORECAST_STORE";
pub const POOL_SIZE_VAR: &str = "FORECAST_POOL_SIZE";
pub const ARTIFACTS_VAR: &str = "FORECAST_ARTIFACTS";
pub const WORKSPACE_ROOT_VAR: &str = "FORECAST_WORKSPACE_ROOT";

/// Idle sqlite connections kept when no pool size is configured
pub const DEFAULT_POOL_SIZE: usize = 4;

/// Historical store backend, written `sqlite:<path>` or `csv:<dir>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    Sqlite { path: PathBuf },
    Csv { dir: PathBuf },
}

impl FromStr for StoreConfig {
    type Err = ForecastError;

    fn from_str(raw: &str) -> Result<Self> {
        let (scheme, location) = raw.split_once(':').ok_or_else(|| {
            ForecastError::Config(format!(
                "store '{}' must be written sqlite:<path> or csv:<dir>",
                raw
            ))
        })?;
        if location.is_empty() {
            return Err(ForecastError::Config(format!("store '{}' has no location", raw)));
        }
        match scheme {
            "sqlite" => Ok(StoreConfig::Sqlite {
                path: PathBuf::from(location),
            }),
            "csv" => Ok(StoreConfig::Csv {
                dir: PathBuf::from(location),
            }),
            other => Err(ForecastError::Config(format!(
                "unknown store scheme '{}'",
                other
            ))),
        }
    }
}

impl StoreConfig {
    /// Open the backend. Up to `pool_size` idle sqlite connections are kept for
    /// reuse; it does not bound how many are open at once.
    pub fn open(&self, pool_size: usize) -> Result<Arc<dyn HistoricalStore>> {
        let store: Arc<dyn HistoricalStore> = match self {
            StoreConfig::Sqlite { path } => {
                Arc::new(SqliteStore::new(ConnectionPool::open(path, pool_size)?))
            }
            StoreConfig::Csv { dir } => Arc::new(CsvStore::new(dir)?),
        };
        Ok(store)
    }
}

/// Startup configuration for [`crate::Pipeline`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub registry_path: PathBuf,
    pub store: StoreConfig,
    /// Idle sqlite connections kept for reuse, not a concurrency limit
    pub pool_size: usize,
    pub artifacts_root: PathBuf,
    /// Defaults to a directory under the system temp dir
    pub workspace_root: Option<PathBuf>,
}

impl ServiceConfig {
    /// Read the `FORECAST_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup, e.g. a map in tests
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ForecastError::Config(format!("{} is not set", key)))
        };

        let pool_size = match lookup(POOL_SIZE_VAR) {
            Some(raw) => raw.trim().parse::<usize>().ok().filter(|n| *n > 0).ok_or_else(|| {
                ForecastError::Config(format!(
                    "{} must be a positive integer, got '{}'",
                    POOL_SIZE_VAR, raw
                ))
            })?,
            None => DEFAULT_POOL_SIZE,
        };

        Ok(Self {
            registry_path: PathBuf::from(required(REGISTRY_VAR)?),
            store: required(STORE_VAR)?.parse()?,
            pool_size,
            artifacts_root: PathBuf::from(required(ARTIFACTS_VAR)?),
            workspace_root: lookup(WORKSPACE_ROOT_VAR)
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        })
    }
}
