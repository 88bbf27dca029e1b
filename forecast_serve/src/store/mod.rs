//! Read access to the historical store
//!
//! The assembler only needs date-indexed numeric columns from named tables.
//! Backends implement [`HistoricalStore`]; they must be safe to share across
//! concurrent requests.

use crate::error::{ForecastError, Result};
use chrono::NaiveDate;

pub mod csv;
pub mod memory;
pub mod query;
pub mod sqlite;

pub use self::csv::CsvStore;
pub use memory::MemoryStore;
pub use query::{Ident, QueryParam, SourceQuery};
pub use sqlite::{ConnectionPool, SqliteStore};

/// One dated row: values aligned with [`SourceQuery::value_columns`]
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub date: NaiveDate,
    pub values: Vec<Option<f64>>,
}

/// Read-only access to source tables
pub trait HistoricalStore: std::fmt::Debug + Send + Sync {
    /// Rows matching `query`, ordered by date
    fn fetch(&self, query: &SourceQuery) -> Result<Vec<Record>>;
}

/// Parse a stored date. Accepts `YYYY-MM-DD` with an optional time suffix and
/// the compact `YYYYMMDD` form.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    let trimmed = raw.trim();
    let parsed = if trimmed.len() == 8 && trimmed.chars().all(|c| c.is_ascii_digit()) {
        NaiveDate::parse_from_str(trimmed, "%Y%m%d")
    } else {
        let day = trimmed.get(..10).unwrap_or(trimmed);
        NaiveDate::parse_from_str(day, "%Y-%m-%d")
    };

    parsed.map_err(|e| ForecastError::Store(format!("Invalid date '{}': {}", raw, e)))
}
