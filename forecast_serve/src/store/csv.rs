//! Flat-file store: one `<table>.csv` per table, read with polars

use super::memory::{evaluate, MemoryRow};
use super::{parse_date, HistoricalStore, Record, SourceQuery};
use crate::error::{ForecastError, Result};
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Store backed by a directory of CSV files with a header row
#[derive(Debug, Clone)]
pub struct CsvStore {
    dir: PathBuf,
}

impl CsvStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.is_dir() {
            return Err(ForecastError::Config(format!(
                "CSV store directory '{}' does not exist",
                dir.display()
            )));
        }
        Ok(Self { dir })
    }

    fn load(&self, query: &SourceQuery) -> Result<Vec<MemoryRow>> {
        let path = self.dir.join(format!("{}.csv", query.table()));
        let file = File::open(&path).map_err(|e| {
            ForecastError::Store(format!("Table '{}' not readable: {}", query.table(), e))
        })?;
        let df = CsvReader::new(file)
            .infer_schema(None)
            .has_header(true)
            .finish()?;
        debug!(table = %query.table(), rows = df.height(), "loaded csv table");

        let dates = text_column(&df, query.date_column().as_str())?;
        let keys = match query.key_filter() {
            Some((column, _)) => Some(text_column(&df, column.as_str())?),
            None => None,
        };
        let mut numbers = Vec::with_capacity(query.value_columns().len());
        for column in query.value_columns() {
            numbers.push((column.as_str(), numeric_column(&df, column.as_str())?));
        }

        let mut rows = Vec::with_capacity(df.height());
        for (idx, raw_date) in dates.iter().enumerate() {
            let Some(raw_date) = raw_date else {
                continue;
            };
            let mut row = MemoryRow {
                date: Some(parse_date(raw_date)?),
                ..MemoryRow::default()
            };
            if let (Some((column, _)), Some(keys)) = (query.key_filter(), &keys) {
                if let Some(key) = &keys[idx] {
                    row.text.insert(column.as_str().to_string(), key.clone());
                }
            }
            for (name, values) in &numbers {
                row.numbers.insert(name.to_string(), values[idx]);
            }
            rows.push(row);
        }
        Ok(rows)
    }
}

fn text_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let series = df.column(name)?.cast(&DataType::Utf8)?;
    let values = series
        .utf8()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect();
    Ok(values)
}

fn numeric_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let series = df.column(name)?.cast(&DataType::Float64)?;
    let values = series.f64()?.into_iter().collect();
    Ok(values)
}

impl HistoricalStore for CsvStore {
    fn fetch(&self, query: &SourceQuery) -> Result<Vec<Record>> {
        let rows = self.load(query)?;
        Ok(evaluate(query, &rows))
    }
}
