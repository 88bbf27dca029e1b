//! In-process tables, used for embedding and tests

use super::{HistoricalStore, Record, SourceQuery};
use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

/// One stored row: its date plus text and numeric cells by column name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryRow {
    pub date: Option<NaiveDate>,
    pub text: BTreeMap<String, String>,
    pub numbers: BTreeMap<String, Option<f64>>,
}

/// Tables held in memory. Populate before sharing; reads take `&self`.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: HashMap<String, Vec<MemoryRow>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty table (a query against a missing table fails)
    pub fn create_table(&mut self, table: &str) {
        self.tables.entry(table.to_string()).or_default();
    }

    pub fn insert_row(&mut self, table: &str, row: MemoryRow) {
        self.tables.entry(table.to_string()).or_default().push(row);
    }

    /// Insert a sales row keyed by item
    pub fn insert_sales(
        &mut self,
        table: &str,
        item_column: &str,
        item: &str,
        date: NaiveDate,
        target_column: &str,
        value: f64,
    ) {
        let mut row = MemoryRow {
            date: Some(date),
            ..MemoryRow::default()
        };
        row.text.insert(item_column.to_string(), item.to_string());
        row.numbers.insert(target_column.to_string(), Some(value));
        self.insert_row(table, row);
    }

    /// Insert an un-keyed dated value (covariate tables)
    pub fn insert_value(&mut self, table: &str, date: NaiveDate, column: &str, value: Option<f64>) {
        let mut row = MemoryRow {
            date: Some(date),
            ..MemoryRow::default()
        };
        row.numbers.insert(column.to_string(), value);
        self.insert_row(table, row);
    }
}

/// Evaluate `query` over already-loaded rows
pub(crate) fn evaluate(query: &SourceQuery, rows: &[MemoryRow]) -> Vec<Record> {
    let mut records: Vec<Record> = rows
        .iter()
        .filter_map(|row| {
            let date = row.date?;
            if !query.contains(date) {
                return None;
            }
            if let Some((column, key)) = query.key_filter() {
                if row.text.get(column.as_str()).map(String::as_str) != Some(key) {
                    return None;
                }
            }
            let values = query
                .value_columns()
                .iter()
                .map(|column| row.numbers.get(column.as_str()).copied().flatten())
                .collect();
            Some(Record { date, values })
        })
        .collect();

    records.sort_by_key(|record| record.date);
    records
}

impl HistoricalStore for MemoryStore {
    fn fetch(&self, query: &SourceQuery) -> Result<Vec<Record>> {
        let rows = self.tables.get(query.table().as_str()).ok_or_else(|| {
            ForecastError::Store(format!("Table '{}' not found", query.table()))
        })?;
        Ok(evaluate(query, rows))
    }
}
