//! Weekly feature frames
//!
//! A [`FeatureFrame`] is the unit every pipeline stage operates on: one item,
//! strictly increasing week anchors, and any number of numeric columns of the
//! same length. Model outputs reuse the same type with quantile columns.

use crate::error::{ForecastError, Result};
use chrono::{Datelike, Days, NaiveDate};
use polars::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;

/// Monday anchor of the week containing `date`.
///
/// Weeks run Tuesday through Monday and are labelled by their closing Monday,
/// so a Monday is its own anchor and a Tuesday belongs to the following Monday.
pub fn week_anchor(date: NaiveDate) -> NaiveDate {
    let offset = (7 - date.weekday().num_days_from_monday()) % 7;
    date + Days::new(u64::from(offset))
}

/// Add `weeks` whole weeks to an anchor
pub fn weeks_after(anchor: NaiveDate, weeks: usize) -> NaiveDate {
    anchor + Days::new(7 * weeks as u64)
}

/// One named numeric column
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<f64>,
}

/// One row of a frame, keyed by (item, week anchor)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyFeatureRow {
    pub item_id: String,
    pub timestamp: NaiveDate,
    #[serde(flatten)]
    pub values: BTreeMap<String, f64>,
}

/// Ordered weekly rows for exactly one item
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureFrame {
    item_id: String,
    timestamps: Vec<NaiveDate>,
    columns: Vec<Column>,
}

impl FeatureFrame {
    /// Create a frame without columns. Timestamps must be strictly increasing.
    pub fn new(item_id: impl Into<String>, timestamps: Vec<NaiveDate>) -> Result<Self> {
        if let Some(pair) = timestamps.windows(2).find(|pair| pair[0] >= pair[1]) {
            return Err(ForecastError::InvalidFrame(format!(
                "Timestamps must be strictly increasing, found {} followed by {}",
                pair[0], pair[1]
            )));
        }

        Ok(Self {
            item_id: item_id.into(),
            timestamps,
            columns: Vec::new(),
        })
    }

    /// Add a column, replacing any existing column with the same name
    pub fn set_column(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<()> {
        let name = name.into();
        if values.len() != self.timestamps.len() {
            return Err(ForecastError::InvalidFrame(format!(
                "Column '{}' has {} values but the frame has {} rows",
                name,
                values.len(),
                self.timestamps.len()
            )));
        }

        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(existing) => existing.values = values,
            None => self.columns.push(Column { name, values }),
        }
        Ok(())
    }

    /// Builder-style variant of [`FeatureFrame::set_column`]
    pub fn with_column(mut self, name: impl Into<String>, values: Vec<f64>) -> Result<Self> {
        self.set_column(name, values)?;
        Ok(self)
    }

    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    pub fn timestamps(&self) -> &[NaiveDate] {
        &self.timestamps
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Values of the named column
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    /// Values of the named column, failing with a descriptive error when absent
    pub fn require_column(&self, name: &str) -> Result<&[f64]> {
        self.column(name).ok_or_else(|| {
            ForecastError::InvalidFrame(format!(
                "Column '{}' not found for item '{}'",
                name, self.item_id
            ))
        })
    }

    /// Apply `f` to every value of every column
    pub fn map_values(&self, mut f: impl FnMut(&str, f64) -> Result<f64>) -> Result<Self> {
        let mut mapped = Self {
            item_id: self.item_id.clone(),
            timestamps: self.timestamps.clone(),
            columns: Vec::with_capacity(self.columns.len()),
        };
        for column in &self.columns {
            let values = column
                .values
                .iter()
                .map(|&v| f(&column.name, v))
                .collect::<Result<Vec<_>>>()?;
            mapped.columns.push(Column {
                name: column.name.clone(),
                values,
            });
        }
        Ok(mapped)
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn first_timestamp(&self) -> Option<NaiveDate> {
        self.timestamps.first().copied()
    }

    pub fn last_timestamp(&self) -> Option<NaiveDate> {
        self.timestamps.last().copied()
    }

    /// Rows `start..end`
    pub fn slice(&self, start: usize, end: usize) -> Self {
        let end = end.min(self.len());
        let start = start.min(end);
        Self {
            item_id: self.item_id.clone(),
            timestamps: self.timestamps[start..end].to_vec(),
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    values: c.values[start..end].to_vec(),
                })
                .collect(),
        }
    }

    /// Split off the last `n` rows: `(head, tail)`
    pub fn split_tail(&self, n: usize) -> (Self, Self) {
        let cut = self.len().saturating_sub(n);
        (self.slice(0, cut), self.slice(cut, self.len()))
    }

    /// Keep rows whose timestamp is on or after `date`
    pub fn retain_since(&self, date: NaiveDate) -> Self {
        let start = self.timestamps.partition_point(|ts| *ts < date);
        self.slice(start, self.len())
    }

    /// Materialise the frame as rows
    pub fn rows(&self) -> Vec<WeeklyFeatureRow> {
        self.timestamps
            .iter()
            .enumerate()
            .map(|(idx, ts)| WeeklyFeatureRow {
                item_id: self.item_id.clone(),
                timestamp: *ts,
                values: self
                    .columns
                    .iter()
                    .map(|c| (c.name.clone(), c.values[idx]))
                    .collect(),
            })
            .collect()
    }

    /// Export to a polars DataFrame with `item_id`, `timestamp` and one column per feature
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut series = Vec::with_capacity(self.columns.len() + 2);
        series.push(Series::new(
            "item_id",
            vec![self.item_id.clone(); self.len()],
        ));
        series.push(Series::new(
            "timestamp",
            self.timestamps
                .iter()
                .map(|ts| ts.format("%Y-%m-%d").to_string())
                .collect::<Vec<String>>(),
        ));
        for column in &self.columns {
            series.push(Series::new(&column.name, column.values.clone()));
        }

        Ok(DataFrame::new(series)?)
    }
}
