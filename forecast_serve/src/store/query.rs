//! Parameterised source queries built from registry entries
//!
//! Table and column names only ever come from the validated registry and are
//! wrapped in [`Ident`]; values (item keys, dates) travel as bound parameters.

use crate::error::{ForecastError, Result};
use crate::registry::{CovariateSpec, SeriesConfig};
use chrono::{Days, NaiveDate};
use std::fmt;

const MAX_IDENT_LEN: usize = 63;

/// A validated SQL identifier: `[A-Za-z_][A-Za-z0-9_]*`, at most 63 bytes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident(String);

impl Ident {
    pub fn new(name: &str) -> Result<Self> {
        let mut chars = name.chars();
        let valid_start = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

        if !valid_start || !valid_rest || name.len() > MAX_IDENT_LEN {
            return Err(ForecastError::Config(format!(
                "'{}' is not a valid table or column name",
                name
            )));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Double-quoted form for SQL text
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Value bound to a positional parameter
#[derive(Debug, Clone, PartialEq)]
pub enum QueryParam {
    Text(String),
    Date(NaiveDate),
}

impl QueryParam {
    /// Text form used by text-typed date columns
    pub fn as_text(&self) -> String {
        match self {
            QueryParam::Text(text) => text.clone(),
            QueryParam::Date(date) => date.format("%Y-%m-%d").to_string(),
        }
    }
}

/// Read of one date-indexed table: optional key filter, optional date range,
/// ordered by date
#[derive(Debug, Clone, PartialEq)]
pub struct SourceQuery {
    table: Ident,
    date_column: Ident,
    value_columns: Vec<Ident>,
    key_filter: Option<(Ident, String)>,
    start: Option<NaiveDate>,
    end_exclusive: Option<NaiveDate>,
}

impl SourceQuery {
    /// Daily target rows of one series
    pub fn sales(config: &SeriesConfig) -> Result<Self> {
        Ok(Self {
            table: Ident::new(&config.source_table)?,
            date_column: Ident::new(&config.date_column)?,
            value_columns: vec![Ident::new(&config.target_column)?],
            key_filter: Some((Ident::new(&config.item_column)?, config.item_key.clone())),
            start: None,
            end_exclusive: None,
        })
    }

    /// Rows of one covariate series
    pub fn covariate(spec: &CovariateSpec) -> Result<Self> {
        Ok(Self {
            table: Ident::new(&spec.table)?,
            date_column: Ident::new(&spec.date_column)?,
            value_columns: vec![Ident::new(&spec.column)?],
            key_filter: None,
            start: None,
            end_exclusive: None,
        })
    }

    /// Restrict to dates in `start..=end`
    pub fn between(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start = Some(start);
        self.end_exclusive = end.checked_add_days(Days::new(1));
        self
    }

    pub fn table(&self) -> &Ident {
        &self.table
    }

    pub fn date_column(&self) -> &Ident {
        &self.date_column
    }

    pub fn value_columns(&self) -> &[Ident] {
        &self.value_columns
    }

    pub fn key_filter(&self) -> Option<(&Ident, &str)> {
        self.key_filter
            .as_ref()
            .map(|(column, key)| (column, key.as_str()))
    }

    /// True when `date` falls inside the requested range
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |start| date >= start)
            && self.end_exclusive.map_or(true, |end| date < end)
    }

    /// Render as a parameterised SELECT (SQLite dialect, `?N` placeholders)
    pub fn to_sql(&self) -> (String, Vec<QueryParam>) {
        let mut params = Vec::new();
        let mut conditions = Vec::new();

        if let Some((column, key)) = &self.key_filter {
            params.push(QueryParam::Text(key.clone()));
            conditions.push(format!("{} = ?{}", column.quoted(), params.len()));
        }
        if let Some(start) = self.start {
            params.push(QueryParam::Date(start));
            conditions.push(format!("{} >= ?{}", self.date_column.quoted(), params.len()));
        }
        if let Some(end) = self.end_exclusive {
            params.push(QueryParam::Date(end));
            conditions.push(format!("{} < ?{}", self.date_column.quoted(), params.len()));
        }

        let mut columns = vec![self.date_column.quoted()];
        columns.extend(self.value_columns.iter().map(Ident::quoted));

        let mut sql = format!("SELECT {} FROM {}", columns.join(", "), self.table.quoted());
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(&format!(" ORDER BY {}", self.date_column.quoted()));

        (sql, params)
    }
}
