//! Series registry: the static recipe for every forecastable series
//!
//! The registry is loaded once from a TOML file and never mutated. Every other
//! component reads table names, columns and feature settings from here, never
//! from request input.

use crate::error::{ForecastError, Result};
use crate::store::Ident;
use chrono::NaiveDate;
use serde::Deserialize;
use series_math::Aggregation;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::info;

/// Forward transform applied to the target before inference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transformation {
    #[default]
    None,
    Log,
    Sqrt,
}

/// How a covariate row is matched to a daily sales row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinKey {
    /// Same calendar day (weather-style daily series)
    SameDay,
    /// Same calendar month (price index, confidence index)
    Month,
}

/// External series that can be joined onto the sales timeline
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CovariateSpec {
    pub name: String,
    pub table: String,
    pub column: String,
    #[serde(default = "default_date_column")]
    pub date_column: String,
    pub join: JoinKey,
    #[serde(default)]
    pub aggregation: Aggregation,
}

/// Engineered features computed on the weekly target
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeatureSpec {
    #[serde(default)]
    pub lags: Vec<usize>,
    #[serde(default)]
    pub rolling_means: Vec<usize>,
}

/// Processing recipe for one series
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeriesConfig {
    pub id: String,
    pub source_table: String,
    pub item_key: String,
    #[serde(default = "default_item_column")]
    pub item_column: String,
    #[serde(default = "default_date_column")]
    pub date_column: String,
    pub target_column: String,
    #[serde(default)]
    pub transformation: Transformation,
    #[serde(default)]
    pub known_covariates: Vec<String>,
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub data_filter_start: Option<usize>,
    #[serde(default)]
    pub training_start_date: Option<NaiveDate>,
    #[serde(default)]
    pub features: Option<FeatureSpec>,
}

fn default_item_column() -> String {
    "item_id".to_string()
}

fn default_date_column() -> String {
    "timestamp".to_string()
}

impl SeriesConfig {
    /// Registered model name, `sales-forecast-{id}` unless overridden
    pub fn model_name(&self) -> String {
        self.model_name
            .clone()
            .unwrap_or_else(|| format!("sales-forecast-{}", self.id))
    }

    /// Feature settings, empty when none are configured
    pub fn features(&self) -> FeatureSpec {
        self.features.clone().unwrap_or_default()
    }

    fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(ForecastError::Config("Series id must not be empty".to_string()));
        }
        for identifier in [
            &self.source_table,
            &self.item_column,
            &self.date_column,
            &self.target_column,
        ] {
            Ident::new(identifier).map_err(|e| {
                ForecastError::Config(format!("Series '{}': {}", self.id, e))
            })?;
        }

        let features = self.features();
        if features.lags.contains(&0) || features.rolling_means.contains(&0) {
            return Err(ForecastError::Config(format!(
                "Series '{}': lags and rolling windows must be positive",
                self.id
            )));
        }
        Ok(())
    }
}

impl CovariateSpec {
    fn validate(&self) -> Result<()> {
        for identifier in [&self.table, &self.column, &self.date_column] {
            Ident::new(identifier).map_err(|e| {
                ForecastError::Config(format!("Covariate '{}': {}", self.name, e))
            })?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RegistryFile {
    #[serde(default)]
    covariates: Vec<CovariateSpec>,
    #[serde(default)]
    series: Vec<SeriesConfig>,
}

/// Read-only lookup from series id to its recipe
#[derive(Debug, Clone, Default)]
pub struct SeriesRegistry {
    series: BTreeMap<String, SeriesConfig>,
    covariates: BTreeMap<String, CovariateSpec>,
}

impl SeriesRegistry {
    /// Build and validate a registry
    pub fn new(series: Vec<SeriesConfig>, covariates: Vec<CovariateSpec>) -> Result<Self> {
        let mut covariate_map = BTreeMap::new();
        for spec in covariates {
            spec.validate()?;
            if covariate_map.contains_key(&spec.name) {
                return Err(ForecastError::Config(format!(
                    "Duplicate covariate '{}'",
                    spec.name
                )));
            }
            covariate_map.insert(spec.name.clone(), spec);
        }

        let mut series_map = BTreeMap::new();
        for config in series {
            config.validate()?;
            let mut seen = HashSet::new();
            for name in &config.known_covariates {
                if !covariate_map.contains_key(name) {
                    return Err(ForecastError::Config(format!(
                        "Series '{}' lists covariate '{}' which has no join definition",
                        config.id, name
                    )));
                }
                if !seen.insert(name) {
                    return Err(ForecastError::Config(format!(
                        "Series '{}' lists covariate '{}' twice",
                        config.id, name
                    )));
                }
            }
            if series_map.contains_key(&config.id) {
                return Err(ForecastError::Config(format!(
                    "Duplicate series '{}'",
                    config.id
                )));
            }
            series_map.insert(config.id.clone(), config);
        }

        Ok(Self {
            series: series_map,
            covariates: covariate_map,
        })
    }

    /// Parse a registry from TOML text
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let file: RegistryFile = toml::from_str(source)?;
        Self::new(file.series, file.covariates)
    }

    /// Load a registry from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        let registry = Self::from_toml_str(&source)?;
        info!(
            path = %path.display(),
            series = registry.series.len(),
            covariates = registry.covariates.len(),
            "loaded series registry"
        );
        Ok(registry)
    }

    /// Recipe for `id`
    pub fn lookup(&self, id: &str) -> Result<&SeriesConfig> {
        self.series
            .get(id)
            .ok_or_else(|| ForecastError::UnknownSeries(id.to_string()))
    }

    /// Join definition for a covariate name
    pub fn covariate(&self, name: &str) -> Result<&CovariateSpec> {
        self.covariates
            .get(name)
            .ok_or_else(|| ForecastError::MissingCovariate(name.to_string()))
    }

    /// All registered series ids, sorted
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}
