#![allow(dead_code)]

use chrono::{Days, NaiveDate};
use forecast_serve::store::MemoryStore;
use forecast_serve::{FeatureFrame, ForecastError, ForecastModel, SeriesRegistry};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const SALES_TABLE: &str = "sales_daily";
pub const ITEM_COLUMN: &str = "category";
pub const TARGET: &str = "units";

pub const REGISTRY_TOML: &str = r#"
[[covariates]]
name = "temperature"
table = "weather"
column = "temp_c"
join = "same_day"

[[covariates]]
name = "cpi"
table = "price_index"
column = "cpi"
join = "month"

[[series]]
id = "electronics"
source_table = "sales_daily"
item_key = "ELEC"
item_column = "category"
target_column = "units"

[[series]]
id = "garden"
source_table = "sales_daily"
item_key = "GARD"
item_column = "category"
target_column = "units"
transformation = "log"
known_covariates = ["temperature", "cpi"]

[series.features]
lags = [1]
rolling_means = [2]
"#;

pub fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

/// Tuesday 2024-01-02, the first day of the week anchored on Monday 2024-01-08
pub fn first_day() -> NaiveDate {
    date("2024-01-02")
}

pub fn registry() -> SeriesRegistry {
    SeriesRegistry::from_toml_str(REGISTRY_TOML).unwrap()
}

/// Daily sales for `item` starting at [`first_day`]
pub fn insert_daily(store: &mut MemoryStore, item: &str, days: u64, value: impl Fn(u64) -> f64) {
    for day in 0..days {
        store.insert_sales(
            SALES_TABLE,
            ITEM_COLUMN,
            item,
            first_day() + Days::new(day),
            TARGET,
            value(day),
        );
    }
}

/// Store with `weeks` full weeks of sales for both items plus covariate tables
pub fn populated_store(weeks: u64) -> MemoryStore {
    let mut store = MemoryStore::new();
    insert_daily(&mut store, "ELEC", weeks * 7, |day| 10.0 + (day % 7) as f64);
    insert_daily(&mut store, "GARD", weeks * 7, |day| 3.0 + (day / 7) as f64);
    for day in 0..weeks * 7 {
        store.insert_value(
            "weather",
            first_day() + Days::new(day),
            "temp_c",
            Some(5.0 + (day / 7) as f64),
        );
    }
    for month in 1..=12 {
        store.insert_value(
            "price_index",
            NaiveDate::from_ymd_opt(2024, month, 1).unwrap(),
            "cpi",
            Some(100.0 + month as f64),
        );
    }
    store
}

pub fn descriptor(target: &str, horizon: usize, covariates: &[&str]) -> String {
    serde_json::json!({
        "format_version": 1,
        "target": target,
        "prediction_length": horizon,
        "known_covariates": covariates,
        "model": { "kind": "moving_average", "window": 2 }
    })
    .to_string()
}

/// Where the descriptor sits inside a published version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Root,
    Conventional,
    Deep,
    FlatBackslash,
}

/// Publish `descriptor` as `<root>/<model>/<version>/...` in the given layout
pub fn publish(
    root: &Path,
    model: &str,
    version: u32,
    series_id: &str,
    layout: Layout,
    descriptor: &str,
) -> PathBuf {
    let version_dir = root.join(model).join(version.to_string());
    let file = match layout {
        Layout::Root => version_dir.join("predictor.json"),
        Layout::Conventional => version_dir
            .join(format!("model_{}", series_id))
            .join("predictor.json"),
        Layout::Deep => version_dir
            .join("bundle")
            .join("artifacts")
            .join("inner")
            .join("predictor.json"),
        Layout::FlatBackslash => {
            version_dir.join(format!("model_{}\\predictor.json", series_id))
        }
    };
    fs::create_dir_all(file.parent().unwrap()).unwrap();
    fs::write(&file, descriptor).unwrap();
    fs::write(version_dir.join("MLmodel.txt"), "bundle metadata").unwrap();
    version_dir
}

/// Entries left under a workspace root
pub fn remaining_entries(root: &Path) -> Vec<PathBuf> {
    fs::read_dir(root)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect()
}

/// Model returning a fixed median (and `median + 1` as the 0.9 quantile),
/// remembering the last history it was given
#[derive(Debug)]
pub struct FixedModel {
    pub target: String,
    pub covariates: Vec<String>,
    pub median: Vec<f64>,
    pub seen: Mutex<Option<FeatureFrame>>,
}

impl FixedModel {
    pub fn new(target: &str, median: Vec<f64>) -> Self {
        Self {
            target: target.to_string(),
            covariates: Vec::new(),
            median,
            seen: Mutex::new(None),
        }
    }

    pub fn with_covariates(mut self, covariates: &[&str]) -> Self {
        self.covariates = covariates.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn seen_history(&self) -> Option<FeatureFrame> {
        self.seen.lock().unwrap().clone()
    }
}

impl ForecastModel for FixedModel {
    fn name(&self) -> &str {
        "fixed"
    }

    fn target(&self) -> &str {
        &self.target
    }

    fn prediction_length(&self) -> usize {
        self.median.len()
    }

    fn known_covariates(&self) -> &[String] {
        &self.covariates
    }

    fn predict(
        &self,
        history: &FeatureFrame,
        future_covariates: Option<&FeatureFrame>,
    ) -> forecast_serve::Result<FeatureFrame> {
        *self.seen.lock().unwrap() = Some(history.clone());
        if !self.covariates.is_empty() && future_covariates.is_none() {
            return Err(ForecastError::MissingCovariate("future frame".to_string()));
        }
        let last = history
            .last_timestamp()
            .ok_or_else(|| ForecastError::InferenceFailure("empty history".to_string()))?;
        let timestamps = (1..=self.median.len() as u64)
            .map(|step| last + Days::new(7 * step))
            .collect();
        FeatureFrame::new(history.item_id(), timestamps)?
            .with_column("0.5", self.median.clone())?
            .with_column("0.9", self.median.iter().map(|v| v + 1.0).collect())
    }
}

/// `weeks` consecutive weekly rows from 2024-01-08 with the given columns
pub fn weekly_frame(weeks: usize, columns: &[(&str, Vec<f64>)]) -> FeatureFrame {
    let timestamps = (0..weeks as u64)
        .map(|w| date("2024-01-08") + Days::new(7 * w))
        .collect();
    let mut frame = FeatureFrame::new("GARD", timestamps).unwrap();
    for (name, values) in columns {
        frame.set_column(*name, values.clone()).unwrap();
    }
    frame
}
