//! Loaded forecasting models
//!
//! A resolved artifact yields a [`ForecastModel`]: its target column, horizon,
//! required future covariates and a predict operation returning one column per
//! quantile. [`DescriptorLoader`] reads the `predictor.json` descriptor format
//! and builds one of the built-in forecasters.

use crate::error::{ForecastError, Result};
use crate::frame::{weeks_after, FeatureFrame};
use serde::Deserialize;
use series_math::std_dev;
use statrs::distribution::{ContinuousCDF, Normal};
use std::fmt::Debug;
use std::path::Path;

pub mod exponential_smoothing;
pub mod moving_average;

pub use exponential_smoothing::ExponentialSmoothingForecaster;
pub use moving_average::MovingAverageForecaster;

/// File name marking the root of a loadable model
pub const DESCRIPTOR_FILE: &str = "predictor.json";

/// Column holding the point forecast
pub const MEAN_COLUMN: &str = "mean";

/// Column holding the median forecast
pub const MEDIAN_COLUMN: &str = "0.5";

const SUPPORTED_FORMAT: u32 = 1;

/// A trained model as seen by the serving pipeline
pub trait ForecastModel: Send + Sync + Debug {
    /// Human readable name
    fn name(&self) -> &str;

    /// Column of the history frame the model forecasts
    fn target(&self) -> &str;

    /// Number of weekly steps produced by `predict`
    fn prediction_length(&self) -> usize;

    /// Covariates whose future values must be supplied to `predict`
    fn known_covariates(&self) -> &[String];

    /// Forecast `prediction_length` steps after the last history row
    fn predict(
        &self,
        history: &FeatureFrame,
        future_covariates: Option<&FeatureFrame>,
    ) -> Result<FeatureFrame>;
}

/// Turns a located model directory into a loaded model
pub trait ModelLoader: Send + Sync {
    fn load(&self, model_root: &Path) -> Result<Box<dyn ForecastModel>>;
}

fn default_quantile_levels() -> Vec<f64> {
    vec![0.1, 0.5, 0.9]
}

/// Estimator used by a built-in forecaster
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelSpec {
    MovingAverage { window: usize },
    ExponentialSmoothing { alpha: f64 },
}

/// Contents of `predictor.json`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelDescriptor {
    pub format_version: u32,
    pub target: String,
    pub prediction_length: usize,
    #[serde(default)]
    pub known_covariates: Vec<String>,
    #[serde(default = "default_quantile_levels")]
    pub quantile_levels: Vec<f64>,
    pub model: ModelSpec,
}

impl ModelDescriptor {
    fn validate(&self) -> std::result::Result<(), String> {
        if self.format_version != SUPPORTED_FORMAT {
            return Err(format!(
                "unsupported format_version {} (expected {})",
                self.format_version, SUPPORTED_FORMAT
            ));
        }
        if self.prediction_length == 0 {
            return Err("prediction_length must be positive".to_string());
        }
        if let Some(q) = self
            .quantile_levels
            .iter()
            .find(|q| !(**q > 0.0 && **q < 1.0))
        {
            return Err(format!("quantile level {} is outside (0, 1)", q));
        }
        if !self.quantile_levels.contains(&0.5) {
            return Err("quantile_levels must include the median 0.5".to_string());
        }
        Ok(())
    }
}

/// Loader for the `predictor.json` descriptor format
#[derive(Debug, Clone, Copy, Default)]
pub struct DescriptorLoader;

impl ModelLoader for DescriptorLoader {
    fn load(&self, model_root: &Path) -> Result<Box<dyn ForecastModel>> {
        let path = model_root.join(DESCRIPTOR_FILE);
        let load_failure = |reason: String| ForecastError::ArtifactLoadFailure {
            path: path.display().to_string(),
            reason,
        };

        let raw = std::fs::read_to_string(&path).map_err(|e| load_failure(e.to_string()))?;
        let descriptor: ModelDescriptor =
            serde_json::from_str(&raw).map_err(|e| load_failure(e.to_string()))?;
        descriptor.validate().map_err(load_failure)?;

        let header = ModelHeader {
            target: descriptor.target,
            prediction_length: descriptor.prediction_length,
            known_covariates: descriptor.known_covariates,
            quantile_levels: descriptor.quantile_levels,
        };
        let model: Box<dyn ForecastModel> = match descriptor.model {
            ModelSpec::MovingAverage { window } => Box::new(
                MovingAverageForecaster::new(header, window)
                    .map_err(|e| load_failure(e.to_string()))?,
            ),
            ModelSpec::ExponentialSmoothing { alpha } => Box::new(
                ExponentialSmoothingForecaster::new(header, alpha)
                    .map_err(|e| load_failure(e.to_string()))?,
            ),
        };
        Ok(model)
    }
}

/// Settings shared by every built-in forecaster
#[derive(Debug, Clone, PartialEq)]
pub struct ModelHeader {
    pub target: String,
    pub prediction_length: usize,
    pub known_covariates: Vec<String>,
    pub quantile_levels: Vec<f64>,
}

impl ModelHeader {
    /// Target values of the history, failing when absent or empty
    pub(crate) fn history_values<'a>(&self, history: &'a FeatureFrame) -> Result<&'a [f64]> {
        let values = history.require_column(&self.target)?;
        if values.is_empty() {
            return Err(ForecastError::InferenceFailure(
                "History frame is empty".to_string(),
            ));
        }
        Ok(values)
    }

    /// Timestamps of the forecast rows
    fn horizon_timestamps(
        &self,
        history: &FeatureFrame,
        future: Option<&FeatureFrame>,
    ) -> Result<Vec<chrono::NaiveDate>> {
        if !self.known_covariates.is_empty() {
            let future = future.ok_or_else(|| {
                ForecastError::InferenceFailure(format!(
                    "Model requires future covariates {:?} but none were supplied",
                    self.known_covariates
                ))
            })?;
            if future.len() != self.prediction_length {
                return Err(ForecastError::InferenceFailure(format!(
                    "Future covariates have {} rows, expected {}",
                    future.len(),
                    self.prediction_length
                )));
            }
            for name in &self.known_covariates {
                future.require_column(name)?;
            }
            return Ok(future.timestamps().to_vec());
        }

        let last = history.last_timestamp().ok_or_else(|| {
            ForecastError::InferenceFailure("History frame is empty".to_string())
        })?;
        Ok((1..=self.prediction_length)
            .map(|step| weeks_after(last, step))
            .collect())
    }

    /// Build the quantile frame around a flat point forecast.
    ///
    /// Quantiles are normal bands whose width is the residual standard
    /// deviation scaled by `sqrt(step)`.
    pub(crate) fn quantile_frame(
        &self,
        history: &FeatureFrame,
        future: Option<&FeatureFrame>,
        point: f64,
        residuals: &[f64],
    ) -> Result<FeatureFrame> {
        let timestamps = self.horizon_timestamps(history, future)?;
        let sigma = if residuals.is_empty() {
            0.0
        } else {
            std_dev(residuals).map_err(|e| ForecastError::InferenceFailure(e.to_string()))?
        };
        let normal = Normal::new(0.0, 1.0)
            .map_err(|e| ForecastError::InferenceFailure(e.to_string()))?;

        let mut frame = FeatureFrame::new(history.item_id(), timestamps)?
            .with_column(MEAN_COLUMN, vec![point; self.prediction_length])?;

        for &level in &self.quantile_levels {
            let z = if level == 0.5 {
                0.0
            } else {
                normal.inverse_cdf(level)
            };
            let values = (1..=self.prediction_length)
                .map(|step| point + z * sigma * (step as f64).sqrt())
                .collect();
            frame.set_column(quantile_column(level), values)?;
        }
        Ok(frame)
    }
}

/// Column name for a quantile level, e.g. `0.1`
pub fn quantile_column(level: f64) -> String {
    format!("{}", level)
}
