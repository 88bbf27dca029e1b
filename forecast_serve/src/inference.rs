//! Model invocation and forecast post-processing

use crate::covariates::synthesize;
use crate::error::{ForecastError, Result, Stage, StageContext};
use crate::frame::FeatureFrame;
use crate::models::{ForecastModel, MEDIAN_COLUMN};
use crate::registry::SeriesConfig;
use crate::transform::TransformationEngine;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Which window a forecast covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum Mode {
    /// Strictly after the last historical week
    #[default]
    Future,
    /// Over the last `horizon` historical weeks, which are withheld from the model
    Backtest { with_actuals: bool },
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Future => write!(f, "future"),
            Mode::Backtest { .. } => write!(f, "backtest"),
        }
    }
}

/// One output row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastRecord {
    pub timestamp: NaiveDate,
    #[serde(flatten)]
    pub values: BTreeMap<String, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<f64>,
}

/// Final forecast for one series, in sales units
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastResult {
    pub series_id: String,
    pub mode: Mode,
    pub forecast: FeatureFrame,
    /// Withheld target values, row-aligned with `forecast` (backtest only)
    pub actuals: Option<Vec<f64>>,
}

impl ForecastResult {
    pub fn item_id(&self) -> &str {
        self.forecast.item_id()
    }

    pub fn len(&self) -> usize {
        self.forecast.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forecast.is_empty()
    }

    pub fn median(&self) -> Option<&[f64]> {
        self.forecast.column(MEDIAN_COLUMN)
    }

    pub fn records(&self) -> Vec<ForecastRecord> {
        self.forecast
            .timestamps()
            .iter()
            .enumerate()
            .map(|(row, &timestamp)| ForecastRecord {
                timestamp,
                values: self
                    .forecast
                    .columns()
                    .iter()
                    .map(|c| (c.name.clone(), c.values[row]))
                    .collect(),
                actual: self
                    .actuals
                    .as_ref()
                    .and_then(|actuals| actuals.get(row).copied()),
            })
            .collect()
    }
}

/// Withhold the last `horizon` rows of a frame.
///
/// Returns `(history, holdout)`; at least one history row must remain.
pub fn split_backtest(frame: &FeatureFrame, horizon: usize) -> Result<(FeatureFrame, FeatureFrame)> {
    if frame.len() <= horizon {
        return Err(ForecastError::EmptyFeatureFrame(format!(
            "backtest needs more than {} weekly rows, item '{}' has {}",
            horizon,
            frame.item_id(),
            frame.len()
        )));
    }
    Ok(frame.split_tail(horizon))
}

/// Runs a loaded model and maps its output back to sales units
#[derive(Debug, Clone, Copy, Default)]
pub struct InferenceExecutor {
    transform: TransformationEngine,
}

impl InferenceExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Predict from `history`, invert the series transform and clip at zero
    pub fn execute(
        &self,
        history: &FeatureFrame,
        future_covariates: Option<&FeatureFrame>,
        model: &dyn ForecastModel,
        config: &SeriesConfig,
    ) -> Result<FeatureFrame> {
        let raw = model
            .predict(history, future_covariates)
            .map_err(|err| match err {
                failure @ ForecastError::InferenceFailure(_) => failure,
                other => ForecastError::InferenceFailure(format!(
                    "model {} failed: {}",
                    model.name(),
                    other
                )),
            })?;

        if raw.len() != model.prediction_length() {
            return Err(ForecastError::InferenceFailure(format!(
                "model {} returned {} rows, expected {}",
                model.name(),
                raw.len(),
                model.prediction_length()
            )));
        }
        if raw.column(MEDIAN_COLUMN).is_none() {
            return Err(ForecastError::InferenceFailure(format!(
                "model {} returned no median column",
                model.name()
            )));
        }

        for column in raw.columns() {
            if let Some(idx) = column.values.iter().position(|v| !v.is_finite()) {
                return Err(ForecastError::InferenceFailure(format!(
                    "model {} returned non-finite value {} in column '{}' at {}",
                    model.name(),
                    column.values[idx],
                    column.name,
                    raw.timestamps()[idx]
                )));
            }
        }

        let inverted = self.transform.inverse(&raw, config)?;
        inverted.map_values(|_, v| Ok(v.max(0.0)))
    }

    /// Execute one request in the given mode.
    ///
    /// `frame` is the transformed history. In backtest mode its last `horizon`
    /// rows are withheld from the model and, if requested, their original
    /// target values are attached as actuals.
    pub fn run(
        &self,
        frame: &FeatureFrame,
        model: &dyn ForecastModel,
        config: &SeriesConfig,
        mode: Mode,
    ) -> Result<ForecastResult> {
        let horizon = model.prediction_length();
        let (history, holdout) = match mode {
            Mode::Future => (frame.clone(), None),
            Mode::Backtest { .. } => {
                let (history, holdout) = split_backtest(frame, horizon)?;
                (history, Some(holdout))
            }
        };

        let future = synthesize(&history, model).in_stage(&config.id, Stage::Covariates)?;
        debug!(
            history_rows = history.len(),
            future = future.is_some(),
            %mode,
            "invoking model"
        );
        let forecast = self.execute(&history, future.as_ref(), model, config)?;

        let actuals = match (mode, holdout) {
            (Mode::Backtest { with_actuals: true }, Some(holdout)) => {
                Some(holdout.require_column(&config.target_column)?.to_vec())
            }
            _ => None,
        };

        Ok(ForecastResult {
            series_id: config.id.clone(),
            mode,
            forecast,
            actuals,
        })
    }
}
