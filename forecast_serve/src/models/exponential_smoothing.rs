//! Simple exponential smoothing forecaster

use super::{ForecastModel, ModelHeader};
use crate::error::{ForecastError, Result};
use crate::frame::FeatureFrame;
use series_math::smoothing::{fit_exponential_smoothing, ExponentialSmoothing};

/// Forecasts the last smoothed level for every step
#[derive(Debug, Clone)]
pub struct ExponentialSmoothingForecaster {
    /// Name of the model
    name: String,
    header: ModelHeader,
    /// Smoothing parameter
    alpha: f64,
}

impl ExponentialSmoothingForecaster {
    /// Create a new exponential smoothing forecaster
    pub fn new(header: ModelHeader, alpha: f64) -> Result<Self> {
        ExponentialSmoothing::new(alpha)
            .map_err(|e| ForecastError::InferenceFailure(e.to_string()))?;

        Ok(Self {
            name: format!("Exponential Smoothing (alpha={})", alpha),
            header,
            alpha,
        })
    }
}

impl ForecastModel for ExponentialSmoothingForecaster {
    fn name(&self) -> &str {
        &self.name
    }

    fn target(&self) -> &str {
        &self.header.target
    }

    fn prediction_length(&self) -> usize {
        self.header.prediction_length
    }

    fn known_covariates(&self) -> &[String] {
        &self.header.known_covariates
    }

    fn predict(
        &self,
        history: &FeatureFrame,
        future_covariates: Option<&FeatureFrame>,
    ) -> Result<FeatureFrame> {
        let values = self.header.history_values(history)?;
        let fit = fit_exponential_smoothing(values, self.alpha)
            .map_err(|e| ForecastError::InferenceFailure(e.to_string()))?;

        self.header
            .quantile_frame(history, future_covariates, fit.level, &fit.residuals)
    }
}
