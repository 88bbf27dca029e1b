//! Moving average forecaster

use super::{ForecastModel, ModelHeader};
use crate::error::{ForecastError, Result};
use crate::frame::FeatureFrame;
use series_math::smoothing::fit_moving_average;

/// Forecasts the mean of the last `window` observations for every step
#[derive(Debug, Clone)]
pub struct MovingAverageForecaster {
    /// Name of the model
    name: String,
    header: ModelHeader,
    /// Window size
    window: usize,
}

impl MovingAverageForecaster {
    /// Create a new moving average forecaster
    pub fn new(header: ModelHeader, window: usize) -> Result<Self> {
        if window == 0 {
            return Err(ForecastError::InferenceFailure(
                "Window size must be positive".to_string(),
            ));
        }

        Ok(Self {
            name: format!("Moving Average (window={})", window),
            header,
            window,
        })
    }
}

impl ForecastModel for MovingAverageForecaster {
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
        let fit = fit_moving_average(values, self.window)
            .map_err(|e| ForecastError::InferenceFailure(e.to_string()))?;

        self.header
            .quantile_frame(history, future_covariates, fit.level, &fit.residuals)
    }
}
