//! Level estimators used by the built-in forecasters

use crate::rolling::TrailingWindow;
use crate::{MathError, Result};

/// Simple exponential smoothing state
#[derive(Debug, Clone)]
pub struct ExponentialSmoothing {
    alpha: f64,
    level: Option<f64>,
}

impl ExponentialSmoothing {
    /// Create a new exponential smoothing state with smoothing factor `alpha` in (0, 1)
    pub fn new(alpha: f64) -> Result<Self> {
        if alpha <= 0.0 || alpha >= 1.0 {
            return Err(MathError::InvalidInput(
                "Alpha must be between 0 and 1".to_string(),
            ));
        }

        Ok(Self { alpha, level: None })
    }

    /// Update the level with a new observation
    pub fn update(&mut self, value: f64) {
        self.level = Some(match self.level {
            None => value,
            Some(level) => self.alpha * value + (1.0 - self.alpha) * level,
        });
    }

    /// Current level
    pub fn level(&self) -> Result<f64> {
        self.level.ok_or_else(|| {
            MathError::InsufficientData("No observations have been smoothed yet".to_string())
        })
    }
}

/// Fitted level of a series together with its one-step-ahead residuals
#[derive(Debug, Clone, PartialEq)]
pub struct LevelFit {
    /// Level after consuming every observation
    pub level: f64,
    /// `actual - predicted` for every observation that had a prediction
    pub residuals: Vec<f64>,
}

/// Fit simple exponential smoothing over `values`
pub fn fit_exponential_smoothing(values: &[f64], alpha: f64) -> Result<LevelFit> {
    let mut state = ExponentialSmoothing::new(alpha)?;
    let mut residuals = Vec::with_capacity(values.len().saturating_sub(1));

    for &value in values {
        if let Ok(level) = state.level() {
            residuals.push(value - level);
        }
        state.update(value);
    }

    Ok(LevelFit {
        level: state.level()?,
        residuals,
    })
}

/// Fit a trailing moving average of length `window` over `values`
pub fn fit_moving_average(values: &[f64], window: usize) -> Result<LevelFit> {
    let mut tracker = TrailingWindow::new(window)?;
    if values.len() < window {
        return Err(MathError::InsufficientData(format!(
            "Need at least {} observations, have {}",
            window,
            values.len()
        )));
    }

    let mut residuals = Vec::with_capacity(values.len() - window);
    for &value in values {
        if let Some(mean) = tracker.mean() {
            residuals.push(value - mean);
        }
        tracker.push(value);
    }

    let level = tracker.mean().ok_or_else(|| {
        MathError::InsufficientData("Moving average window is incomplete".to_string())
    })?;

    Ok(LevelFit { level, residuals })
}
