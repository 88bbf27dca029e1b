//! Forward and inverse target transforms
//!
//! The forward step writes the transformed target into a derived column and
//! leaves the original column untouched. The inverse step maps every quantile
//! column of a forecast back independently.

use crate::error::{ForecastError, Result};
use crate::frame::FeatureFrame;
use crate::registry::{SeriesConfig, Transformation};

impl Transformation {
    /// Forward transform of a single value
    pub fn apply(self, value: f64) -> Result<f64> {
        if !value.is_finite() {
            return Err(ForecastError::TransformationError(format!(
                "Cannot transform non-finite value {}",
                value
            )));
        }

        match self {
            Transformation::None => Ok(value),
            Transformation::Log | Transformation::Sqrt if value < 0.0 => {
                Err(ForecastError::TransformationError(format!(
                    "{:?} transform requires non-negative input, got {}",
                    self, value
                )))
            }
            Transformation::Log => Ok(value.ln_1p()),
            Transformation::Sqrt => Ok(value.sqrt()),
        }
    }

    /// Inverse transform of a single value
    pub fn invert(self, value: f64) -> Result<f64> {
        let inverted = match self {
            Transformation::None => value,
            Transformation::Log => value.exp_m1(),
            Transformation::Sqrt => value * value,
        };

        if !inverted.is_finite() {
            return Err(ForecastError::TransformationError(format!(
                "Inverse {:?} transform of {} is not finite",
                self, value
            )));
        }
        Ok(inverted)
    }

    /// Name of the derived target column, `{target}_{kind}` for active transforms
    pub fn derived_column(self, target: &str) -> String {
        match self {
            Transformation::None => target.to_string(),
            Transformation::Log => format!("{}_log", target),
            Transformation::Sqrt => format!("{}_sqrt", target),
        }
    }
}

/// Applies a series' configured transform to frames and forecasts
#[derive(Debug, Clone, Copy, Default)]
pub struct TransformationEngine;

impl TransformationEngine {
    /// Write the transformed target into `output_column`.
    ///
    /// The configured target column is kept unmodified alongside. With no
    /// transform and `output_column` equal to the target this is the identity.
    pub fn forward(
        &self,
        frame: &FeatureFrame,
        config: &SeriesConfig,
        output_column: &str,
    ) -> Result<FeatureFrame> {
        let source = frame.column(&config.target_column).ok_or_else(|| {
            ForecastError::TransformationError(format!(
                "Target column '{}' is missing",
                config.target_column
            ))
        })?;

        if output_column == config.target_column && config.transformation != Transformation::None {
            return Err(ForecastError::TransformationError(format!(
                "Transformed target would overwrite the original column '{}'",
                config.target_column
            )));
        }

        let transformed = source
            .iter()
            .map(|&v| config.transformation.apply(v))
            .collect::<Result<Vec<_>>>()?;

        let mut out = frame.clone();
        out.set_column(output_column, transformed)?;
        Ok(out)
    }

    /// Map every column of a forecast back to sales units
    pub fn inverse(&self, forecast: &FeatureFrame, config: &SeriesConfig) -> Result<FeatureFrame> {
        if config.transformation == Transformation::None {
            return Ok(forecast.clone());
        }
        forecast.map_values(|_, v| config.transformation.invert(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_is_log1p() {
        assert_eq!(Transformation::Log.apply(0.0).unwrap(), 0.0);
        let y = Transformation::Log.apply(9.0).unwrap();
        assert!((y - 10f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_negative_and_nan() {
        assert!(Transformation::Log.apply(-1.0).is_err());
        assert!(Transformation::Sqrt.apply(-0.5).is_err());
        assert!(Transformation::None.apply(f64::NAN).is_err());
        assert_eq!(Transformation::None.apply(-3.0).unwrap(), -3.0);
    }

    #[test]
    fn test_inverse_overflow() {
        assert!(Transformation::Log.invert(1e6).is_err());
    }
}
