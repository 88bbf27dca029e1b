//! # Series Math
//!
//! Numeric kernels for weekly sales series.
//! The functions here operate on plain slices where a missing observation is
//! represented as `None`, so they can be reused by any frame implementation.

use thiserror::Error;

pub mod aggregate;
pub mod fill;
pub mod rolling;
pub mod smoothing;

pub use aggregate::Aggregation;

/// Errors that can occur in series calculations
#[derive(Error, Debug, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for series math operations
pub type Result<T> = std::result::Result<T, MathError>;

/// Population standard deviation of the given values
pub fn std_dev(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot compute standard deviation of an empty series".to_string(),
        ));
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

    Ok(variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_std_dev() {
        let sd = std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_relative_eq!(sd, 2.0);
    }

    #[test]
    fn test_std_dev_empty() {
        assert!(matches!(std_dev(&[]), Err(MathError::InsufficientData(_))));
    }
}
