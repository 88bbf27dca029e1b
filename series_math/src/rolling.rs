//! Lag and trailing-window features

use crate::{MathError, Result};
use std::collections::VecDeque;

/// Fixed-size window keeping a running sum of the last `period` values
#[derive(Debug, Clone)]
pub struct TrailingWindow {
    period: usize,
    values: VecDeque<f64>,
    sum: f64,
}

impl TrailingWindow {
    /// Create a new window with the specified period
    pub fn new(period: usize) -> Result<Self> {
        if period == 0 {
            return Err(MathError::InvalidInput(
                "Period must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            period,
            values: VecDeque::with_capacity(period),
            sum: 0.0,
        })
    }

    /// Push a new value, evicting the oldest one once the window is full
    pub fn push(&mut self, value: f64) {
        self.values.push_back(value);
        self.sum += value;

        if self.values.len() > self.period {
            if let Some(old_value) = self.values.pop_front() {
                self.sum -= old_value;
            }
        }
    }

    /// Mean over the window, `None` until `period` values have been pushed
    pub fn mean(&self) -> Option<f64> {
        (self.values.len() == self.period).then(|| self.sum / self.period as f64)
    }

    /// Clear all values
    pub fn reset(&mut self) {
        self.values.clear();
        self.sum = 0.0;
    }
}

/// Shift a series `k` periods back: entry `i` holds the value at `i - k`
pub fn lag(values: &[Option<f64>], k: usize) -> Result<Vec<Option<f64>>> {
    if k == 0 {
        return Err(MathError::InvalidInput(
            "Lag must be greater than zero".to_string(),
        ));
    }

    Ok((0..values.len())
        .map(|i| if i >= k { values[i - k] } else { None })
        .collect())
}

/// Mean of the `window` values strictly before each entry.
///
/// Entry `i` is the mean of `values[i - window..i]`, so no entry ever includes
/// its own value. Entries without a complete window, or whose window contains a
/// missing value, are `None`.
pub fn trailing_mean(values: &[Option<f64>], window: usize) -> Result<Vec<Option<f64>>> {
    let mut tracker = TrailingWindow::new(window)?;
    let mut out = Vec::with_capacity(values.len());
    // number of consecutive present values currently in the tracker
    let mut run = 0usize;

    for value in values {
        out.push(if run >= window { tracker.mean() } else { None });

        match value {
            Some(v) => {
                tracker.push(*v);
                run += 1;
            }
            None => {
                tracker.reset();
                run = 0;
            }
        }
    }

    Ok(out)
}
