//! Aggregation rules used when resampling daily observations into weekly buckets

use serde::{Deserialize, Serialize};

/// How the daily values falling into one bucket are reduced to a single value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Arithmetic mean of the present values
    #[default]
    Mean,
    /// Sum of the present values
    Sum,
    /// First present value in chronological order
    First,
}

impl Aggregation {
    /// Reduce a bucket. Missing values are skipped; a bucket without any present
    /// value yields `None` so it can be filled later.
    pub fn apply(self, values: &[Option<f64>]) -> Option<f64> {
        let mut present = values.iter().flatten().copied();
        match self {
            Aggregation::First => present.next(),
            Aggregation::Sum => {
                let mut seen = false;
                let total = present.fold(0.0, |acc, v| {
                    seen = true;
                    acc + v
                });
                seen.then_some(total)
            }
            Aggregation::Mean => {
                let (sum, count) = present.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
                (count > 0).then(|| sum / count as f64)
            }
        }
    }
}
