//! Future values for known covariates

use crate::error::{ForecastError, Result};
use crate::frame::{weeks_after, FeatureFrame};
use crate::models::ForecastModel;
use tracing::debug;

/// Build the future covariate frame a model needs for its horizon.
///
/// Returns `None` when the model declares no known covariates. Otherwise the
/// frame has one row per horizon step at `last + 7k` days, and each covariate
/// holds its last observed value.
pub fn synthesize(
    history: &FeatureFrame,
    model: &dyn ForecastModel,
) -> Result<Option<FeatureFrame>> {
    let required = model.known_covariates();
    if required.is_empty() {
        return Ok(None);
    }

    let last = history.last_timestamp().ok_or_else(|| {
        ForecastError::EmptyFeatureFrame(format!(
            "cannot extend covariates for item '{}' without history",
            history.item_id()
        ))
    })?;

    let horizon = model.prediction_length();
    let timestamps = (1..=horizon).map(|step| weeks_after(last, step)).collect();
    let mut future = FeatureFrame::new(history.item_id(), timestamps)?;

    for name in required {
        let values = history.column(name).ok_or_else(|| {
            ForecastError::MissingCovariate(format!(
                "history has no column '{}' required by model {}",
                name,
                model.name()
            ))
        })?;
        // last() is present: history is non-empty above
        let held = values.last().copied().unwrap_or_default();
        future.set_column(name.clone(), vec![held; horizon])?;
    }

    debug!(item = %history.item_id(), rows = horizon, covariates = required.len(), "future covariates built");
    Ok(Some(future))
}
