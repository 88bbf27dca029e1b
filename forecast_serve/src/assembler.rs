//! Weekly feature table construction
//!
//! For one series: fetch daily sales, left-join the required covariates on
//! their derived keys, resample to Monday week anchors, fill covariate gaps,
//! add lag and trailing-mean features, drop incomplete rows, then apply the
//! positional and date cutoffs.

use crate::error::{ForecastError, Result};
use crate::frame::{week_anchor, FeatureFrame};
use crate::registry::{CovariateSpec, JoinKey, SeriesConfig, SeriesRegistry};
use crate::store::{HistoricalStore, SourceQuery};
use chrono::{Datelike, Days, NaiveDate};
use series_math::fill::fill_gaps;
use series_math::rolling::{lag, trailing_mean};
use series_math::Aggregation;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// One daily sales row with its joined covariate values
#[derive(Debug, Clone, PartialEq)]
pub struct RawObservation {
    pub item_id: String,
    pub date: NaiveDate,
    pub value: Option<f64>,
    pub covariates: Vec<Option<f64>>,
}

/// A weekly column under construction, gaps still allowed
struct DraftColumn {
    name: String,
    values: Vec<Option<f64>>,
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day0()))
}

fn join_key(join: JoinKey, date: NaiveDate) -> NaiveDate {
    match join {
        JoinKey::SameDay => date,
        JoinKey::Month => month_start(date),
    }
}

/// Builds [`FeatureFrame`]s from the historical store
pub struct DataAssembler {
    store: Arc<dyn HistoricalStore>,
    registry: Arc<SeriesRegistry>,
}

impl DataAssembler {
    pub fn new(store: Arc<dyn HistoricalStore>, registry: Arc<SeriesRegistry>) -> Self {
        Self { store, registry }
    }

    /// Feature frame with every covariate the series lists
    pub fn assemble(&self, config: &SeriesConfig) -> Result<FeatureFrame> {
        self.assemble_with(config, &config.known_covariates)
    }

    /// Feature frame with only the series covariates the model demands.
    ///
    /// Fails with `MissingCovariate` when the model asks for a covariate the
    /// series does not list.
    pub fn assemble_for_model(
        &self,
        config: &SeriesConfig,
        model_covariates: &[String],
    ) -> Result<FeatureFrame> {
        if let Some(missing) = model_covariates
            .iter()
            .find(|name| !config.known_covariates.contains(name))
        {
            return Err(ForecastError::MissingCovariate(format!(
                "model requires '{}' which series '{}' does not provide",
                missing, config.id
            )));
        }
        let required: Vec<String> = config
            .known_covariates
            .iter()
            .filter(|name| model_covariates.contains(name))
            .cloned()
            .collect();
        self.assemble_with(config, &required)
    }

    /// Daily sales rows with the named covariates left-joined
    pub fn fetch_observations(
        &self,
        config: &SeriesConfig,
        covariates: &[String],
    ) -> Result<Vec<RawObservation>> {
        let mut observations: Vec<RawObservation> = self
            .store
            .fetch(&SourceQuery::sales(config)?)?
            .into_iter()
            .map(|record| RawObservation {
                item_id: config.item_key.clone(),
                date: record.date,
                value: record.values.first().copied().flatten(),
                covariates: Vec::with_capacity(covariates.len()),
            })
            .collect();
        observations.sort_by_key(|obs| obs.date);

        let (Some(first), Some(last)) = (observations.first(), observations.last()) else {
            return Ok(observations);
        };
        let (first, last) = (first.date, last.date);

        for name in covariates {
            let spec = self.registry.covariate(name)?;
            let lookup = self.covariate_lookup(spec, first, last)?;
            for obs in &mut observations {
                let key = join_key(spec.join, obs.date);
                obs.covariates.push(lookup.get(&key).copied());
            }
        }
        Ok(observations)
    }

    fn covariate_lookup(
        &self,
        spec: &CovariateSpec,
        first: NaiveDate,
        last: NaiveDate,
    ) -> Result<HashMap<NaiveDate, f64>> {
        let query = SourceQuery::covariate(spec)?.between(join_key(spec.join, first), last);
        let mut lookup = HashMap::new();
        for record in self.store.fetch(&query)? {
            if let Some(value) = record.values.first().copied().flatten() {
                lookup.entry(join_key(spec.join, record.date)).or_insert(value);
            }
        }
        debug!(covariate = %spec.name, keys = lookup.len(), "covariate fetched");
        Ok(lookup)
    }

    fn assemble_with(&self, config: &SeriesConfig, covariates: &[String]) -> Result<FeatureFrame> {
        let specs = covariates
            .iter()
            .map(|name| self.registry.covariate(name).cloned())
            .collect::<Result<Vec<_>>>()?;

        let observations = self.fetch_observations(config, covariates)?;
        if observations.is_empty() {
            return Err(ForecastError::EmptyFeatureFrame(format!(
                "no rows for item '{}' in table '{}'",
                config.item_key, config.source_table
            )));
        }

        let (anchors, buckets) = weekly_buckets(&observations);
        let mut columns = Vec::with_capacity(1 + specs.len());

        let target: Vec<Option<f64>> = buckets
            .iter()
            .map(|rows| {
                let values: Vec<Option<f64>> = rows.iter().map(|obs| obs.value).collect();
                Some(Aggregation::Sum.apply(&values).unwrap_or(0.0))
            })
            .collect();

        for (idx, spec) in specs.iter().enumerate() {
            let weekly: Vec<Option<f64>> = buckets
                .iter()
                .map(|rows| {
                    let values: Vec<Option<f64>> =
                        rows.iter().map(|obs| obs.covariates[idx]).collect();
                    spec.aggregation.apply(&values)
                })
                .collect();
            columns.push(DraftColumn {
                name: spec.name.clone(),
                values: fill_gaps(&weekly),
            });
        }

        let features = config.features();
        let invalid = |e: series_math::MathError| ForecastError::Config(e.to_string());
        for &k in &features.lags {
            columns.push(DraftColumn {
                name: format!("{}_lag_{}", config.target_column, k),
                values: lag(&target, k).map_err(invalid)?,
            });
        }
        for &w in &features.rolling_means {
            columns.push(DraftColumn {
                name: format!("{}_rolling_mean_{}", config.target_column, w),
                values: trailing_mean(&target, w).map_err(invalid)?,
            });
        }
        columns.insert(
            0,
            DraftColumn {
                name: config.target_column.clone(),
                values: target,
            },
        );

        let complete: Vec<usize> = (0..anchors.len())
            .filter(|&row| columns.iter().all(|c| c.values[row].is_some()))
            .collect();
        debug!(
            series = %config.id,
            weeks = anchors.len(),
            complete = complete.len(),
            "weekly rows built"
        );

        let mut kept = complete;
        if let Some(start) = config.data_filter_start {
            kept = kept.get(start..).map(<[usize]>::to_vec).unwrap_or_default();
        }
        if let Some(since) = config.training_start_date {
            kept.retain(|&row| anchors[row] >= since);
        }

        if kept.is_empty() {
            return Err(ForecastError::EmptyFeatureFrame(format!(
                "no complete weekly rows remain for series '{}'",
                config.id
            )));
        }

        let mut frame = FeatureFrame::new(
            config.item_key.clone(),
            kept.iter().map(|&row| anchors[row]).collect(),
        )?;
        for column in columns {
            let values = kept
                .iter()
                .map(|&row| column.values[row].unwrap_or_default())
                .collect();
            frame.set_column(column.name, values)?;
        }
        Ok(frame)
    }

    /// Weekly target sums for dates in `start..=end`, one row per anchor
    /// between the first and last observed week
    pub fn weekly_sales(
        &self,
        config: &SeriesConfig,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<(NaiveDate, f64)>> {
        let records = self
            .store
            .fetch(&SourceQuery::sales(config)?.between(start, end))?;
        let observations: Vec<RawObservation> = records
            .into_iter()
            .map(|record| RawObservation {
                item_id: config.item_key.clone(),
                date: record.date,
                value: record.values.first().copied().flatten(),
                covariates: Vec::new(),
            })
            .collect();
        if observations.is_empty() {
            return Ok(Vec::new());
        }

        let (anchors, buckets) = weekly_buckets(&observations);
        Ok(anchors
            .into_iter()
            .zip(buckets.iter())
            .map(|(anchor, rows)| {
                let values: Vec<Option<f64>> = rows.iter().map(|obs| obs.value).collect();
                (anchor, Aggregation::Sum.apply(&values).unwrap_or(0.0))
            })
            .collect())
    }
}

/// Group observations by week anchor, including empty weeks between the first
/// and last anchor
fn weekly_buckets(observations: &[RawObservation]) -> (Vec<NaiveDate>, Vec<Vec<&RawObservation>>) {
    let first = observations.iter().map(|obs| obs.date).min();
    let last = observations.iter().map(|obs| obs.date).max();
    let (Some(first), Some(last)) = (first, last) else {
        return (Vec::new(), Vec::new());
    };

    let first_anchor = week_anchor(first);
    let weeks = ((week_anchor(last) - first_anchor).num_days() / 7) as usize + 1;
    let anchors: Vec<NaiveDate> = (0..weeks)
        .map(|w| first_anchor + Days::new(7 * w as u64))
        .collect();

    let mut buckets: Vec<Vec<&RawObservation>> = vec![Vec::new(); weeks];
    for obs in observations {
        let idx = ((week_anchor(obs.date) - first_anchor).num_days() / 7) as usize;
        buckets[idx].push(obs);
    }
    (anchors, buckets)
}
