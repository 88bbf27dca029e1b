//! Per-request forecast pipeline
//!
//! [`Pipeline`] owns the shared, read-only collaborators (series registry,
//! historical store, artifact registry) and runs one isolated request per
//! call. It is `Send + Sync`; callers share it behind an `Arc` and invoke it
//! from as many threads as they like.

use crate::artifact::{ArtifactRegistry, ArtifactResolver, LocalRegistry};
use crate::assembler::DataAssembler;
use crate::config::ServiceConfig;
use crate::error::{ForecastError, Result, Stage, StageContext};
use crate::frame::WeeklyFeatureRow;
use crate::inference::{ForecastResult, InferenceExecutor, Mode};
use crate::models::{DescriptorLoader, ModelLoader};
use crate::registry::{SeriesConfig, SeriesRegistry};
use crate::store::HistoricalStore;
use crate::transform::TransformationEngine;
use crate::workspace::{Workspace, WorkspaceManager};
use chrono::{Months, NaiveDate};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, info_span};

/// The forecast-serving entry point
pub struct Pipeline {
    registry: Arc<SeriesRegistry>,
    assembler: DataAssembler,
    resolver: ArtifactResolver,
    workspaces: WorkspaceManager,
    transform: TransformationEngine,
    executor: InferenceExecutor,
}

impl Pipeline {
    pub fn new(
        registry: Arc<SeriesRegistry>,
        store: Arc<dyn HistoricalStore>,
        artifacts: Arc<dyn ArtifactRegistry>,
        loader: Arc<dyn ModelLoader>,
        workspaces: WorkspaceManager,
    ) -> Self {
        Self::with_resolver(
            registry,
            store,
            ArtifactResolver::new(artifacts, loader),
            workspaces,
        )
    }

    /// Pipeline with a custom resolver, e.g. a different locate chain
    pub fn with_resolver(
        registry: Arc<SeriesRegistry>,
        store: Arc<dyn HistoricalStore>,
        resolver: ArtifactResolver,
        workspaces: WorkspaceManager,
    ) -> Self {
        Self {
            assembler: DataAssembler::new(store, registry.clone()),
            registry,
            resolver,
            workspaces,
            transform: TransformationEngine,
            executor: InferenceExecutor::new(),
        }
    }

    /// Wire the pipeline from service configuration
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        let registry = Arc::new(SeriesRegistry::from_file(&config.registry_path)?);
        let store = config.store.open(config.pool_size)?;
        let artifacts: Arc<dyn ArtifactRegistry> =
            Arc::new(LocalRegistry::new(&config.artifacts_root)?);
        let workspaces = match &config.workspace_root {
            Some(root) => WorkspaceManager::new(root)?,
            None => WorkspaceManager::in_temp_dir()?,
        };
        Ok(Self::new(
            registry,
            store,
            artifacts,
            Arc::new(DescriptorLoader),
            workspaces,
        ))
    }

    pub fn registry(&self) -> &SeriesRegistry {
        &self.registry
    }

    pub fn workspaces(&self) -> &WorkspaceManager {
        &self.workspaces
    }

    /// Forecast one series.
    ///
    /// The request's workspace is removed before returning, whatever the
    /// outcome. Every error carries the series id and the failing stage.
    pub fn get_prediction(&self, series_id: &str, mode: Mode) -> Result<ForecastResult> {
        let config = self
            .registry
            .lookup(series_id)
            .in_stage(series_id, Stage::Registry)?;
        let workspace = self
            .workspaces
            .open(series_id)
            .in_stage(series_id, Stage::Workspace)?;

        let span = info_span!(
            "forecast",
            series = series_id,
            request = %workspace.request_id(),
            %mode
        );
        let _entered = span.enter();

        let outcome = self.predict_in(config, &workspace, mode);
        let closed = workspace.close().in_stage(series_id, Stage::Workspace);
        let result = outcome?;
        closed?;

        info!(rows = result.len(), "forecast complete");
        Ok(result)
    }

    fn predict_in(
        &self,
        config: &SeriesConfig,
        workspace: &Workspace,
        mode: Mode,
    ) -> Result<ForecastResult> {
        let id = config.id.as_str();
        let resolved = self
            .resolver
            .resolve(&config.model_name(), id, workspace.path())
            .in_stage(id, Stage::Artifact)?;
        let model = resolved.model.as_ref();

        let history = self
            .assembler
            .assemble_for_model(config, model.known_covariates())
            .in_stage(id, Stage::Assemble)?;
        let history = self
            .transform
            .forward(&history, config, model.target())
            .in_stage(id, Stage::Transform)?;

        self.executor
            .run(&history, model, config, mode)
            .in_stage(id, Stage::Inference)
    }

    /// Last year's weekly sales, relabelled onto this year's calendar.
    ///
    /// Daily rows between `start - 1 year` and `end - 1 year` are summed per
    /// week anchor and each anchor is moved forward one year. No data yields an
    /// empty vector.
    pub fn get_historical(
        &self,
        series_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<WeeklyFeatureRow>> {
        if start > end {
            return Err(ForecastError::Config(format!(
                "start date {} is after end date {}",
                start, end
            )));
        }
        let config = self
            .registry
            .lookup(series_id)
            .in_stage(series_id, Stage::Registry)?;

        let year = Months::new(12);
        let shift_back = |date: NaiveDate| {
            date.checked_sub_months(year)
                .ok_or_else(|| ForecastError::Config(format!("date {} is out of range", date)))
        };
        let weekly = self
            .assembler
            .weekly_sales(config, shift_back(start)?, shift_back(end)?)
            .in_stage(series_id, Stage::Historical)?;

        weekly
            .into_iter()
            .map(|(anchor, total)| {
                let timestamp = anchor.checked_add_months(year).ok_or_else(|| {
                    ForecastError::Config(format!("date {} is out of range", anchor))
                })?;
                Ok(WeeklyFeatureRow {
                    item_id: config.item_key.clone(),
                    timestamp,
                    values: BTreeMap::from([(config.target_column.clone(), total)]),
                })
            })
            .collect()
    }
}
