//! Artifact resolution
//!
//! A model is looked up by name in an [`ArtifactRegistry`], its newest version
//! is downloaded into the request workspace, the model root is located with an
//! ordered chain of [`LocateStrategy`]s, and the root is handed to a
//! [`ModelLoader`]. Nothing is written outside the workspace.

use crate::error::{ForecastError, Result};
use crate::models::{ForecastModel, ModelLoader, DESCRIPTOR_FILE};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

pub mod local;
pub mod locate;

pub use local::LocalRegistry;
pub use locate::{default_strategies, ConventionalDir, LocateStrategy, NormalizedSeparators, RecursiveScan};

/// Stored version of a registered model
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModelVersion(u32);

impl ModelVersion {
    pub fn new(number: u32) -> Self {
        Self(number)
    }

    pub fn number(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ModelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registry of trained artifacts. Implementations are shared across requests.
pub trait ArtifactRegistry: Send + Sync {
    /// Stored versions, newest first
    fn list_versions(&self, model_name: &str) -> Result<Vec<ModelVersion>>;

    /// Populate `destination` with the contents of one version
    fn download(&self, model_name: &str, version: &ModelVersion, destination: &Path) -> Result<()>;
}

/// Outcome of a successful resolution
#[derive(Debug)]
pub struct ResolvedArtifact {
    pub version: ModelVersion,
    pub model_root: PathBuf,
    pub strategy: &'static str,
    pub model: Box<dyn ForecastModel>,
}

/// Resolves a model name to a loaded model inside a caller-owned workspace
pub struct ArtifactResolver {
    registry: Arc<dyn ArtifactRegistry>,
    loader: Arc<dyn ModelLoader>,
    strategies: Vec<Box<dyn LocateStrategy>>,
}

impl ArtifactResolver {
    /// Resolver with the default strategy chain
    pub fn new(registry: Arc<dyn ArtifactRegistry>, loader: Arc<dyn ModelLoader>) -> Self {
        Self::with_strategies(registry, loader, default_strategies())
    }

    pub fn with_strategies(
        registry: Arc<dyn ArtifactRegistry>,
        loader: Arc<dyn ModelLoader>,
        strategies: Vec<Box<dyn LocateStrategy>>,
    ) -> Self {
        Self {
            registry,
            loader,
            strategies,
        }
    }

    /// Download the newest version of `model_name` into `workspace` and load it
    pub fn resolve(
        &self,
        model_name: &str,
        series_id: &str,
        workspace: &Path,
    ) -> Result<ResolvedArtifact> {
        let version = self
            .registry
            .list_versions(model_name)?
            .into_iter()
            .max()
            .ok_or_else(|| ForecastError::ArtifactNotFound {
                model: model_name.to_string(),
                reason: "no stored versions".to_string(),
            })?;

        debug!(model = model_name, %version, workspace = %workspace.display(), "downloading artifact");
        self.registry.download(model_name, &version, workspace)?;

        let (strategy, model_root) = self.locate(workspace, series_id)?.ok_or_else(|| {
            ForecastError::ArtifactNotFound {
                model: model_name.to_string(),
                reason: format!("no {} found in version {}", DESCRIPTOR_FILE, version),
            }
        })?;

        let model = self.loader.load(&model_root)?;
        info!(
            model = model_name,
            %version,
            strategy,
            horizon = model.prediction_length(),
            "artifact resolved"
        );

        Ok(ResolvedArtifact {
            version,
            model_root,
            strategy,
            model,
        })
    }

    fn locate(&self, workspace: &Path, series_id: &str) -> Result<Option<(&'static str, PathBuf)>> {
        for strategy in &self.strategies {
            if let Some(root) = strategy.locate(workspace, series_id)? {
                return Ok(Some((strategy.name(), root)));
            }
            debug!(strategy = strategy.name(), "strategy found no model root");
        }
        Ok(None)
    }
}
