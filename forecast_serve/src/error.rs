//! Error types for the forecast_serve crate

use polars::prelude::PolarsError;
use std::fmt;
use thiserror::Error;

/// Pipeline stage an error was raised in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Registry,
    Workspace,
    Artifact,
    Assemble,
    Transform,
    Covariates,
    Inference,
    Historical,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Registry => "registry",
            Stage::Workspace => "workspace",
            Stage::Artifact => "artifact",
            Stage::Assemble => "assemble",
            Stage::Transform => "transform",
            Stage::Covariates => "covariates",
            Stage::Inference => "inference",
            Stage::Historical => "historical",
        };
        f.write_str(name)
    }
}

/// Custom error types for the forecast_serve crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// The series identifier is not registered
    #[error("Unknown series: {0}")]
    UnknownSeries(String),

    /// No artifact (or no loadable descriptor) exists for the model
    #[error("Artifact not found for model '{model}': {reason}")]
    ArtifactNotFound { model: String, reason: String },

    /// A descriptor was found but could not be loaded
    #[error("Failed to load artifact at '{path}': {reason}")]
    ArtifactLoadFailure { path: String, reason: String },

    /// Nothing left to forecast from after cleaning and filtering
    #[error("Empty feature frame: {0}")]
    EmptyFeatureFrame(String),

    /// Forward or inverse transform received a value it cannot handle
    #[error("Transformation error: {0}")]
    TransformationError(String),

    /// The model's predict operation failed or returned an unusable forecast
    #[error("Inference failure: {0}")]
    InferenceFailure(String),

    /// A frame violated its shape invariants
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    /// A covariate demanded by the model is not provided for the series
    #[error("Missing covariate: {0}")]
    MissingCovariate(String),

    /// Invalid registry or service configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Historical store query failure
    #[error("Store error: {0}")]
    Store(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),

    /// An error annotated with the series and stage it was raised in
    #[error("[{series_id}] {stage} stage failed: {source}")]
    Stage {
        series_id: String,
        stage: Stage,
        #[source]
        source: Box<ForecastError>,
    },
}

/// Coarse classification the serving layer maps to status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnknownSeries,
    ArtifactNotFound,
    ArtifactLoadFailure,
    EmptyFeatureFrame,
    TransformationError,
    InferenceFailure,
    InvalidFrame,
    Configuration,
    Storage,
}

impl ForecastError {
    /// Kind of the innermost error
    pub fn kind(&self) -> ErrorKind {
        match self {
            ForecastError::UnknownSeries(_) => ErrorKind::UnknownSeries,
            ForecastError::ArtifactNotFound { .. } => ErrorKind::ArtifactNotFound,
            ForecastError::ArtifactLoadFailure { .. } => ErrorKind::ArtifactLoadFailure,
            ForecastError::EmptyFeatureFrame(_) => ErrorKind::EmptyFeatureFrame,
            ForecastError::TransformationError(_) => ErrorKind::TransformationError,
            ForecastError::InferenceFailure(_) => ErrorKind::InferenceFailure,
            ForecastError::InvalidFrame(_) => ErrorKind::InvalidFrame,
            ForecastError::MissingCovariate(_) | ForecastError::Config(_) => {
                ErrorKind::Configuration
            }
            ForecastError::Store(_) | ForecastError::IoError(_) | ForecastError::PolarsError(_) => {
                ErrorKind::Storage
            }
            ForecastError::Stage { source, .. } => source.kind(),
        }
    }

    /// Stage the error was raised in, if known
    pub fn stage(&self) -> Option<Stage> {
        match self {
            ForecastError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// The error without any stage annotation
    pub fn root(&self) -> &ForecastError {
        match self {
            ForecastError::Stage { source, .. } => source.root(),
            other => other,
        }
    }

    /// True for errors caused by the caller (maps to a not-found response)
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::UnknownSeries
    }

    /// True for data-quality problems, as opposed to a broken pipeline
    pub fn is_data_quality(&self) -> bool {
        self.kind() == ErrorKind::EmptyFeatureFrame
    }
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::PolarsError(err.to_string())
    }
}

impl From<rusqlite::Error> for ForecastError {
    fn from(err: rusqlite::Error) -> Self {
        ForecastError::Store(err.to_string())
    }
}

impl From<toml::de::Error> for ForecastError {
    fn from(err: toml::de::Error) -> Self {
        ForecastError::Config(err.to_string())
    }
}

/// Attach series and stage context to a result
pub trait StageContext<T> {
    fn in_stage(self, series_id: &str, stage: Stage) -> Result<T>;
}

impl<T> StageContext<T> for Result<T> {
    fn in_stage(self, series_id: &str, stage: Stage) -> Result<T> {
        self.map_err(|err| match err {
            annotated @ ForecastError::Stage { .. } => annotated,
            other => ForecastError::Stage {
                series_id: series_id.to_string(),
                stage,
                source: Box::new(other),
            },
        })
    }
}
