//! # Forecast Serve
//!
//! Serving pipeline for weekly retail sales forecasts.
//!
//! ## Features
//!
//! - Validated series registry loaded from TOML
//! - Historical stores backed by SQLite, CSV tables or memory
//! - Weekly feature assembly with covariate joins, gap filling, lags and rolling means
//! - `log` / `sqrt` target transforms with exact inverses
//! - Artifact resolution tolerant of inconsistent bundle layouts
//! - Future and backtest forecasts, clipped at zero, in sales units
//! - One isolated scratch workspace per request, removed on every exit path
//!
//! ## Quick Start
//!
//! ```no_run
//! use forecast_serve::{Mode, Pipeline, ServiceConfig};
//!
//! let config = ServiceConfig::from_env()?;
//! let pipeline = Pipeline::from_config(&config)?;
//!
//! let forecast = pipeline.get_prediction("electronics", Mode::Future)?;
//! for record in forecast.records() {
//!     println!("{} {:?}", record.timestamp, record.values.get("0.5"));
//! }
//! # Ok::<(), forecast_serve::ForecastError>(())
//! ```

pub mod artifact;
pub mod assembler;
pub mod config;
pub mod covariates;
pub mod error;
pub mod frame;
pub mod inference;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod registry;
pub mod store;
pub mod transform;
pub mod workspace;

// Re-export commonly used types
pub use crate::artifact::{ArtifactRegistry, ArtifactResolver, LocalRegistry, ModelVersion};
pub use crate::assembler::DataAssembler;
pub use crate::config::{ServiceConfig, StoreConfig};
pub use crate::error::{ErrorKind, ForecastError, Result, Stage};
pub use crate::frame::{FeatureFrame, WeeklyFeatureRow};
pub use crate::inference::{ForecastRecord, ForecastResult, InferenceExecutor, Mode};
pub use crate::models::{DescriptorLoader, ForecastModel, ModelLoader};
pub use crate::pipeline::Pipeline;
pub use crate::registry::{SeriesConfig, SeriesRegistry, Transformation};
pub use crate::store::HistoricalStore;
pub use crate::transform::TransformationEngine;
pub use crate::workspace::{Workspace, WorkspaceManager};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
