//! # Sales Forecast Workspace
//!
//! Umbrella crate re-exporting the workspace members:
//!
//! - [`series_math`]: numeric kernels on weekly series (lags, trailing means,
//!   gap filling, smoothing)
//! - [`forecast_serve`]: the forecast-serving pipeline
//!
//! ## Example
//!
//! ```
//! use sales_forecast_workspace::forecast_serve::SeriesRegistry;
//!
//! let registry = SeriesRegistry::from_toml_str(
//!     r#"
//!     [[series]]
//!     id = "electronics"
//!     source_table = "sales_daily"
//!     item_key = "ELEC"
//!     target_column = "units"
//!     "#,
//! )
//! .unwrap();
//! assert_eq!(registry.lookup("electronics").unwrap().model_name(), "sales-forecast-electronics");
//! ```

pub use forecast_serve;
pub use series_math;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
