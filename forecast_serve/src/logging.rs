//! Subscriber setup for the binaries. The library only emits events.

use crate::error::{ForecastError, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "forecast_serve=info";

/// Install a stderr subscriber filtered by `RUST_LOG`.
///
/// `verbose` lowers the default to `debug` when `RUST_LOG` is unset.
pub fn init_logging(verbose: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("forecast_serve=debug")
        } else {
            EnvFilter::new(DEFAULT_LOG_FILTER)
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| ForecastError::Config(format!("logging already initialised: {}", e)))
}
