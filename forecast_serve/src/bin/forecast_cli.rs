use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use forecast_serve::config::{
    ARTIFACTS_VAR, DEFAULT_POOL_SIZE, POOL_SIZE_VAR, REGISTRY_VAR, STORE_VAR, WORKSPACE_ROOT_VAR,
};
use forecast_serve::logging::init_logging;
use forecast_serve::{ForecastError, ForecastResult, Mode, Pipeline, ServiceConfig, StoreConfig};
use std::error::Error;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "forecast-cli", version, about = "Serve weekly sales forecasts")]
struct Cli {
    /// Series registry (TOML)
    #[arg(long, env = REGISTRY_VAR)]
    registry: PathBuf,

    /// Historical store, `sqlite:<path>` or `csv:<dir>`
    #[arg(long, env = STORE_VAR)]
    store: String,

    /// Idle sqlite connections kept for reuse; concurrent queries may open more
    #[arg(long, env = POOL_SIZE_VAR, default_value_t = DEFAULT_POOL_SIZE)]
    pool_size: usize,

    /// Artifact registry root
    #[arg(long, env = ARTIFACTS_VAR)]
    artifacts: PathBuf,

    /// Directory for per-request workspaces
    #[arg(long, env = WORKSPACE_ROOT_VAR)]
    workspace_root: Option<PathBuf>,

    /// Debug logging unless RUST_LOG is set
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List registered series ids
    Series,
    /// Forecast one series
    Predict {
        series_id: String,
        /// Withhold the last horizon weeks and forecast them
        #[arg(long)]
        backtest: bool,
        /// Attach the withheld values (backtest only)
        #[arg(long, requires = "backtest")]
        with_actuals: bool,
        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,
    },
    /// Last year's weekly sales shifted onto the requested window
    Historical {
        series_id: String,
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        end: NaiveDate,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Csv,
}

impl Cli {
    fn service_config(&self) -> Result<ServiceConfig, ForecastError> {
        Ok(ServiceConfig {
            registry_path: self.registry.clone(),
            store: self.store.parse::<StoreConfig>()?,
            pool_size: self.pool_size,
            artifacts_root: self.artifacts.clone(),
            workspace_root: self.workspace_root.clone(),
        })
    }
}

fn write_csv(result: &ForecastResult, out: impl Write) -> Result<(), Box<dyn Error>> {
    let mut writer = csv::Writer::from_writer(out);
    let records = result.records();
    let columns: Vec<String> = result
        .forecast
        .column_names()
        .into_iter()
        .map(str::to_string)
        .collect();

    let mut header = vec!["timestamp".to_string()];
    header.extend(columns.iter().cloned());
    if result.actuals.is_some() {
        header.push("actual".to_string());
    }
    writer.write_record(&header)?;

    for record in records {
        let mut row = vec![record.timestamp.to_string()];
        for name in &columns {
            row.push(record.values.get(name).map(f64::to_string).unwrap_or_default());
        }
        if result.actuals.is_some() {
            row.push(record.actual.map(|v| v.to_string()).unwrap_or_default());
        }
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let pipeline = Pipeline::from_config(&cli.service_config()?)?;
    let stdout = io::stdout();

    match cli.command {
        Command::Series => {
            let mut out = stdout.lock();
            for id in pipeline.registry().ids() {
                writeln!(out, "{}", id)?;
            }
        }
        Command::Predict {
            series_id,
            backtest,
            with_actuals,
            format,
        } => {
            let mode = if backtest {
                Mode::Backtest { with_actuals }
            } else {
                Mode::Future
            };
            let result = pipeline.get_prediction(&series_id, mode)?;
            match format {
                Format::Json => {
                    serde_json::to_writer_pretty(stdout.lock(), &result.records())?;
                    println!();
                }
                Format::Csv => write_csv(&result, stdout.lock())?,
            }
        }
        Command::Historical {
            series_id,
            start,
            end,
        } => {
            let rows = pipeline.get_historical(&series_id, start, end)?;
            serde_json::to_writer_pretty(stdout.lock(), &rows)?;
            println!();
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("warning: {}", e);
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            let mut source = err.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {}", cause);
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}
