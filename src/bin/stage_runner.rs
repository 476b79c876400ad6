use clap::{Parser, ValueEnum};
use demand_route::config::AppConfig;
use demand_route::domain::model::{PredictionRequest, RouteRequest};
use demand_route::utils::monitor::ProcessMonitor;
use demand_route::utils::{logger, validation::Validate};
use demand_route::{ProcessRunner, StageService};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StageArg {
    Preprocess,
    Train,
    Predict,
    Route,
}

/// Runs one dashboard stage outside the server and prints its JSON result.
#[derive(Parser)]
#[command(name = "stage-runner")]
#[command(about = "Run a single forecasting or routing stage from the command line")]
struct Args {
    #[arg(value_enum)]
    stage: StageArg,

    /// Path to TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Request body as JSON, e.g. '{"store": "CA_1"}'
    #[arg(long, default_value = "{}")]
    params: String,

    /// Serve mock data regardless of configured scripts
    #[arg(long)]
    mock: bool,

    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    logger::init_logger(args.verbose, logger::LogFormat::Compact);

    let mut config = match &args.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };
    if args.mock {
        config.scripts.force_mock = true;
    }
    config.validate()?;

    let monitor = Arc::new(ProcessMonitor::new(config.monitoring.enabled));
    let stages = StageService::new(Arc::new(config), Arc::new(ProcessRunner::new(monitor)));

    tracing::info!("▶️ Running {:?} stage", args.stage);

    let result = match args.stage {
        StageArg::Preprocess => serde_json::to_value(stages.preprocess().await?),
        StageArg::Train => serde_json::to_value(stages.train().await?),
        StageArg::Predict => {
            let request: PredictionRequest = serde_json::from_str(&args.params)?;
            serde_json::to_value(stages.predict(&request).await?)
        }
        StageArg::Route => {
            let request: RouteRequest = serde_json::from_str(&args.params)?;
            serde_json::to_value(stages.route(&request).await?)
        }
    };

    println!("{}", serde_json::to_string_pretty(&result?)?);
    Ok(())
}
