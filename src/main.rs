use clap::Parser;
use demand_route::utils::{logger, validation::Validate};
use demand_route::{build_router, AppState, CliConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let config = match cli.load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load configuration: {}", e);
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    // 初始化日誌
    logger::init_logger(cli.verbose, config.log_format());

    tracing::info!("🚀 Starting demand-route dashboard backend");
    if cli.verbose {
        tracing::debug!("Effective config: {:?}", config);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    if config.is_mock_only() {
        tracing::info!("🧪 No stage scripts configured, serving mock data");
    } else {
        tracing::info!("🐍 Stage scripts run with '{}'", config.scripts.interpreter);
    }
    if config.monitoring.enabled {
        tracing::info!("🔍 Process monitoring enabled");
    }

    let addr = config.bind_address();
    let app = build_router(AppState::with_process_runner(config));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("🌐 Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("👋 Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
