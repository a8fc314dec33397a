use std::sync::Arc;

use tracing::info;

use app::config::{ArgsError, ServerConfig, prepare_sqlite_file, print_usage};
use app::{AppState, build_router};
use services::{AppServices, Clock, HttpScorer, ScorerConfig};

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = match ServerConfig::from_env_and_args() {
        Ok(config) => config,
        Err(ArgsError::HelpRequested) => {
            print_usage();
            return Ok(());
        }
        Err(err) => {
            eprintln!("{err}");
            print_usage();
            return Err(err.into());
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting learnpath v{}", env!("CARGO_PKG_VERSION"));
    info!(db = %config.db_url, scorer = %config.scorer_url, "configuration loaded");

    prepare_sqlite_file(&config.db_url)?;
    let scorer = Arc::new(HttpScorer::new(ScorerConfig {
        url: config.scorer_url.clone(),
        timeout: config.scorer_timeout,
    }));
    let services =
        AppServices::new_sqlite(&config.db_url, Clock::system(), scorer, config.scorer_timeout)
            .await?;

    let app = build_router(AppState::new(services));
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!("learnpath listening on http://{}", config.bind);
    info!("Health check: http://{}/health", config.bind);

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
