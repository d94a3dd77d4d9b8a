use anyhow::{Context, Result};
use portfolio_backend::{start_web_server, EnvironmentConfig};
use std::fs::OpenOptions;
use tracing::info;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_PORT: u16 = 8000;

#[tokio::main]
async fn main() -> Result<()> {
    let config = EnvironmentConfig::load()?;
    config.ensure_directories().await?;

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true) // Clear file on startup
        .open(&config.log_file)
        .with_context(|| format!("Failed to open log file {}", config.log_file.display()))?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("portfolio_backend=info,rocket::server=off"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(
            fmt::layer()
                .json()
                .with_writer(file)
                .with_current_span(false)
                .with_span_list(false),
        )
        .with(filter)
        .init();

    let port = match std::env::var("ROCKET_PORT") {
        Ok(value) => value
            .parse::<u16>()
            .map_err(|_| anyhow::anyhow!("ROCKET_PORT must be a valid port number"))?,
        Err(_) => DEFAULT_PORT,
    };

    info!("Starting portfolio backend");
    info!(
        "Environment: {}",
        std::env::var("PORTFOLIO_ENV")
            .or_else(|_| std::env::var("ENVIRONMENT"))
            .unwrap_or_else(|_| "local".to_string())
    );
    info!("Log file: {}", config.log_file.display());
    info!("Server: http://0.0.0.0:{}", port);

    start_web_server(config, port).await
}
