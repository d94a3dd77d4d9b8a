use anyhow::Result;
use clap::Parser;
use portfolio_backend::admin_cli::{handle_admin_command, AdminCli};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .without_time()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    handle_admin_command(AdminCli::parse()).await
}
