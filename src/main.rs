//! Process entry point: logging, configuration, then the events listener.

use anyhow::Context;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = bugclerk::config::Config::from_env().context("configuration error")?;

    bugclerk::webhook::run(&config).await
}
