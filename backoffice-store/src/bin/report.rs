//! Back office report binary
//!
//! Opens the configured store and prints dashboard stats, stock levels and
//! the price-list quote as one JSON object on stdout.

use anyhow::Context;
use backoffice_store::{BackOffice, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match std::env::var("BACKOFFICE_CONFIG") {
        Ok(path) => Config::from_file(&path)
            .with_context(|| format!("Failed to load config from {}", path))?,
        Err(_) => Config::from_env().context("Failed to load config from environment")?,
    };

    tracing::info!(data_dir = ?config.data_dir, "Generating back office report");

    let office = BackOffice::open(config).context("Failed to open document store")?;

    let dashboard = office.dashboard().await?;
    let stock = office.stock_levels().await?;
    let quote = office.quote().await?;

    let report = serde_json::json!({
        "dashboard": dashboard,
        "stock": stock,
        "quote": quote,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    office.shutdown().await?;
    Ok(())
}
