// External crates
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

// Local modules
use claw_foxy_forecast::api::{router, AppState};
use claw_foxy_forecast::config::{DataSourceKind, ServiceConfig};
use claw_foxy_forecast::data::{CsvHistorySource, HistorySource, YahooHistorySource};

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServiceConfig::parse();
    config.validate().map_err(|e| anyhow!(e))?;

    let source: Arc<dyn HistorySource> = match config.data_source {
        DataSourceKind::Yahoo => Arc::new(YahooHistorySource::new()?),
        DataSourceKind::Csv => Arc::new(CsvHistorySource::new(&config.csv_dir)),
    };
    info!(
        "Using {} history source, models written to {}",
        source.name(),
        config.output_dir.display()
    );

    let state = AppState::new(source, config.pipeline_settings(), config.history_start);
    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!("Stock prediction API listening on http://{}", address);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;
    Ok(())
}
