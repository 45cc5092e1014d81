//! GLM Quota API - reports remaining GLM Coding Plan quota over HTTP

#![allow(clippy::doc_markdown)]

mod api;
mod cache;
mod config;
mod error;
mod logger;
mod models;
mod quota;
mod server;
mod terminal;
mod window;

#[cfg(test)]
mod test_support;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::cache::ResponseCache;
use crate::quota::QuotaService;

/// GLM Quota API - reports remaining GLM Coding Plan quota as JSON and terminal status lines
#[derive(Debug, Parser)]
struct Cli {
    /// Override listen host (default: from ENV or 0.0.0.0)
    #[arg(long)]
    host: Option<String>,

    /// Override listen port (default: from ENV or 8000)
    #[arg(short, long)]
    port: Option<u16>,

    /// Override cache debounce in minutes (default: from ENV or 1)
    #[arg(short, long)]
    debounce_min: Option<i64>,

    /// Print the color-coded status line once and exit
    #[arg(long, conflicts_with = "json")]
    status: bool,

    /// Print the quota as JSON once and exit
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    logger::init_logger();

    // Load configuration
    let mut config = config::Config::load()
        .context("Failed to load configuration from ~/.config/glm-quota-api/config.toml")?;

    // Apply CLI overrides
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(debounce) = cli.debounce_min {
        config.query_debounce_min = debounce;
    }

    let addr = format!("{}:{}", config.host, config.port);
    let cache = Arc::new(ResponseCache::new());
    let service = QuotaService::new(config, cache).context("Failed to create HTTP client")?;

    if cli.status || cli.json {
        let quota = service
            .get_glm_quota(&CancellationToken::new())
            .await
            .context("Failed to fetch GLM quota")?;

        if cli.json {
            println!("{}", serde_json::to_string_pretty(&quota)?);
        } else {
            println!("{}", terminal::format_status_line(&quota, chrono::Utc::now()));
        }
        return Ok(());
    }

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind address {}", addr))?;

    let state = server::AppState {
        service: Arc::new(service),
    };
    server::serve(listener, state, shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
