//! Shopfront - HTTP cart service.
//!
//! Usage:
//! - `shopfront` - Serve with defaults on 0.0.0.0:8080
//! - `shopfront --config shopfront.toml` - Serve with a config file
//! - `shopfront --bind 127.0.0.1:9000 --log-format human` - Override settings

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use shop_observability::{init_logging, LogFormat};
use shop_server::config::CONFIG_ENV;
use shop_server::{router, AppState, ServiceConfig};

/// Shopfront - HTTP cart service
#[derive(Parser)]
#[command(name = "shopfront")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file path (TOML, or JSON by extension)
    #[arg(short, long, env = CONFIG_ENV)]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Log output format (json or human)
    #[arg(long)]
    log_format: Option<LogFormat>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ServiceConfig::load_or_default(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }

    init_logging(&config.logging)?;

    let state = AppState::from_config(&config).await?;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;
    tracing::info!(addr = %config.server.bind, "shopfront listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("shopfront stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
    }
}
