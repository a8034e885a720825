// ABOUTME: Entry point for the pathwise binary.
// ABOUTME: Parses CLI arguments, loads configuration, initializes tracing, and starts the HTTP server.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use pathwise_server::{AppState, PathwiseConfig, create_router};

/// PathWise learning path tracker backend.
#[derive(Debug, Parser)]
#[command(name = "pathwise", version, about)]
struct Args {
    /// Socket address to listen on (overrides PATHWISE_BIND).
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Data directory for local storage (overrides PATHWISE_HOME).
    #[arg(long)]
    home: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv()
        && !e.not_found()
    {
        eprintln!("failed to read .env: {}", e);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pathwise=debug,tower_http=debug".into()),
        )
        .init();

    let args = Args::parse();
    let mut config = PathwiseConfig::from_env().context("invalid configuration")?;
    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    if let Some(home) = args.home {
        config.home = home;
    }

    tracing::info!("pathwise starting up, data in {}", config.home.display());

    let state = AppState::from_config(&config).context("failed to open local storage")?;
    let app = create_router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    tracing::info!("listening on {}", config.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("pathwise shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for shutdown signal: {}", e);
    }
}
