//! mcpgate-server entry point

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use mcpgate_server::{ServerConfig, build_router};
use tracing::{info, warn};

/// Weather tool server with multi-method bearer authentication
#[derive(Parser, Debug)]
#[command(name = "mcpgate-server", version, about, long_about = None)]
struct Cli {
    /// Configuration file (TOML, YAML, or JSON)
    #[arg(short, long, env = "MCPGATE_CONFIG", default_value = "mcpgate.toml")]
    config: PathBuf,

    /// Listen address, overriding the configuration file
    #[arg(short, long)]
    bind: Option<String>,

    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = ServerConfig::from_file(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(bind) = cli.bind {
        config.bind = bind;
    }

    config
        .logging
        .init(cli.verbose)
        .context("initializing logging")?;

    let app = build_router(&config).context("building credential verifier")?;

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("binding {}", config.bind))?;

    info!(
        bind = %config.bind,
        resource = %config.resource_url,
        strategies = config.auth.strategies.len(),
        "MCP server listening"
    );
    for strategy in &config.auth.strategies {
        info!(strategy = %strategy.name(), "Authentication strategy enabled");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Ctrl+C received, initiating shutdown"),
        () = terminate => info!("SIGTERM received, initiating shutdown"),
    }
}
