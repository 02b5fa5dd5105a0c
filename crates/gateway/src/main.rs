//! `mcphub` — the MCP hub binary: loads config, brings up the hub facade,
//! and serves the protocol front-end.

mod auth;
mod config_load;
mod cors;
mod http_mcp;
mod mcp;
mod router;
mod sse;
mod state;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use mcphub_core::HubFacade;

use crate::router::{build_router, shutdown_signal, GRACEFUL_SHUTDOWN_TIMEOUT};
use crate::state::HubState;

#[derive(Parser, Debug)]
#[command(name = "mcphub", version, about = "MCP tool aggregation hub")]
struct Cli {
    /// Directory containing mcp_server.json, group.json, api_tool.json, and hub.toml.
    #[arg(short, long, default_value = "./config")]
    config_dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = config_load::load_hub_config(&cli.config_dir).context("loading hub configuration")?;
    init_tracing(&config.runtime.log_level, config.runtime.log_file.as_deref())?;

    tracing::info!(config_dir = %cli.config_dir.display(), "starting mcphub");

    let facade = HubFacade::init(&config).await.context("initializing hub facade")?;

    let addr = format!("{}:{}", config.listen.host, config.listen.port);
    let state = HubState::new(facade.clone(), config.listen.clone());
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding listener on {addr}"))?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving http")?;

    tracing::info!(timeout_secs = GRACEFUL_SHUTDOWN_TIMEOUT.as_secs(), "shutting down hub facade");
    tokio::time::timeout(GRACEFUL_SHUTDOWN_TIMEOUT, facade.shutdown())
        .await
        .unwrap_or_else(|_| tracing::warn!("hub facade shutdown exceeded its bound, proceeding anyway"));

    Ok(())
}

fn init_tracing(log_level: &str, log_file: Option<&str>) -> anyhow::Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    if let Some(path) = log_file {
        let file = std::fs::OpenOptions::new().create(true).append(true).open(path).with_context(|| format!("opening log file {path}"))?;
        fmt().with_env_filter(filter).with_writer(file).with_ansi(false).init();
    } else {
        fmt().with_env_filter(filter).init();
    }

    Ok(())
}
