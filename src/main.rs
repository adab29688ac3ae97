//! # gqlws
//!
//! GraphQL-over-WebSocket server binary. Loads settings, starts the
//! `graphql-ws` endpoint backed by the demo execution engine, and shuts down
//! gracefully on Ctrl-C.

#![deny(unsafe_code)]

mod demo;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use gqlws_server::config::ServerConfig;
use gqlws_server::server::GraphQlWsServer;
use gqlws_settings::GqlWsSettings;

/// GraphQL-over-WebSocket (`graphql-ws`) server.
#[derive(Parser, Debug)]
#[command(name = "gqlws", about = "GraphQL-over-WebSocket server")]
struct Cli {
    /// Settings file (defaults to `~/.gqlws/settings.json`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Do not send `ka` after `connection_ack`.
    #[arg(long)]
    no_keep_alive: bool,

    /// Log filter when `RUST_LOG` is unset (overrides settings).
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn apply(&self, settings: &mut GqlWsSettings) {
        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if self.no_keep_alive {
            settings.graphql_ws.keep_alive_enabled = false;
        }
        if let Some(level) = &self.log_level {
            settings.logging.level.clone_from(level);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let settings_path = args
        .config
        .clone()
        .unwrap_or_else(gqlws_settings::settings_path);
    let mut settings = gqlws_settings::load_settings_from_path(&settings_path)
        .with_context(|| format!("Failed to load settings from {}", settings_path.display()))?;
    args.apply(&mut settings);

    gqlws_telemetry::init_subscriber(&settings.logging.level, settings.logging.json);
    let metrics_handle =
        gqlws_telemetry::metrics::install_recorder().context("Failed to install metrics recorder")?;

    let config = ServerConfig::from(&settings);
    let server = GraphQlWsServer::new(config, Arc::new(demo::DemoExecutor), metrics_handle);
    let (addr, handle) = server.listen().await.context("Failed to start server")?;
    server.shutdown().track(handle);

    tracing::info!(%addr, path = %server.config().path, "gqlws server ready");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl+c")?;

    tracing::info!("shutting down");
    server.shutdown().graceful_shutdown(None).await;
    Ok(())
}
