//! SSO Gateway
//!
//! Prefix-routed reverse proxy that authenticates callers and authorizes
//! every request against hierarchical role-based rules.
//!
//! # Architecture Overview
//!
//! ```text
//!                          ┌───────────────────────────────────────────────────┐
//!                          │                    SSO GATEWAY                     │
//!                          │                                                    │
//!     Client Request       │  ┌─────────┐    ┌──────────┐    ┌──────────────┐  │
//!     ─────────────────────┼─▶│  http   │───▶│   auth   │───▶│   gateway    │  │
//!                          │  │ server  │    │  (JWT)   │    │  dispatcher  │  │
//!                          │  └────┬────┘    └──────────┘    └──────┬───────┘  │
//!                          │       │                                │          │
//!                          │       ▼                                ▼          │
//!                          │  ┌─────────┐   ┌──────────┐     ┌──────────────┐  │
//!                          │  │  admin  │──▶│ registry │◀────│     rbac     │  │
//!                          │  │   API   │──▶│ + rbac   │     │    engine    │  │
//!                          │  └─────────┘   └──────────┘     └──────┬───────┘  │
//!                          │                                        │          │
//!     Client Response      │                                 ┌──────▼───────┐  │
//!     ◀────────────────────┼─────────────────────────────────│  forwarder   │◀─┼──── Backend
//!                          │                                 └──────────────┘  │
//!                          │  ┌──────────────────────────────────────────────┐ │
//!                          │  │ config │ observability │ lifecycle │ net/tls │ │
//!                          │  └──────────────────────────────────────────────┘ │
//!                          └───────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use sso_gateway::config::{load_config, schema::DEFAULT_JWT_SECRET, GatewayConfig};
use sso_gateway::lifecycle::signals::spawn_signal_handler;
use sso_gateway::observability::{logging, metrics};
use sso_gateway::{net, HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "sso-gateway", version, about = "SSO gateway with role-based access control")]
struct Cli {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    logging::init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "sso-gateway starting");

    if config.auth.jwt_secret == DEFAULT_JWT_SECRET {
        tracing::warn!("Using the default JWT secret; set auth.jwt_secret before exposing the gateway");
    }

    tracing::info!(
        config_file = ?cli.config,
        bind_address = %config.listener.bind_address,
        mount_path = %config.gateway.mount_path,
        max_connections = config.listener.max_connections,
        request_timeout_secs = config.timeouts.request_secs,
        forward_timeout_secs = config.timeouts.forward_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let server = HttpServer::new(config.clone()).await?;

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    match &config.listener.tls {
        Some(tls) => {
            let rustls = net::load_tls_config(tls).await?;
            let addr: SocketAddr = config.listener.bind_address.parse()?;
            server.run_tls(addr, rustls, shutdown.subscribe()).await?;
        }
        None => {
            let listener = TcpListener::bind(&config.listener.bind_address).await?;
            tracing::info!(address = %listener.local_addr()?, "Listening for connections");
            server.run(listener, shutdown.subscribe()).await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
