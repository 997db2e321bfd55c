//! # FeatureGate Gateway Server
//!
//! Main HTTP server for the multi-tenant materialization gateway.
//!
//! ## Startup Flow
//!
//! 1. Parse command-line arguments
//! 2. Initialize tracing/logging
//! 3. Load configuration and build server state (backend, engine, catalog)
//! 4. Start the HTTP server with graceful shutdown
//!
//! ## Usage
//!
//! ```bash
//! # Start the gateway with defaults
//! featuregate serve
//!
//! # Specify configuration file and port
//! featuregate serve --config featuregate.yaml --port 8081
//!
//! # Validate a configuration file without starting
//! featuregate check-config --config featuregate.yaml
//! ```

use axum::extract::DefaultBodyLimit;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use featuregate_server::{app, config, shutdown, state::AppState};

/// FeatureGate command-line interface
#[derive(Parser)]
#[command(name = "featuregate")]
#[command(about = "Multi-tenant feature store materialization gateway", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server
    Serve {
        /// Configuration file path
        #[arg(short, long, default_value = "featuregate.yaml")]
        config: String,

        /// Host to bind to (overrides the config file)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides the config file)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Validate a configuration file without starting the server
    CheckConfig {
        /// Configuration file path
        #[arg(short, long, default_value = "featuregate.yaml")]
        config: String,
    },
}

/// Main entry point
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logging setup:
    // - RUST_LOG controls the level (e.g. "info", "featuregate=debug")
    // - LOG_FORMAT selects "json" (production) or "pretty" (development)
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if log_format == "json" {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(true),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().pretty().with_target(false))
            .init();
    }

    let cli = Cli::parse();
    match cli.command {
        Commands::Serve { config, host, port } => {
            serve(config, host, port).await?;
        }
        Commands::CheckConfig { config } => {
            let loaded = config::load(&config)?;
            println!(
                "configuration ok: bind {}:{}, online store configured, {} feature service(s)",
                loaded.server.host,
                loaded.server.port,
                loaded.feature_services.len()
            );
        }
    }

    Ok(())
}

/// Start the HTTP server
async fn serve(config_path: String, host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    info!("starting FeatureGate gateway");
    let config = config::load(&config_path)?;

    // Missing or unusable global configuration aborts startup here.
    let state = AppState::from_config(&config)
        .map_err(|e| anyhow::anyhow!("gateway state initialization failed: {e}"))?;

    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    // Request body size limit (default: 10MB)
    let max_body_size: usize = std::env::var("FEATUREGATE_MAX_BODY_SIZE")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(10 * 1024 * 1024);

    // Request timeout (default: 60 seconds)
    let request_timeout_secs: u64 = std::env::var("FEATUREGATE_REQUEST_TIMEOUT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(60);

    let router = app(state)
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(request_timeout_secs)));

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid host/port: {e}"))?;

    info!("gateway listening on http://{}", addr);
    info!("liveness check: http://{}/ping", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown::shutdown_signal())
        .await?;

    info!("gateway shut down gracefully");
    Ok(())
}
