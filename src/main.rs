//! Resilience lab server.
//!
//! ```text
//!     Client ──▶ /api/profile, /api/search ──┬── baseline ───────────────────────────▶ ┐
//!                                            │                                        │
//!                                            └── hardened ─▶ bulkhead ─▶ breaker ─▶    │
//!                                                             time limiter ──────────▶ ├─▶ simulated
//!                                                                                     │   downstream
//!     Operator ─▶ /api/admin/status, /api/admin/reset, /api/info                      ┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use resilience_lab::config::{load_config, LabConfig};
use resilience_lab::http::HttpServer;
use resilience_lab::lifecycle::{shutdown_on_signal, Shutdown};
use resilience_lab::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "resilience-lab")]
#[command(about = "Baseline vs hardened downstream calls", long_about = None)]
struct Args {
    /// TOML config file. Built-in defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => LabConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "resilience-lab starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        failure_rate_threshold = config.circuit_breaker.failure_rate_threshold,
        sliding_window_size = config.circuit_breaker.sliding_window_size,
        max_concurrent_calls = config.bulkhead.max_concurrent_calls,
        timeout_ms = config.time_limiter.timeout_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let server = HttpServer::new(config);

    tokio::spawn(async move {
        shutdown_on_signal(&shutdown).await;
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
