//! Traffic gateway binary.
//!
//! ```text
//!                       ┌──────────────────────────────────────────────────────┐
//!   Client Request      │                    GATEWAY                            │
//!   ────────────────────┼─▶ http server ─▶ routing ─▶ filter chain             │
//!                       │                              │                        │
//!                       │                              ├─ rate limiter  ─▶ 429  │
//!                       │                              ├─ circuit breaker ─▶ 503│
//!                       │                              ├─ round robin           │
//!   Client Response     │                              ▼                        │
//!   ◀───────────────────┼──────────────────────── forwarder ◀──────────────────┼── Instance
//!                       │                                                       │
//!                       │  config (+ watcher)   observability   admin API       │
//!                       └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use traffic_gateway::admin::setup_admin_router;
use traffic_gateway::config::{load_config, watcher::ConfigWatcher, GatewayConfig};
use traffic_gateway::http::HttpServer;
use traffic_gateway::lifecycle::Shutdown;
use traffic_gateway::observability::{logging::init_logging, metrics::init_metrics};

#[derive(Parser)]
#[command(name = "traffic-gateway", version, about = "Rate-limited, circuit-broken gateway")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "config/gateway.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config_exists = args.config.exists();
    let config = if config_exists {
        load_config(&args.config)?
    } else {
        GatewayConfig::default()
    };

    init_logging(&config.observability);
    tracing::info!("traffic-gateway v{} starting", env!("CARGO_PKG_VERSION"));

    if !config_exists {
        tracing::warn!(path = ?args.config, "Config file not found, using defaults");
    }
    tracing::info!(
        bind_address = %config.listener.bind_address,
        services = config.services.len(),
        routes = config.routes.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // The watcher handle must outlive the server.
    let (watcher, instance_updates) = ConfigWatcher::new(&args.config, &config);
    let _watch_handle = if config_exists {
        match watcher.run() {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::error!(error = %e, "Failed to start config watcher, hot reload disabled");
                None
            }
        }
    } else {
        None
    };

    let shutdown = Shutdown::new();
    let server = HttpServer::new(&config)?;

    if config.admin.enabled {
        let listener = TcpListener::bind(&config.admin.bind_address).await?;
        tracing::info!(address = %listener.local_addr()?, "Admin API listening");

        let app = setup_admin_router(server.state().clone());
        let mut admin_shutdown = shutdown.subscribe();
        tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = admin_shutdown.recv().await;
                })
                .await;
            if let Err(e) = served {
                tracing::error!(error = %e, "Admin API failed");
            }
        });
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server_task = tokio::spawn(server.run(listener, instance_updates, shutdown.subscribe()));

    shutdown.trigger_on_ctrl_c().await;
    server_task.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
