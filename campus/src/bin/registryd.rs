//! Central service registry daemon.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use campus::config::RegistryConfig;
use campus::logging;
use campus_discovery::registry::create_router;
use campus_discovery::{HeartbeatMonitor, ServiceRegistry};

#[derive(Parser)]
#[command(name = "registryd", about = "Campus service registry")]
struct Cli {
    /// Path to a config file
    #[arg(long, env = "CAMPUS_REGISTRY_CONFIG")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = RegistryConfig::load(cli.config.as_deref())?;
    logging::init_logging(&config.logging)?;

    let registry = Arc::new(ServiceRegistry::new());
    let monitor = HeartbeatMonitor::new(registry.clone(), config.heartbeat.clone());
    let sweep = monitor.start();

    let listener = TcpListener::bind(config.bind_addr()).await?;
    info!(addr = %config.bind_addr(), "registry listening");

    axum::serve(listener, create_router(registry))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    info!("shutting down registry");
    monitor.shutdown();
    sweep.await.ok();
    Ok(())
}
