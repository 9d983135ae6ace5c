//! Teacher portal daemon.

use anyhow::Result;
use clap::Parser;

use campus::config::ServiceConfig;
use campus::logging;
use campus::logsink::RemoteLogger;
use campus::portal::{self, PortalState};
use campus_discovery::{bootstrap, DiscoveryClient, Registration, ServiceName};

const DEFAULT_PORT: u16 = 5000;

#[derive(Parser)]
#[command(name = "portald", about = "Campus teacher portal")]
struct Cli {
    /// Path to a config file
    #[arg(long, env = "CAMPUS_PORTAL_CONFIG")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ServiceConfig::load(cli.config.as_deref(), "CAMPUS_PORTAL")?
        .or_port(DEFAULT_PORT);
    logging::init_logging(&config.logging)?;

    let registration = Registration::new(ServiceName::Portal, config.service_url())
        .with_required(vec![ServiceName::LogSink, ServiceName::Grading]);
    let client = DiscoveryClient::new(&config.registry_url);

    let logger = RemoteLogger::new(ServiceName::Portal, client.providers());
    let state = PortalState::new(client.providers(), logger)?;
    let app = portal::create_router(state);

    bootstrap::serve(&client, registration, app).await?;
    Ok(())
}
