//! Remote log sink daemon.

use anyhow::Result;
use clap::Parser;

use campus::config::ServiceConfig;
use campus::{logging, logsink};
use campus_discovery::{bootstrap, DiscoveryClient, Registration, ServiceName};

const DEFAULT_PORT: u16 = 4000;

#[derive(Parser)]
#[command(name = "logsinkd", about = "Campus remote log sink")]
struct Cli {
    /// Path to a config file
    #[arg(long, env = "CAMPUS_LOGSINK_CONFIG")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ServiceConfig::load(cli.config.as_deref(), "CAMPUS_LOGSINK")?
        .or_port(DEFAULT_PORT);
    logging::init_logging(&config.logging)?;

    let registration = Registration::new(ServiceName::LogSink, config.service_url());
    let sink = logsink::LogSink::open(&config.log_file).await?;
    let client = DiscoveryClient::new(&config.registry_url);

    bootstrap::serve(&client, registration, logsink::create_router(sink)).await?;
    Ok(())
}
