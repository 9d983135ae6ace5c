//! Grade-tracking service daemon.

use anyhow::Result;
use clap::Parser;

use campus::config::ServiceConfig;
use campus::grading::{self, GradingState};
use campus::logging;
use campus::logsink::RemoteLogger;
use campus_discovery::{bootstrap, DiscoveryClient, Registration, ServiceName};

const DEFAULT_PORT: u16 = 6000;

#[derive(Parser)]
#[command(name = "gradingd", about = "Campus grade-tracking service")]
struct Cli {
    /// Path to a config file
    #[arg(long, env = "CAMPUS_GRADING_CONFIG")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ServiceConfig::load(cli.config.as_deref(), "CAMPUS_GRADING")?
        .or_port(DEFAULT_PORT);
    logging::init_logging(&config.logging)?;

    let registration = Registration::new(ServiceName::Grading, config.service_url())
        .with_required(vec![ServiceName::LogSink]);
    let client = DiscoveryClient::new(&config.registry_url);

    let logger = RemoteLogger::new(ServiceName::Grading, client.providers());
    let app = grading::create_router(GradingState::new(logger));

    bootstrap::serve(&client, registration, app).await?;
    Ok(())
}
