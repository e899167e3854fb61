use clap::Parser;
use provider_dashboard::app;
use provider_dashboard::config::{ServerConfig, init_logging};

/// Main entry point for the dashboard web server
///
/// Reads the server settings from the command line and `DASHBOARD_*`
/// environment variables, sets up logging and serves until interrupted.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::parse();
    init_logging(&config.log_level);

    app::run(config).await
}
