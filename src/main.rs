//! ipintel server binary.

use anyhow::{Context, Result};
use clap::Parser;

use ipintel::config::{Config, LogFormat, LogLevel};
use ipintel::initialization::init_logger_with;
use ipintel::run_server;

#[derive(Debug, Parser)]
#[command(
    name = "ipintel",
    version,
    about = "IP reputation aggregation service"
)]
struct Cli {
    /// Port to serve the API on
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Log level
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Log format
    #[arg(long, value_enum, default_value_t = LogFormat::Plain)]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logger_with(cli.log_level.clone().into(), cli.log_format.clone())
        .context("Failed to initialize logger")?;

    let config = Config::from_env();
    log::info!(
        "starting ipintel v{} ({:?})",
        env!("CARGO_PKG_VERSION"),
        config.environment
    );

    run_server(config, cli.port).await
}
