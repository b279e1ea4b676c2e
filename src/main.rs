use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use snared::bootstrap::Server;
use snared::config::Config;
use snared::telemetry::init_tracing;

#[derive(Parser, Debug)]
#[command(name = "snared")]
#[command(author, version, about = "Honeypot connection logger with abuse reporting")]
struct Args {
    /// Path to config file
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,

    /// Validate config and exit
    #[arg(long)]
    validate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration first (to get log settings)
    let config = Config::load(&args.config)?;

    init_tracing(&config.telemetry)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %args.config.display(),
        "starting snared"
    );

    info!(
        ports = ?config.listener.ports,
        webhook = config.discord.endpoint().is_some(),
        server = %config.server.name,
        "configuration loaded"
    );

    // Validate only mode
    if args.validate {
        info!("configuration is valid");
        return Ok(());
    }

    // Create and run server
    let server = Server::new(config);
    server.run().await?;

    Ok(())
}
