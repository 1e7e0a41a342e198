use anyhow::Result;
use clap::Parser;

use xdpwall_daemon::cli::DaemonCli;
use xdpwall_daemon::{logging, server};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    let config = cli.load_config().await?;

    if cli.validate {
        println!("configuration is valid: {}", cli.config.display());
        return Ok(());
    }

    logging::init_tracing(&config.general)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "xdpwall-daemon starting");

    server::run(config).await
}
