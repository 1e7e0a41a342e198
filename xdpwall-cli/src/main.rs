use clap::Parser;
use colored::Colorize;

use xdpwall_cli::cli::{Cli, Commands};
use xdpwall_cli::client::ApiClient;
use xdpwall_cli::commands;
use xdpwall_cli::error::CliError;
use xdpwall_cli::output::OutputWriter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // 진단 로그는 stderr로 (stdout은 명령 출력 전용)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&cli.log_level))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", "error:".red().bold(), e);
        if !e.completed().is_empty() {
            eprintln!("completed before failure: {}", e.completed().join(", "));
        }
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let client = ApiClient::new(&cli.server)?;
    let writer = OutputWriter::new(cli.output);
    tracing::debug!(server = %client.base(), "xdpwall-cli starting");

    match cli.command {
        Commands::Load(args) => commands::load::execute_load(args, &client, &writer).await,
        Commands::Unload(args) => commands::load::execute_unload(args, &client, &writer).await,
        Commands::Block(args) => commands::block::execute_block(args, &client, &writer).await,
        Commands::Allow(args) => commands::block::execute_allow(args, &client, &writer).await,
        Commands::Status => commands::status::execute(&client, &writer).await,
        Commands::FlushBlocked => commands::flush::execute_flush_blocked(&client, &writer).await,
        Commands::FlushStats => commands::flush::execute_flush_stats(&client, &writer).await,
    }
}
