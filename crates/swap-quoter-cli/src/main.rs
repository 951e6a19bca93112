mod cli;

use anyhow::Result;
use clap::Parser;
use swap_quoter::config::AppConfig;
use swap_quoter::SwapEngine;
use tracing_subscriber::EnvFilter;

use cli::{Cli, CliHandler};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so command output stays pipeable.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load_with_cli(&cli.config)?;
    let engine = SwapEngine::from_config(&config)?;

    CliHandler::new(&engine).run(cli.command).await
}
