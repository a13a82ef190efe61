//! basin-watch CLI entry point.

use anyhow::Result;
use clap::Parser;

use basin_watch::cli::commands::{self, AppContext};
use basin_watch::cli::{Cli, Commands};
use basin_watch::infrastructure::logging::{LogConfig, LoggerImpl};
use basin_watch::ConfigLoader;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json = cli.json;

    if let Err(err) = run(cli).await {
        basin_watch::cli::handle_error(err, json);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match cli.config {
        Some(ref path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };
    let _logger = LoggerImpl::init(&LogConfig::from(&config.logging))?;

    let ctx = AppContext::open(config).await?;
    match cli.command {
        Commands::Ingest(args) => commands::ingest::execute(args, ctx, cli.json).await,
        Commands::Inspect(args) => commands::inspect::execute(args, ctx, cli.json).await,
        Commands::Events(args) => commands::events::execute(args, ctx, cli.json).await,
    }
}
