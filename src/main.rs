mod auth;
mod cli;
mod config;
mod error;
mod handlers;
mod inventory;
mod logging;
mod migration;
mod output;
mod plan;
mod providers;
mod resilience;
mod script;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::{info, LevelFilter};

fn init_logger(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .format_target(false)
        .filter_level(level)
        .parse_default_env()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose());

    output::print_banner();

    info!("Starting repoferry");
    cli.execute().await?;

    Ok(())
}
