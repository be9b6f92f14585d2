mod auth;
mod cli;
mod client;
mod delta;
mod error;
mod export;
mod loader;
mod models;
mod selection;
mod views;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    info!("Starting opsboard - DevOps Metrics Dashboard");
    cli.execute().await?;

    Ok(())
}
