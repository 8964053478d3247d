mod auth;
mod cli;
mod config;
mod error;
mod models;
mod presentation;
mod providers;
mod report;
mod sink;
mod trends;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use env_logger::Env;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().filter_or("LOG_LEVEL", "info")).init();

    let cli = Cli::parse();
    info!("Starting prowreport");
    cli.execute().await?;

    Ok(())
}
