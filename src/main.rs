#![allow(non_snake_case)]

mod cli;

use anyhow::Context;
use threadRunner::config::AppConfig;
use threadRunner::logging::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Unable to load configuration")?;
    init_tracing(config.log_level()?);
    cli::cli(config).await
}
