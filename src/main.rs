mod api;
mod app;
mod config;
mod input;
mod model;
mod poll;
mod render;
mod report;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = config::Cli::parse();
    let _guard = config::init_logging()?;
    app::run(cli).await
}
