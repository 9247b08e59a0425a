use anyhow::{Context, Result};
use clap::Parser;
use directories::ProjectDirs;
use std::fs;
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Parser, Debug, Clone)]
#[command(name = "greengrid")]
#[command(about = "Terminal dashboard for renewable-energy microgrid forecasts")]
pub(crate) struct Cli {
    /// Prediction service base URL
    #[arg(long, default_value = "http://127.0.0.1:5000")]
    pub(crate) base_url: String,

    /// Background refresh interval (seconds)
    #[arg(long, default_value_t = 30)]
    pub(crate) refresh_secs: u64,

    /// Force monochrome (no colors)
    #[arg(long, default_value_t = false)]
    pub(crate) mono: bool,
}

/// Diagnostics go to a file under the platform data directory; stdout
/// belongs to the TUI.
pub(crate) fn init_logging() -> Result<WorkerGuard> {
    let proj = ProjectDirs::from("com", "greengrid", "GreenGrid")
        .context("could not resolve project directories")?;
    let dir = proj.data_local_dir().join("logs");
    fs::create_dir_all(&dir).ok();

    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(dir, "greengrid.log"));

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Ok(guard)
}
