//! Keen - gated process execution console
//!
//! Reads `process` tool requests as JSON lines on stdin and answers each
//! with one JSON line on stdout. Logs go to stderr.

#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use clap::Parser;
use keen_exec::{ProcessTool, SessionRegistry};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod config;
mod console;
mod loader;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keen=info,keen_exec=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = cli::Cli::parse();
    let config = loader::load_config(cli.config.as_deref())?;

    let registry =
        SessionRegistry::new(config.exec).context("Invalid exec configuration")?;
    let tool = ProcessTool::new(registry);

    match cli.once {
        Some(request) => console::run_once(&tool, &request).await,
        None => {
            info!("Starting Keen v{}", env!("CARGO_PKG_VERSION"));
            console::run(&tool).await
        }
    }
}
