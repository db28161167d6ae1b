//! Command-line arguments

use clap::Parser;
use std::path::PathBuf;

/// Keen process console
#[derive(Parser, Debug)]
#[command(name = "keen")]
#[command(about = "Gated process execution over JSON lines")]
#[command(version)]
pub struct Cli {
    /// Extra configuration file, layered over the defaults
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Handle a single JSON request and exit
    #[arg(long, value_name = "JSON")]
    pub once: Option<String>,
}
