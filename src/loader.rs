//! Configuration loading
//!
//! Layers, lowest priority first: embedded defaults, `config/local`, the
//! file given on the command line, then `KEEN_` environment variables.

use crate::config::AppConfig;
use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use std::path::Path;

/// Embedded default configuration (compiled into binary)
pub const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

/// Load configuration from files and environment
pub fn load_config(extra: Option<&Path>) -> Result<AppConfig> {
    build(extra, environment())
}

// prefix_separator("_") makes KEEN_EXEC__X work; config-rs 0.14 would
// otherwise expect KEEN__EXEC__X.
fn environment() -> Environment {
    Environment::with_prefix("KEEN")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

fn build(extra: Option<&Path>, env: Environment) -> Result<AppConfig> {
    let mut builder = Config::builder()
        .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
        .add_source(File::with_name("config/local").required(false));

    if let Some(path) = extra {
        builder = builder.add_source(File::from(path).required(true));
    }

    builder
        .add_source(env)
        .build()
        .context("Failed to build configuration")?
        .try_deserialize()
        .context("Failed to deserialize configuration")
}
