//! Application configuration types

use keen_exec::ExecConfig;
use serde::{Deserialize, Serialize};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Process subsystem settings
    #[serde(default)]
    pub exec: ExecConfig,
}
