//! Process subsystem configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default wait for `start` before reporting a process as still running.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
/// Completed sessions retained before the oldest is evicted.
pub const DEFAULT_COMPLETED_CAPACITY: usize = 100;
/// Grace window between the interrupt and the forced kill.
pub const DEFAULT_KILL_GRACE_MS: u64 = 1_000;
/// How long the supervisor waits for output readers after exit.
pub const DEFAULT_READER_DRAIN_MS: u64 = 250;
/// Longest a stdin write may take before the input is closed.
pub const DEFAULT_INPUT_TIMEOUT_MS: u64 = 1_000;
/// Marker that authorizes a destructive command.
pub const DEFAULT_OVERRIDE_TOKEN: &str = "--i-have-explicit-permission-from-user";

/// Configuration for the process subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecConfig {
    /// Shell used when a request does not name one (`sh` / `cmd` when unset).
    #[serde(default)]
    pub default_shell: Option<String>,
    /// Initial wait applied when a request carries no timeout.
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,
    /// Capacity of the completed-session store.
    #[serde(default = "default_completed_capacity")]
    pub completed_capacity: usize,
    /// Milliseconds between interrupt and forced kill.
    #[serde(default = "default_kill_grace_ms")]
    pub kill_grace_ms: u64,
    /// Milliseconds to wait for output readers once the process exited.
    #[serde(default = "default_reader_drain_ms")]
    pub reader_drain_ms: u64,
    /// Milliseconds a stdin write may block on a full pipe.
    #[serde(default = "default_input_timeout_ms")]
    pub input_timeout_ms: u64,
    /// Token that unlocks destructive commands.
    #[serde(default = "default_override_token")]
    pub override_token: String,
    /// Additional base commands that are always blocked.
    #[serde(default)]
    pub blocked_commands: Vec<String>,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}
fn default_completed_capacity() -> usize {
    DEFAULT_COMPLETED_CAPACITY
}
fn default_kill_grace_ms() -> u64 {
    DEFAULT_KILL_GRACE_MS
}
fn default_reader_drain_ms() -> u64 {
    DEFAULT_READER_DRAIN_MS
}
fn default_input_timeout_ms() -> u64 {
    DEFAULT_INPUT_TIMEOUT_MS
}
fn default_override_token() -> String {
    DEFAULT_OVERRIDE_TOKEN.to_string()
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            default_shell: None,
            default_timeout_ms: default_timeout_ms(),
            completed_capacity: default_completed_capacity(),
            kill_grace_ms: default_kill_grace_ms(),
            reader_drain_ms: default_reader_drain_ms(),
            input_timeout_ms: default_input_timeout_ms(),
            override_token: default_override_token(),
            blocked_commands: Vec::new(),
        }
    }
}

impl ExecConfig {
    /// Grace window as a [`Duration`].
    #[must_use]
    pub fn kill_grace(&self) -> Duration {
        Duration::from_millis(self.kill_grace_ms)
    }

    /// Reader drain window as a [`Duration`].
    #[must_use]
    pub fn reader_drain(&self) -> Duration {
        Duration::from_millis(self.reader_drain_ms)
    }

    /// Stdin write limit as a [`Duration`].
    #[must_use]
    pub fn input_timeout(&self) -> Duration {
        Duration::from_millis(self.input_timeout_ms)
    }

    /// Default initial wait as a [`Duration`].
    #[must_use]
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    /// Set the completed-session capacity
    #[must_use]
    pub fn with_completed_capacity(mut self, capacity: usize) -> Self {
        self.completed_capacity = capacity;
        self
    }

    /// Set the kill grace window
    #[must_use]
    pub fn with_kill_grace(mut self, grace: Duration) -> Self {
        self.kill_grace_ms = u64::try_from(grace.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the stdin write limit
    #[must_use]
    pub fn with_input_timeout(mut self, limit: Duration) -> Self {
        self.input_timeout_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the default shell
    #[must_use]
    pub fn with_default_shell(mut self, shell: impl Into<String>) -> Self {
        self.default_shell = Some(shell.into());
        self
    }

    /// Add a base command to the unconditional block list
    #[must_use]
    pub fn with_blocked_command(mut self, command: impl Into<String>) -> Self {
        self.blocked_commands.push(command.into());
        self
    }
}
