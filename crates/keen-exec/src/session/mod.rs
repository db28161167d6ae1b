//! Session management
//!
//! A session is one spawned process, tracked through
//!
//! ```text
//! spawned → running | blocked-on-timeout → completed
//! ```
//!
//! Live sessions and completed records sit in two stores behind a single
//! lock in [`SessionRegistry`]; a pid is never present in both.

mod completed;
mod handle;
mod output;
mod registry;
mod signal;


pub use completed::CompletedSession;
pub use handle::ProcessHandle;
pub use output::OutputAggregator;
pub use registry::SessionRegistry;

use crate::gate::Verdict;
use serde::Serialize;

/// Process identifier reported when nothing was spawned.
pub const SENTINEL_PID: i64 = -1;

/// Result of [`SessionRegistry::start`].
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StartOutcome {
    /// The process was spawned.
    Started(StartedProcess),
    /// The gate refused the command; nothing was spawned.
    Rejected {
        /// Gate verdict (never `Allowed`)
        verdict: Verdict,
    },
    /// The OS could not spawn the process.
    SpawnFailed {
        /// Failure description
        message: String,
    },
}

impl StartOutcome {
    /// Process identifier, or [`SENTINEL_PID`] when nothing started.
    #[must_use]
    pub fn pid(&self) -> i64 {
        match self {
            Self::Started(started) => i64::from(started.pid),
            Self::Rejected { .. } | Self::SpawnFailed { .. } => SENTINEL_PID,
        }
    }

    /// The started process, if any
    #[must_use]
    pub fn started(&self) -> Option<&StartedProcess> {
        match self {
            Self::Started(started) => Some(started),
            _ => None,
        }
    }
}

/// A process that made it past the gate and the spawn.
#[derive(Debug, Clone, Serialize)]
pub struct StartedProcess {
    /// OS process identifier
    pub pid: u32,
    /// All output produced during the initial wait
    pub initial_output: String,
    /// `true` when the initial wait timed out
    pub still_running: bool,
    /// Exit code when the process finished during the initial wait
    pub exit_code: Option<i32>,
}

/// Point-in-time view of a live session.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveSession {
    /// OS process identifier
    pub pid: u32,
    /// Whether the initial wait timed out
    pub blocked: bool,
    /// Milliseconds since spawn
    pub runtime_ms: u64,
}
