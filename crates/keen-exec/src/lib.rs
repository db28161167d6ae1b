//! Keen Exec - Gated process execution and session management
//!
//! This crate provides the process subsystem for Keen:
//! - Gate: classifies commands before they run (block / override / allow)
//! - Sessions: registry of live and completed processes, output draining,
//!   input injection and two-phase termination
//! - Classifier: heuristics that guess whether a process awaits input
//! - Tool: the `process` tool adapter used by the request layer

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod classifier;
pub mod config;
pub mod error;
pub mod gate;
pub mod session;
pub mod tool;

pub use classifier::{PromptHeuristics, ProcessState, StateClassifier};
pub use config::ExecConfig;
pub use error::{Error, Result};
pub use gate::{CommandGate, Verdict};
pub use session::{
    ActiveSession, CompletedSession, OutputAggregator, SessionRegistry, StartOutcome,
    StartedProcess, SENTINEL_PID,
};
pub use tool::{ProcessTool, Tool, ToolDefinition, ToolResult};
