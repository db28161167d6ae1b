//! Completed sessions and their bounded store
//!
//! The store evicts by insertion order, not by access: an old record that is
//! polled often still leaves before a newer one that was never read.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// Terminal record of a process that exited.
#[derive(Debug, Clone, Serialize)]
pub struct CompletedSession {
    /// OS process identifier
    pub pid: u32,
    /// Every byte of output the process produced, in arrival order
    pub full_output: String,
    /// Exit code, `None` when terminated by a signal
    pub exit_code: Option<i32>,
    /// Spawn time
    pub started_at: DateTime<Utc>,
    /// Exit time
    pub ended_at: DateTime<Utc>,
    /// Whether a drain already delivered the completion notice
    pub completion_reported: bool,
    /// Output appended after the last drain of the live session
    #[serde(skip)]
    pub(crate) undrained: String,
}

impl CompletedSession {
    /// Wall-clock runtime in milliseconds
    #[must_use]
    pub fn runtime_ms(&self) -> u64 {
        u64::try_from((self.ended_at - self.started_at).num_milliseconds()).unwrap_or(0)
    }

    /// The completion notice shown to a polling caller.
    #[must_use]
    pub fn summary(&self) -> String {
        let code = self
            .exit_code
            .map_or_else(|| "none (terminated by signal)".to_string(), |c| c.to_string());
        format!(
            "Process completed with exit code {}\nRuntime: {:.3}s",
            code,
            self.runtime_ms() as f64 / 1000.0
        )
    }

    /// One-shot delivery: residual output plus the summary, then `None`.
    pub(crate) fn take_report(&mut self) -> Option<String> {
        if self.completion_reported {
            return None;
        }
        self.completion_reported = true;
        let mut report = std::mem::take(&mut self.undrained);
        if !report.is_empty() && !report.ends_with('\n') {
            report.push('\n');
        }
        report.push_str(&self.summary());
        Some(report)
    }
}

/// Completed sessions keyed by pid, bounded, FIFO eviction.
#[derive(Debug)]
pub(crate) struct CompletedStore {
    entries: HashMap<u32, CompletedSession>,
    order: VecDeque<u32>,
    capacity: usize,
}

impl CompletedStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity.min(1024)),
            order: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Insert a record, evicting the earliest-inserted ones beyond capacity.
    pub fn insert(&mut self, session: CompletedSession) {
        let pid = session.pid;
        if self.entries.insert(pid, session).is_some() {
            self.order.retain(|p| *p != pid);
        }
        self.order.push_back(pid);

        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
                debug!(pid = oldest, "Evicted oldest completed session");
            }
        }
    }

    pub fn get_mut(&mut self, pid: u32) -> Option<&mut CompletedSession> {
        self.entries.get_mut(&pid)
    }

    pub fn remove(&mut self, pid: u32) -> Option<CompletedSession> {
        let removed = self.entries.remove(&pid)?;
        self.order.retain(|p| *p != pid);
        Some(removed)
    }

    pub fn contains(&self, pid: u32) -> bool {
        self.entries.contains_key(&pid)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Records in insertion order.
    pub fn snapshot(&self) -> Vec<CompletedSession> {
        self.order
            .iter()
            .filter_map(|pid| self.entries.get(pid).cloned())
            .collect()
    }
}
