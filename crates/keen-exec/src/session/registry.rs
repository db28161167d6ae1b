//! Session registry - owner of every live and completed session

use super::completed::{CompletedSession, CompletedStore};
use super::handle::{ProcessHandle, Spawned};
use super::{signal, ActiveSession, StartOutcome, StartedProcess};
use crate::config::ExecConfig;
use crate::error::Result;
use crate::gate::{CommandGate, Verdict};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::process::Child;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug)]
struct LiveSession {
    handle: ProcessHandle,
    started_at: DateTime<Utc>,
    started: Instant,
    blocked: bool,
}

#[derive(Debug)]
struct Stores {
    live: HashMap<u32, LiveSession>,
    completed: CompletedStore,
}

#[derive(Debug)]
struct Inner {
    config: ExecConfig,
    gate: CommandGate,
    stores: Mutex<Stores>,
}

/// Registry of spawned processes.
///
/// Cloning is cheap and every clone refers to the same stores.
#[derive(Debug, Clone)]
pub struct SessionRegistry {
    inner: Arc<Inner>,
}

impl SessionRegistry {
    /// Create a registry; fails only when the gate configuration is invalid.
    pub fn new(config: ExecConfig) -> Result<Self> {
        let gate = CommandGate::from_config(&config)?;
        let completed = CompletedStore::new(config.completed_capacity);
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                gate,
                stores: Mutex::new(Stores {
                    live: HashMap::new(),
                    completed,
                }),
            }),
        })
    }

    /// The gate applied by [`start`](Self::start)
    #[must_use]
    pub fn gate(&self) -> &CommandGate {
        &self.inner.gate
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &ExecConfig {
        &self.inner.config
    }

    /// Gate, spawn and wait up to `timeout` for the process to exit.
    ///
    /// Rejections and spawn failures are returned as values. A process that
    /// outlives `timeout` keeps running and its session is flagged blocked.
    pub async fn start(
        &self,
        command: &str,
        timeout: Duration,
        shell: Option<&str>,
    ) -> StartOutcome {
        let command = match self.inner.gate.classify(command) {
            Verdict::Allowed { command, .. } => command,
            verdict => return StartOutcome::Rejected { verdict },
        };

        let shell = shell.or(self.inner.config.default_shell.as_deref());
        let Spawned {
            handle,
            child,
            readers,
        } = match ProcessHandle::spawn(&command, shell) {
            Ok(spawned) => spawned,
            Err(e) => {
                warn!(command = %command, error = %e, "Process spawn failed");
                return StartOutcome::SpawnFailed {
                    message: e.to_string(),
                };
            }
        };

        let pid = handle.pid();
        let started_at = Utc::now();
        {
            let mut stores = self.inner.stores.lock().await;
            if stores.completed.remove(pid).is_some() {
                debug!(pid, "Pid reused, dropped stale completed session");
            }
            stores.live.insert(
                pid,
                LiveSession {
                    handle: handle.clone(),
                    started_at,
                    started: Instant::now(),
                    blocked: false,
                },
            );
        }
        info!(pid, command = %command, "Process started");

        let (exit_tx, exit_rx) = oneshot::channel();
        tokio::spawn(self.clone().supervise(handle.clone(), child, readers, exit_tx));

        let exited = tokio::select! {
            res = exit_rx => Some(res.unwrap_or(None)),
            () = tokio::time::sleep(timeout) => None,
        };

        let initial_output = handle.output().snapshot();
        match exited {
            Some(exit_code) => {
                // the initial output already carried everything
                self.clear_undrained(pid).await;
                StartOutcome::Started(StartedProcess {
                    pid,
                    initial_output,
                    still_running: false,
                    exit_code,
                })
            }
            None => {
                self.mark_blocked(pid).await;
                debug!(pid, timeout_ms = timeout.as_millis() as u64, "Initial wait timed out");
                StartOutcome::Started(StartedProcess {
                    pid,
                    initial_output,
                    still_running: true,
                    exit_code: None,
                })
            }
        }
    }

    /// Write a newline-terminated line to a live session's stdin.
    ///
    /// Never queues: `false` when the pipe stays full past the configured
    /// input timeout or an earlier write is still pending.
    pub async fn send_input(&self, pid: u32, text: &str) -> bool {
        let handle = {
            let stores = self.inner.stores.lock().await;
            match stores.live.get(&pid) {
                Some(session) => session.handle.clone(),
                None => return false,
            }
        };
        let sent = handle
            .write_input(text, self.inner.config.input_timeout())
            .await;
        debug!(pid, sent, bytes = text.len(), "Input sent");
        sent
    }

    /// Output produced since the previous drain.
    ///
    /// For a completed session the residual output and the completion
    /// summary are returned once; afterwards, and for unknown pids, `None`.
    pub async fn drain_output(&self, pid: u32) -> Option<String> {
        let mut stores = self.inner.stores.lock().await;
        if let Some(session) = stores.live.get(&pid) {
            return Some(session.handle.output().drain());
        }
        stores
            .completed
            .get_mut(pid)
            .and_then(CompletedSession::take_report)
    }

    /// Interrupt a live session, then kill it if it is still live after the
    /// grace period.
    pub async fn force_terminate(&self, pid: u32) -> bool {
        let handle = {
            let stores = self.inner.stores.lock().await;
            match stores.live.get(&pid) {
                Some(session) => session.handle.clone(),
                None => return false,
            }
        };

        if cfg!(unix) {
            if let Err(e) = signal::interrupt(pid) {
                warn!(pid, error = %e, "Failed to interrupt process");
                return false;
            }
            debug!(pid, "Sent interrupt");

            let registry = self.clone();
            let grace = self.inner.config.kill_grace();
            tokio::spawn(async move {
                tokio::time::sleep(grace).await;
                // exited, or the pid now names a newer session
                if !registry.owns(&handle).await {
                    return;
                }
                info!(pid, grace_ms = grace.as_millis() as u64, "Process survived interrupt, killing");
                if let Err(e) = signal::kill_group(pid) {
                    warn!(pid, error = %e, "Failed to kill process group");
                }
                handle.request_kill();
            });
        } else {
            debug!(pid, "No interrupt on this platform, killing");
            handle.request_kill();
        }
        true
    }

    /// Live sessions, oldest first.
    pub async fn list_active(&self) -> Vec<ActiveSession> {
        let stores = self.inner.stores.lock().await;
        let mut live: Vec<&LiveSession> = stores.live.values().collect();
        live.sort_by_key(|s| s.started_at);
        live.into_iter()
            .map(|s| ActiveSession {
                pid: s.handle.pid(),
                blocked: s.blocked,
                runtime_ms: u64::try_from(s.started.elapsed().as_millis()).unwrap_or(u64::MAX),
            })
            .collect()
    }

    /// Completed sessions in insertion order.
    pub async fn list_completed(&self) -> Vec<CompletedSession> {
        self.inner.stores.lock().await.completed.snapshot()
    }

    /// Whether `pid` names a live session
    pub async fn is_live(&self, pid: u32) -> bool {
        self.inner.stores.lock().await.live.contains_key(&pid)
    }

    async fn owns(&self, handle: &ProcessHandle) -> bool {
        owned_by(&self.inner.stores.lock().await.live, handle)
    }

    async fn mark_blocked(&self, pid: u32) {
        if let Some(session) = self.inner.stores.lock().await.live.get_mut(&pid) {
            session.blocked = true;
        }
    }

    async fn clear_undrained(&self, pid: u32) {
        if let Some(record) = self.inner.stores.lock().await.completed.get_mut(pid) {
            record.undrained.clear();
        }
    }

    /// Owns the child: waits for exit or a kill request, lets the readers
    /// finish, then moves the session to the completed store.
    async fn supervise(
        self,
        handle: ProcessHandle,
        mut child: Child,
        mut readers: Vec<JoinHandle<()>>,
        exit_tx: oneshot::Sender<Option<i32>>,
    ) {
        let pid = handle.pid();
        let kill = handle.kill_notifier();

        let status = tokio::select! {
            status = child.wait() => status,
            () = kill.notified() => {
                if let Err(e) = child.start_kill() {
                    debug!(pid, error = %e, "Kill after request failed");
                }
                child.wait().await
            }
        };
        let exit_code = match status {
            Ok(status) => status.code(),
            Err(e) => {
                warn!(pid, error = %e, "Failed to wait for process");
                None
            }
        };

        let drain = self.inner.config.reader_drain();
        let joined = tokio::time::timeout(
            drain,
            futures::future::join_all(readers.iter_mut()),
        )
        .await;
        if joined.is_err() {
            debug!(pid, "Output readers still open after exit, aborting");
            for reader in &readers {
                reader.abort();
            }
        }

        self.complete(&handle, exit_code).await;
        let _ = exit_tx.send(exit_code);
    }

    async fn complete(&self, handle: &ProcessHandle, exit_code: Option<i32>) {
        let pid = handle.pid();
        let mut stores = self.inner.stores.lock().await;
        // the pid may already belong to a newer session
        if !owned_by(&stores.live, handle) {
            return;
        }
        let Some(session) = stores.live.remove(&pid) else {
            return;
        };

        let (full_output, undrained) = handle.output().finish();
        let record = CompletedSession {
            pid,
            full_output,
            exit_code,
            started_at: session.started_at,
            ended_at: Utc::now(),
            completion_reported: false,
            undrained,
        };
        info!(
            pid,
            exit_code = ?exit_code,
            runtime_ms = record.runtime_ms(),
            "Process completed"
        );
        stores.completed.insert(record);
    }
}

/// Whether the live entry under `handle`'s pid is `handle` itself.
fn owned_by(live: &HashMap<u32, LiveSession>, handle: &ProcessHandle) -> bool {
    live.get(&handle.pid())
        .is_some_and(|s| Arc::ptr_eq(s.handle.output(), handle.output()))
}
