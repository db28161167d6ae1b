//! Process handle - one spawned OS process
//!
//! The handle owns the shared ends of a process: its stdin, its merged
//! output, and the notifier used to request a forced kill. The `Child`
//! itself goes to the supervisor task together with the reader tasks.

use super::output::{OutputAggregator, Utf8Decoder};
use crate::error::{Error, Result};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const READ_CHUNK_BYTES: usize = 4096;

/// Shared handle to a spawned process.
#[derive(Debug, Clone)]
pub struct ProcessHandle {
    pid: u32,
    stdin: Arc<Mutex<Option<ChildStdin>>>,
    output: Arc<OutputAggregator>,
    kill: Arc<Notify>,
}

/// A freshly spawned process, before its supervisor starts.
pub(crate) struct Spawned {
    pub handle: ProcessHandle,
    pub child: Child,
    pub readers: Vec<JoinHandle<()>>,
}

impl ProcessHandle {
    /// Spawn `command` through `shell` (platform shell when `None`).
    pub(crate) fn spawn(command: &str, shell: Option<&str>) -> Result<Spawned> {
        let mut cmd = shell_command(command, shell);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(false);
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd
            .spawn()
            .map_err(|e| Error::Spawn(format!("failed to spawn '{}': {}", command, e)))?;
        let pid = child.id().ok_or_else(|| {
            Error::Spawn("failed to get process ID; the command could not be executed".into())
        })?;

        let output = Arc::new(OutputAggregator::new());
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_reader(pid, "stdout", stdout, output.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_reader(pid, "stderr", stderr, output.clone()));
        }

        let handle = Self {
            pid,
            stdin: Arc::new(Mutex::new(child.stdin.take())),
            output,
            kill: Arc::new(Notify::new()),
        };
        Ok(Spawned {
            handle,
            child,
            readers,
        })
    }

    /// OS process identifier
    #[must_use]
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Merged output of the process
    #[must_use]
    pub fn output(&self) -> &Arc<OutputAggregator> {
        &self.output
    }

    pub(crate) fn kill_notifier(&self) -> Arc<Notify> {
        self.kill.clone()
    }

    /// Ask the supervisor to kill the child.
    pub(crate) fn request_kill(&self) {
        self.kill.notify_one();
    }

    /// Write `text` to stdin, newline-terminated.
    ///
    /// `false` when stdin is closed, another write is still in flight, or
    /// the write fails or outlasts `limit`. A failed or stalled write closes
    /// stdin for good, since part of the line may already be in the pipe.
    pub(crate) async fn write_input(&self, text: &str, limit: Duration) -> bool {
        let Ok(mut guard) = self.stdin.try_lock() else {
            debug!(pid = self.pid, "stdin busy with an earlier write");
            return false;
        };
        let Some(stdin) = guard.as_mut() else {
            return false;
        };

        let line = if text.ends_with('\n') {
            text.to_string()
        } else {
            format!("{}\n", text)
        };

        let write = async {
            match stdin.write_all(line.as_bytes()).await {
                Ok(()) => stdin.flush().await,
                Err(e) => Err(e),
            }
        };
        match tokio::time::timeout(limit, write).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                debug!(pid = self.pid, error = %e, "stdin write failed, closing input");
                *guard = None;
                false
            }
            Err(_) => {
                warn!(
                    pid = self.pid,
                    bytes = line.len(),
                    limit_ms = limit.as_millis() as u64,
                    "stdin write stalled, closing input"
                );
                *guard = None;
                false
            }
        }
    }
}

/// Shell invocation for a command line.
fn shell_command(command: &str, shell: Option<&str>) -> Command {
    let (program, flag) = match shell {
        Some(shell) => (shell.to_string(), shell_flag(shell)),
        None if cfg!(windows) => ("cmd".to_string(), "/C"),
        None => ("/bin/sh".to_string(), "-c"),
    };
    let mut cmd = Command::new(program);
    cmd.arg(flag).arg(command);
    cmd
}

fn shell_flag(shell: &str) -> &'static str {
    let name = shell
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(shell)
        .to_ascii_lowercase();
    match name.trim_end_matches(".exe") {
        "cmd" => "/C",
        "powershell" | "pwsh" => "-Command",
        _ => "-c",
    }
}

fn spawn_reader<R>(
    pid: u32,
    stream: &'static str,
    mut reader: R,
    output: Arc<OutputAggregator>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut decoder = Utf8Decoder::new();
        let mut buf = [0u8; READ_CHUNK_BYTES];
        loop {
            match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => output.append(&decoder.push(&buf[..n])),
                Err(e) => {
                    debug!(pid, stream, error = %e, "Output stream read failed");
                    break;
                }
            }
        }
        output.append(&decoder.finish());
    })
}
