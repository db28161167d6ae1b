//! Signal delivery for the termination escalation
//!
//! On Unix every session leads its own process group, so signals go to the
//! group and reach the shell's children. Elsewhere only the forced kill
//! exists, delivered through the supervisor's `Child` handle.

use crate::error::{Error, Result};

/// Send the graceful interrupt (SIGINT) to the session's process group.
#[cfg(unix)]
pub(crate) fn interrupt(pid: u32) -> Result<()> {
    send(pid, nix::sys::signal::Signal::SIGINT)
}

/// Send SIGKILL to the session's process group.
#[cfg(unix)]
pub(crate) fn kill_group(pid: u32) -> Result<()> {
    send(pid, nix::sys::signal::Signal::SIGKILL)
}

#[cfg(unix)]
fn send(pid: u32, signal: nix::sys::signal::Signal) -> Result<()> {
    use nix::sys::signal::killpg;
    use nix::unistd::Pid;

    let raw = i32::try_from(pid)
        .map_err(|_| Error::Signal(format!("pid {} out of range", pid)))?;
    killpg(Pid::from_raw(raw), signal)
        .map_err(|e| Error::Signal(format!("{} to process group {}: {}", signal, pid, e)))
}

#[cfg(not(unix))]
pub(crate) fn interrupt(pid: u32) -> Result<()> {
    Err(Error::Signal(format!(
        "no graceful interrupt on this platform for pid {}",
        pid
    )))
}

#[cfg(not(unix))]
pub(crate) fn kill_group(_pid: u32) -> Result<()> {
    Ok(())
}
