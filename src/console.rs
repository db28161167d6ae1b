//! JSON-lines console
//!
//! One request per stdin line, one [`ToolResult`] per stdout line. A bad
//! line produces an error result; only EOF or Ctrl-C end the loop.

use anyhow::{Context, Result};
use keen_exec::{ProcessTool, Tool, ToolResult};
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{info, warn};

const SHUTDOWN_POLL: Duration = Duration::from_millis(25);
const SHUTDOWN_SLACK: Duration = Duration::from_millis(500);

/// Serve requests from stdin until EOF or Ctrl-C.
pub async fn run(tool: &ProcessTool) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read request")?,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                break;
            }
        };
        let Some(line) = line else {
            info!("Input closed, shutting down");
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        let result = handle_line(tool, &line).await;
        write_result(&mut stdout, &result).await?;
    }

    shutdown(tool).await;
    Ok(())
}

/// Handle a single request and print its result.
pub async fn run_once(tool: &ProcessTool, request: &str) -> Result<()> {
    let result = handle_line(tool, request).await;
    write_result(&mut tokio::io::stdout(), &result).await
}

/// Parse and execute one request.
pub async fn handle_line(tool: &ProcessTool, line: &str) -> ToolResult {
    let start = Instant::now();
    let input: serde_json::Value = match serde_json::from_str(line) {
        Ok(input) => input,
        Err(e) => {
            warn!(error = %e, "Malformed request");
            return ToolResult::failure(
                format!("Invalid JSON request: {}", e),
                start.elapsed().as_millis() as u64,
            );
        }
    };

    match tool.execute(input).await {
        Ok(result) => result,
        Err(e) => {
            warn!(error = %e, "Request rejected");
            ToolResult::failure(e.to_string(), start.elapsed().as_millis() as u64)
        }
    }
}

async fn write_result<W: AsyncWrite + Unpin>(out: &mut W, result: &ToolResult) -> Result<()> {
    let mut line = serde_json::to_string(result).context("Failed to encode response")?;
    line.push('\n');
    out.write_all(line.as_bytes())
        .await
        .context("Failed to write response")?;
    out.flush().await.context("Failed to flush response")
}

/// Interrupt whatever is still running and stay up until the grace-period
/// kills have landed, so no session outlives the console.
async fn shutdown(tool: &ProcessTool) {
    let registry = tool.registry();
    let live = registry.list_active().await;
    if live.is_empty() {
        return;
    }
    info!(count = live.len(), "Interrupting live processes");
    for session in &live {
        if !registry.force_terminate(session.pid).await {
            warn!(pid = session.pid, "Could not interrupt process");
        }
    }

    let config = registry.config();
    let limit = config.kill_grace() + config.reader_drain() + SHUTDOWN_SLACK;
    let settled = tokio::time::timeout(limit, async {
        while !registry.list_active().await.is_empty() {
            tokio::time::sleep(SHUTDOWN_POLL).await;
        }
    })
    .await;
    if settled.is_err() {
        let left = registry.list_active().await.len();
        warn!(count = left, "Processes still running at shutdown");
    }
}
