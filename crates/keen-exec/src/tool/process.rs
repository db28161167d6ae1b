//! ProcessTool - start, poll, feed and stop processes through one tool
//!
//! Actions, selected by `action`:
//! - `start` (default): gate and spawn `command`, wait up to `timeout_ms`
//! - `read`: drain new output of `pid`
//! - `interact`: send one line of `input` to `pid`
//! - `terminate`: interrupt `pid`, kill it after the grace period
//! - `list` / `list_completed`: session snapshots

use super::guidance::rejection_help;
use super::{RiskLevel, Tool, ToolDefinition, ToolResult};
use crate::classifier::{ProcessState, PromptHeuristics, StateClassifier};
use crate::error::{Error, Result};
use crate::session::{SessionRegistry, StartOutcome, StartedProcess, SENTINEL_PID};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

const ACTIONS: &[&str] = &["start", "read", "interact", "terminate", "list", "list_completed"];

/// The `process` tool.
pub struct ProcessTool {
    definition: ToolDefinition,
    registry: SessionRegistry,
    classifier: Arc<dyn StateClassifier>,
}

impl ProcessTool {
    /// Create the tool over `registry` with the default classifier.
    #[must_use]
    pub fn new(registry: SessionRegistry) -> Self {
        Self::with_classifier(registry, Arc::new(PromptHeuristics::new()))
    }

    /// Create the tool with a custom state classifier.
    #[must_use]
    pub fn with_classifier(registry: SessionRegistry, classifier: Arc<dyn StateClassifier>) -> Self {
        let default_timeout = registry.config().default_timeout_ms;
        let definition = ToolDefinition::new(
            "process",
            "Run shell commands as tracked processes. action=\"start\" (default) runs \
             a command and waits up to timeout_ms for it; long-running processes keep \
             going and can be polled with action=\"read\", fed a line of input with \
             action=\"interact\", stopped with action=\"terminate\", and listed with \
             action=\"list\" or action=\"list_completed\". Destructive commands need \
             the override flag and explicit user permission.",
        )
        .with_risk_level(RiskLevel::High)
        .with_parameters(json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": ACTIONS,
                    "description": "Action to perform (default: start)"
                },
                "command": {
                    "type": "string",
                    "description": "Command line to run (start)"
                },
                "timeout_ms": {
                    "type": "integer",
                    "description": format!("Initial wait in milliseconds (start, default {})", default_timeout)
                },
                "shell": {
                    "type": "string",
                    "description": "Shell to run the command with (start, optional)"
                },
                "pid": {
                    "type": "integer",
                    "description": "Process ID (read, interact, terminate)"
                },
                "input": {
                    "type": "string",
                    "description": "Line to send; a newline is appended (interact)"
                }
            }
        }));

        Self {
            definition,
            registry,
            classifier,
        }
    }

    /// The registry behind this tool
    #[must_use]
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    // ── Actions ──────────────────────────────────────────────────────────

    async fn action_start(
        &self,
        command: &str,
        timeout: Duration,
        shell: Option<&str>,
    ) -> Result<ToolResult> {
        let start = Instant::now();
        let outcome = self.registry.start(command, timeout, shell).await;
        let duration = start.elapsed().as_millis() as u64;

        match outcome {
            StartOutcome::Started(process) => {
                Ok(ToolResult::success(self.started_output(&process), duration))
            }
            StartOutcome::Rejected { verdict } => {
                let help = rejection_help(command, &verdict, self.registry.gate().override_token())
                    .unwrap_or_else(|| format!("Error: Command not allowed: {}", command));
                Ok(ToolResult::failure(help, duration).with_output(json!({
                    "pid": SENTINEL_PID,
                    "verdict": verdict
                })))
            }
            StartOutcome::SpawnFailed { message } => Ok(ToolResult::failure(
                format!(
                    "Error: Failed to get process ID. The command could not be executed. ({})",
                    message
                ),
                duration,
            )
            .with_output(json!({ "pid": SENTINEL_PID }))),
        }
    }

    fn started_output(&self, process: &StartedProcess) -> Value {
        let pid = process.pid;
        let (state, hint) = if process.still_running {
            let state = self.classifier.classify(&process.initial_output, pid);
            let hint = status_hint(&state, pid);
            (state, hint)
        } else {
            let state = ProcessState::Finished;
            let hint = format!(
                "✅ {} Exit code: {}",
                state.describe(pid),
                process
                    .exit_code
                    .map_or_else(|| "none".to_string(), |c| c.to_string())
            );
            (state, hint)
        };

        json!({
            "pid": pid,
            "initial_output": process.initial_output,
            "still_running": process.still_running,
            "exit_code": process.exit_code,
            "state": state,
            "status_hint": hint,
            "message": format!(
                "Process started with PID {}\nInitial output:\n{}\n{}",
                pid, process.initial_output, hint
            )
        })
    }

    async fn action_read(&self, pid: u32) -> Result<ToolResult> {
        let start = Instant::now();
        let output = self.registry.drain_output(pid).await;
        let duration = start.elapsed().as_millis() as u64;
        Ok(ToolResult::success(
            json!({
                "pid": pid,
                "output": output
            }),
            duration,
        ))
    }

    async fn action_interact(&self, pid: u32, input: &str) -> Result<ToolResult> {
        let start = Instant::now();
        let sent = self.registry.send_input(pid, input).await;
        let duration = start.elapsed().as_millis() as u64;
        let result = ToolResult::success(json!({ "pid": pid, "sent": sent }), duration);
        if sent {
            Ok(result)
        } else {
            Ok(ToolResult {
                success: false,
                error: Some(format!("No live process with PID {} accepting input", pid)),
                ..result
            })
        }
    }

    async fn action_terminate(&self, pid: u32) -> Result<ToolResult> {
        let start = Instant::now();
        let terminated = self.registry.force_terminate(pid).await;
        let duration = start.elapsed().as_millis() as u64;
        let result = ToolResult::success(json!({ "pid": pid, "terminated": terminated }), duration);
        if terminated {
            Ok(result)
        } else {
            Ok(ToolResult {
                success: false,
                error: Some(format!("No live process with PID {}", pid)),
                ..result
            })
        }
    }

    async fn action_list(&self) -> Result<ToolResult> {
        let start = Instant::now();
        let sessions = self.registry.list_active().await;
        let duration = start.elapsed().as_millis() as u64;
        Ok(ToolResult::success(
            json!({
                "count": sessions.len(),
                "sessions": sessions
            }),
            duration,
        ))
    }

    async fn action_list_completed(&self) -> Result<ToolResult> {
        let start = Instant::now();
        let sessions: Vec<Value> = self
            .registry
            .list_completed()
            .await
            .iter()
            .map(|s| {
                json!({
                    "pid": s.pid,
                    "exit_code": s.exit_code,
                    "started_at": s.started_at,
                    "ended_at": s.ended_at,
                    "runtime_ms": s.runtime_ms(),
                    "output_bytes": s.full_output.len(),
                    "completion_reported": s.completion_reported
                })
            })
            .collect();
        let duration = start.elapsed().as_millis() as u64;
        Ok(ToolResult::success(
            json!({
                "count": sessions.len(),
                "sessions": sessions
            }),
            duration,
        ))
    }
}

/// Status line appended to a start response.
fn status_hint(state: &ProcessState, pid: u32) -> String {
    match state {
        ProcessState::WaitingForInput { .. } => format!("🔄 {}", state.describe(pid)),
        ProcessState::Finished => format!("✅ {}", state.describe(pid)),
        ProcessState::StillBusy => {
            "⏳ Process is running. Use action=\"read\" to get more output.".to_string()
        }
    }
}

fn required_pid(input: &Value, action: &str) -> Result<u32> {
    let raw = input
        .get("pid")
        .ok_or_else(|| Error::InvalidInput(format!("'pid' required for {} action", action)))?;
    raw.as_u64()
        .and_then(|pid| u32::try_from(pid).ok())
        .ok_or_else(|| Error::InvalidInput(format!("'pid' must be a process ID, got {}", raw)))
}

#[async_trait::async_trait]
impl Tool for ProcessTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        self.validate_input(&input)?;
        let action = input
            .get("action")
            .and_then(|v| v.as_str())
            .unwrap_or("start");
        debug!(action, "Process tool invoked");

        match action {
            "start" => {
                let command = input
                    .get("command")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| Error::InvalidInput("Missing 'command' parameter".to_string()))?;
                if command.trim().is_empty() {
                    return Err(Error::InvalidInput("'command' must not be empty".to_string()));
                }
                let timeout = match input.get("timeout_ms") {
                    None | Some(Value::Null) => self.registry.config().default_timeout(),
                    Some(v) => v.as_u64().map(Duration::from_millis).ok_or_else(|| {
                        Error::InvalidInput("'timeout_ms' must be a non-negative integer".to_string())
                    })?,
                };
                let shell = input.get("shell").and_then(|v| v.as_str());
                self.action_start(command, timeout, shell).await
            }
            "read" => {
                let pid = required_pid(&input, action)?;
                self.action_read(pid).await
            }
            "interact" => {
                let pid = required_pid(&input, action)?;
                let text = input.get("input").and_then(|v| v.as_str()).ok_or_else(|| {
                    Error::InvalidInput("'input' required for interact action".to_string())
                })?;
                self.action_interact(pid, text).await
            }
            "terminate" => {
                let pid = required_pid(&input, action)?;
                self.action_terminate(pid).await
            }
            "list" => self.action_list().await,
            "list_completed" => self.action_list_completed().await,
            _ => Err(Error::InvalidInput(format!(
                "Unknown action '{}'. Valid: {}",
                action,
                ACTIONS.join(", ")
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::MockStateClassifier;
    use crate::config::ExecConfig;

    fn tool() -> ProcessTool {
        ProcessTool::new(SessionRegistry::new(ExecConfig::default()).unwrap())
    }

    #[test]
    fn test_definition() {
        let tool = tool();
        let def = tool.definition();
        assert_eq!(def.name, "process");
        assert_eq!(def.risk_level, RiskLevel::High);
        assert_eq!(def.parameters["properties"]["action"]["enum"][5], "list_completed");
    }

    #[test]
    fn test_status_hints() {
        let waiting = ProcessState::WaitingForInput { prompt: None };
        assert!(status_hint(&waiting, 3).starts_with("🔄 Process 3 is waiting"));
        assert!(status_hint(&ProcessState::Finished, 3).starts_with("✅"));
        assert!(status_hint(&ProcessState::StillBusy, 3).starts_with("⏳ Process is running"));
    }

    #[test]
    fn test_required_pid() {
        assert_eq!(required_pid(&json!({"pid": 42}), "read").unwrap(), 42);
        assert!(required_pid(&json!({}), "read").is_err());
        assert!(required_pid(&json!({"pid": -1}), "read").is_err());
        assert!(required_pid(&json!({"pid": "12"}), "read").is_err());
    }

    #[tokio::test]
    async fn test_invalid_input() {
        let tool = tool();
        assert!(matches!(
            tool.execute(json!("ls")).await,
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            tool.execute(json!({"action": "explode"})).await,
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            tool.execute(json!({"action": "start"})).await,
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            tool.execute(json!({"command": "ls", "timeout_ms": "soon"})).await,
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            tool.execute(json!({"action": "interact", "pid": 1})).await,
            Err(Error::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_rejection_is_error_result() {
        let result = tool()
            .execute(json!({"command": "rm -rf /tmp/x", "timeout_ms": 1000}))
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.output["pid"], SENTINEL_PID);
        assert_eq!(result.output["verdict"]["verdict"], "requires_override");
        assert!(result
            .error
            .unwrap()
            .contains("--i-have-explicit-permission-from-user"));
    }

    #[tokio::test]
    async fn test_unknown_pid_actions() {
        let tool = tool();
        let read = tool.execute(json!({"action": "read", "pid": 999_999})).await.unwrap();
        assert!(read.success);
        assert!(read.output["output"].is_null());

        let sent = tool
            .execute(json!({"action": "interact", "pid": 999_999, "input": "y"}))
            .await
            .unwrap();
        assert!(!sent.success);
        assert_eq!(sent.output["sent"], false);

        let killed = tool
            .execute(json!({"action": "terminate", "pid": 999_999}))
            .await
            .unwrap();
        assert!(!killed.success);
        assert_eq!(killed.output["terminated"], false);
    }

    #[tokio::test]
    async fn test_empty_listings() {
        let tool = tool();
        let active = tool.execute(json!({"action": "list"})).await.unwrap();
        assert_eq!(active.output["count"], 0);
        let completed = tool
            .execute(json!({"action": "list_completed"}))
            .await
            .unwrap();
        assert_eq!(completed.output["sessions"], json!([]));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_start_consults_classifier_while_running() {
        let mut classifier = MockStateClassifier::new();
        classifier
            .expect_classify()
            .withf(|output, _| output.contains("Name?"))
            .times(1)
            .returning(|_, _| ProcessState::WaitingForInput {
                prompt: Some("Name?".to_string()),
            });
        let registry = SessionRegistry::new(ExecConfig::default()).unwrap();
        let tool = ProcessTool::with_classifier(registry.clone(), Arc::new(classifier));

        let result = tool
            .execute(json!({
                "command": "printf 'Name? '; read name; echo hi $name",
                "timeout_ms": 300
            }))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.output["still_running"], true);
        assert_eq!(result.output["state"]["state"], "waiting_for_input");
        let hint = result.output["status_hint"].as_str().unwrap();
        assert!(hint.starts_with("🔄"));

        let pid = result.output["pid"].as_u64().unwrap();
        let sent = tool
            .execute(json!({"action": "interact", "pid": pid, "input": "ann"}))
            .await
            .unwrap();
        assert_eq!(sent.output["sent"], true);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_start_finished_skips_classifier() {
        let mut classifier = MockStateClassifier::new();
        classifier.expect_classify().never();
        let registry = SessionRegistry::new(ExecConfig::default()).unwrap();
        let tool = ProcessTool::with_classifier(registry, Arc::new(classifier));

        let result = tool
            .execute(json!({"command": "echo hello", "timeout_ms": 5000}))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.output["still_running"], false);
        assert_eq!(result.output["exit_code"], 0);
        let message = result.output["message"].as_str().unwrap();
        assert!(message.starts_with(&format!(
            "Process started with PID {}\nInitial output:\nhello\n",
            result.output["pid"]
        )));
    }
}
