//! Tool adapter - the request-facing surface of the process subsystem
//!
//! A tool takes a JSON object, performs one action and answers with a
//! [`ToolResult`]. Malformed input is an [`Error::InvalidInput`]; refused or
//! failed work is a result with `success = false`.

mod guidance;
mod process;

pub use process::ProcessTool;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Risk level of a tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Read-only
    Low,
    /// Writes with limited scope
    Medium,
    /// Runs arbitrary commands
    High,
}

/// Tool metadata and parameter schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool name
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// JSON schema for parameters
    pub parameters: serde_json::Value,
    /// Risk level
    pub risk_level: RiskLevel,
}

impl ToolDefinition {
    /// Create a new tool definition
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
            risk_level: RiskLevel::Low,
        }
    }

    /// Set the parameters schema
    #[must_use]
    pub fn with_parameters(mut self, parameters: serde_json::Value) -> Self {
        self.parameters = parameters;
        self
    }

    /// Set the risk level
    #[must_use]
    pub fn with_risk_level(mut self, risk_level: RiskLevel) -> Self {
        self.risk_level = risk_level;
        self
    }
}

/// Result of a tool execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether execution succeeded
    pub success: bool,
    /// Output data
    pub output: serde_json::Value,
    /// Error message if failed
    pub error: Option<String>,
    /// Execution duration in milliseconds
    pub duration_ms: u64,
}

impl ToolResult {
    /// Create a successful result
    #[must_use]
    pub fn success(output: serde_json::Value, duration_ms: u64) -> Self {
        Self {
            success: true,
            output,
            error: None,
            duration_ms,
        }
    }

    /// Create a failed result
    #[must_use]
    pub fn failure(error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            success: false,
            output: serde_json::Value::Null,
            error: Some(error.into()),
            duration_ms,
        }
    }

    /// Attach output to a result
    #[must_use]
    pub fn with_output(mut self, output: serde_json::Value) -> Self {
        self.output = output;
        self
    }
}

/// Trait for tool implementations
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool definition
    fn definition(&self) -> &ToolDefinition;

    /// Execute the tool with given input
    async fn execute(&self, input: serde_json::Value) -> Result<ToolResult>;

    /// Validate input before execution
    fn validate_input(&self, input: &serde_json::Value) -> Result<()> {
        if !input.is_object() {
            return Err(Error::InvalidInput("Input must be an object".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_definition_builder() {
        let def = ToolDefinition::new("process", "Runs things")
            .with_risk_level(RiskLevel::High)
            .with_parameters(serde_json::json!({"type": "object"}));
        assert_eq!(def.name, "process");
        assert_eq!(def.risk_level, RiskLevel::High);
        assert_eq!(def.parameters["type"], "object");
    }

    #[test]
    fn test_tool_result() {
        let ok = ToolResult::success(serde_json::json!({"pid": 1}), 5);
        assert!(ok.success);
        assert!(ok.error.is_none());

        let failed = ToolResult::failure("nope", 1).with_output(serde_json::json!({"pid": -1}));
        assert!(!failed.success);
        assert_eq!(failed.error.as_deref(), Some("nope"));
        assert_eq!(failed.output["pid"], -1);
    }

    #[test]
    fn test_risk_level_serde() {
        assert_eq!(serde_json::to_string(&RiskLevel::High).unwrap(), "\"high\"");
    }
}
