//! Command gate - classifies a command before it runs
//!
//! The gate holds two ordered tables of compiled matchers:
//!
//! ```text
//! blocked      → never runs, override token ignored
//! destructive  → runs only when the override token is present
//! ```
//!
//! Matching is textual. Obfuscated commands can slip through and benign
//! commands containing a matching substring are rejected.

mod rules;

#[cfg(test)]
mod tests;

use crate::config::ExecConfig;
use crate::error::{Error, Result};
use regex::Regex;
use rules::{RuleSpec, BLOCKED_RULES, DESTRUCTIVE_RULES};
use serde::Serialize;
use std::sync::LazyLock;
use tracing::{info, warn};

static BUILTIN_BLOCKED: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    compile(BLOCKED_RULES).expect("built-in blocked patterns are constants and must compile")
});

static BUILTIN_DESTRUCTIVE: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    compile(DESTRUCTIVE_RULES).expect("built-in destructive patterns are constants and must compile")
});

/// Which table a rule belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    /// Unconditionally blocked
    Blocked,
    /// Allowed with the override token
    Destructive,
}

/// A tagged, compiled matcher.
#[derive(Debug, Clone)]
pub struct Rule {
    tag: String,
    reason: String,
    matcher: Regex,
}

impl Rule {
    /// Short identifier, e.g. `rm-recursive`
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Human-readable reason
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Whether the rule matches the command text
    #[must_use]
    pub fn matches(&self, command: &str) -> bool {
        self.matcher.is_match(command)
    }
}

fn compile(table: &[RuleSpec]) -> Result<Vec<Rule>> {
    table
        .iter()
        .map(|entry| {
            let matcher = Regex::new(entry.pattern).map_err(|e| {
                Error::Config(format!("invalid gate pattern '{}': {}", entry.tag, e))
            })?;
            Ok(Rule {
                tag: entry.tag.to_string(),
                reason: entry.reason.to_string(),
                matcher,
            })
        })
        .collect()
}

/// Builds a whole-word matcher for a configured base command.
fn command_rule(command: &str) -> Result<Rule> {
    let trimmed = command.trim();
    if trimmed.is_empty() {
        return Err(Error::Config("blocked command must not be empty".into()));
    }
    let pattern = format!(
        r"(?:^|[\s;&|(`]){}(?:[\s;&|)`]|$)",
        regex::escape(trimmed)
    );
    let matcher = Regex::new(&pattern)
        .map_err(|e| Error::Config(format!("invalid blocked command '{}': {}", trimmed, e)))?;
    Ok(Rule {
        tag: trimmed.to_string(),
        reason: format!("'{}' is on the configured block list", trimmed),
        matcher,
    })
}

/// Outcome of classifying a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    /// The command may run as `command` (override token removed).
    Allowed {
        /// Text to execute
        command: String,
        /// Whether a destructive rule was waived by the override token
        overridden: bool,
    },
    /// The command is categorically forbidden.
    Blocked {
        /// Tag of the matching rule
        rule: String,
        /// Why it is forbidden
        reason: String,
    },
    /// The command is destructive and lacks the override token.
    RequiresOverride {
        /// Tag of the matching rule
        rule: String,
        /// What makes it destructive
        reason: String,
    },
}

impl Verdict {
    /// Whether the command may run
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }

    /// Rejection reason, if any
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Allowed { .. } => None,
            Self::Blocked { reason, .. } | Self::RequiresOverride { reason, .. } => Some(reason),
        }
    }
}

/// Safety gate evaluated before every spawn.
#[derive(Debug, Clone)]
pub struct CommandGate {
    blocked: Vec<Rule>,
    destructive: Vec<Rule>,
    override_token: String,
}

impl Default for CommandGate {
    fn default() -> Self {
        Self {
            blocked: BUILTIN_BLOCKED.clone(),
            destructive: BUILTIN_DESTRUCTIVE.clone(),
            override_token: crate::config::DEFAULT_OVERRIDE_TOKEN.to_string(),
        }
    }
}

impl CommandGate {
    /// Create a gate with the built-in tables
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a gate from configuration (built-ins plus configured blocks)
    pub fn from_config(config: &ExecConfig) -> Result<Self> {
        let mut gate = Self::default();
        if config.override_token.trim().is_empty() {
            return Err(Error::Config("override token must not be empty".into()));
        }
        gate.override_token = config.override_token.clone();
        for command in &config.blocked_commands {
            gate.blocked.push(command_rule(command)?);
        }
        Ok(gate)
    }

    /// The token that authorizes destructive commands
    #[must_use]
    pub fn override_token(&self) -> &str {
        &self.override_token
    }

    /// Rules of one table, in evaluation order
    pub fn rules(&self, kind: RuleKind) -> impl Iterator<Item = &Rule> {
        match kind {
            RuleKind::Blocked => self.blocked.iter(),
            RuleKind::Destructive => self.destructive.iter(),
        }
    }

    /// Classify a raw command.
    #[must_use]
    pub fn classify(&self, command: &str) -> Verdict {
        let has_token = command.contains(self.override_token.as_str());
        let stripped = if has_token {
            command.replace(self.override_token.as_str(), "").trim().to_string()
        } else {
            command.trim().to_string()
        };

        if let Some(rule) = self.blocked.iter().find(|r| r.matches(&stripped)) {
            warn!(rule = %rule.tag, "Blocked command rejected");
            return Verdict::Blocked {
                rule: rule.tag.clone(),
                reason: rule.reason.clone(),
            };
        }

        if let Some(rule) = self.destructive.iter().find(|r| r.matches(&stripped)) {
            if !has_token {
                warn!(rule = %rule.tag, "Destructive command requires override");
                return Verdict::RequiresOverride {
                    rule: rule.tag.clone(),
                    reason: rule.reason.clone(),
                };
            }
            info!(rule = %rule.tag, "Destructive command authorized by override token");
            return Verdict::Allowed {
                command: stripped,
                overridden: true,
            };
        }

        Verdict::Allowed {
            command: stripped,
            overridden: false,
        }
    }
}
