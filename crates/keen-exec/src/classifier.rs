//! Process state classification
//!
//! Guesses from raw output whether a process is waiting for input, has
//! finished, or is still busy. The guess only shapes the status hint shown
//! to the caller; it never changes how a session is tracked.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// Best guess at what a process is doing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ProcessState {
    /// The output ends in something that looks like a prompt.
    WaitingForInput {
        /// The prompt text, when one was recognized
        prompt: Option<String>,
    },
    /// The output ends in a completion marker.
    Finished,
    /// Nothing conclusive.
    StillBusy,
}

impl ProcessState {
    /// One-line description for the caller.
    #[must_use]
    pub fn describe(&self, pid: u32) -> String {
        match self {
            Self::WaitingForInput { prompt: Some(prompt) } => format!(
                "Process {} is waiting for input (prompt: \"{}\"). Use interact to respond.",
                pid, prompt
            ),
            Self::WaitingForInput { prompt: None } => format!(
                "Process {} is waiting for input. Use interact to respond.",
                pid
            ),
            Self::Finished => format!("Process {} has finished.", pid),
            Self::StillBusy => format!("Process {} is still running.", pid),
        }
    }
}

/// Classifies process output.
#[cfg_attr(test, mockall::automock)]
pub trait StateClassifier: Send + Sync {
    /// Classify the output produced so far by `pid`.
    fn classify(&self, output: &str, pid: u32) -> ProcessState;
}

// Prompts recognized on the last line, wherever the output stops.
static PROMPT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // python / node REPLs
        r"^(?:>>>|\.\.\.|>)\s*$",
        r"^(?:In \[\d+\]:|irb\([^)]*\):\d+:\d+>|mysql>|postgres=#|sqlite>)\s*$",
        // shell prompts such as `user@host:~$` or `bash-5.2$`
        r"^(?:\S*[@:~]\S*\s?[$#%]|[\w.\-]*[$#])\s*$",
        r"(?i)[\[(](?:y/n|yes/no)[\])]\s*:?\s*$",
        r"(?i)(?:password|passphrase)[^:]*:\s*$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("prompt patterns are constants and must compile"))
    .collect()
});

// Recognized only when the output does not end in a newline.
static OPEN_QUESTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[:?]\s*$").expect("question pattern is a constant and must compile")
});

static COMPLETION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\bprocess (?:exited|completed|finished)\b",
        r"(?i)\bexit(?:ed with)? (?:code|status) -?\d+\s*$",
        r"(?i)^(?:done|finished|completed)[.!]?\s*$",
        r"(?i)\b(?:build|tests?) (?:succeeded|passed|finished)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("completion patterns are constants and must compile"))
    .collect()
});

/// Default classifier: ANSI stripping plus trailing-line heuristics.
#[derive(Debug, Default, Clone, Copy)]
pub struct PromptHeuristics;

impl PromptHeuristics {
    /// Create the classifier
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl StateClassifier for PromptHeuristics {
    fn classify(&self, output: &str, _pid: u32) -> ProcessState {
        let clean = strip_ansi(output);
        let Some(last) = last_line(&clean) else {
            return ProcessState::StillBusy;
        };

        if PROMPT_PATTERNS.iter().any(|p| p.is_match(last)) {
            return ProcessState::WaitingForInput {
                prompt: Some(last.trim().to_string()),
            };
        }
        let open_ended = !clean.ends_with('\n');
        if open_ended && OPEN_QUESTION.is_match(last) {
            return ProcessState::WaitingForInput {
                prompt: Some(last.trim().to_string()),
            };
        }
        if COMPLETION_PATTERNS.iter().any(|p| p.is_match(last)) {
            return ProcessState::Finished;
        }
        ProcessState::StillBusy
    }
}

/// Last line with visible content; a carriage return restarts the line.
fn last_line(text: &str) -> Option<&str> {
    text.lines()
        .map(|line| line.rsplit('\r').next().unwrap_or(line))
        .rfind(|line| !line.trim().is_empty())
}

/// Remove CSI and OSC escape sequences.
pub(crate) fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\x1b' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('[') => {
                chars.next();
                // parameter and intermediate bytes, then one final byte
                while chars.next_if(|c| ('\x20'..='\x3f').contains(c)).is_some() {}
                chars.next_if(|c| ('\x40'..='\x7e').contains(c));
            }
            Some(']') => {
                chars.next();
                // terminated by BEL or ESC \
                while let Some(c) = chars.next() {
                    if c == '\x07' {
                        break;
                    }
                    if c == '\x1b' && chars.next_if_eq(&'\\').is_some() {
                        break;
                    }
                }
            }
            // two-byte sequences such as ESC =
            Some(_) => {
                chars.next();
            }
            None => {}
        }
    }
    out
}
