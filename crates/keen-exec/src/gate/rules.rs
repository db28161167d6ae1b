//! Rule tables for the command gate
//!
//! Patterns are matched against the raw command text, not a shell parse.
//! `(?:^|[\s;&|(`])` anchors a pattern to a command position, and
//! `(?:-\S+\s+)*` lets a flag sit anywhere in a leading run of options.

/// A rule before compilation.
pub(crate) struct RuleSpec {
    pub tag: &'static str,
    pub pattern: &'static str,
    pub reason: &'static str,
}

// ── Unconditional Blocks ───────────────────────────────────────────────────

/// Tools that never run, override token or not.
pub(crate) const BLOCKED_RULES: &[RuleSpec] = &[
    RuleSpec {
        tag: "sed",
        pattern: r"\bsed\b",
        reason: "sed can corrupt files in place",
    },
    RuleSpec {
        tag: "awk",
        pattern: r"\b[gmn]?awk\b",
        reason: "awk text processing is error-prone on source files",
    },
    RuleSpec {
        tag: "privilege-escalation",
        pattern: r"(?:^|[\s;&|(`])(?:sudo|su|doas|pkexec)(?:\s|$)",
        reason: "privilege escalation requires the user to run the command",
    },
    RuleSpec {
        tag: "disk-format",
        pattern: r"(?:^|[\s;&|(`])(?:mkfs(?:\.\w+)?|fdisk|sfdisk|parted|wipefs)(?:\s|$)",
        reason: "disk partitioning and formatting are irreversible",
    },
    RuleSpec {
        tag: "raw-device-write",
        pattern: r"\bdd\b.*\bof=/dev/",
        reason: "writing to a raw device is irreversible",
    },
    RuleSpec {
        tag: "power-control",
        pattern: r"(?:^|[\s;&|(`])(?:shutdown|reboot|poweroff|halt)(?:\s|$)",
        reason: "power control would stop the host",
    },
    RuleSpec {
        tag: "fork-bomb",
        pattern: r":\(\)\s*\{\s*:\s*\|\s*:\s*&\s*\}",
        reason: "fork bombs exhaust the process table",
    },
];

// ── Destructive Patterns ───────────────────────────────────────────────────

/// Operations that need the override token.
pub(crate) const DESTRUCTIVE_RULES: &[RuleSpec] = &[
    RuleSpec {
        tag: "rm-recursive",
        pattern: r"\brm\s+(?:-\S+\s+)*(?:-[a-zA-Z]*[rR][a-zA-Z]*|--recursive)(?:\s|$)",
        reason: "recursive deletion",
    },
    RuleSpec {
        tag: "rm-wildcard",
        pattern: r"\brm\s+.*\*",
        reason: "wildcard deletion",
    },
    RuleSpec {
        tag: "find-delete",
        pattern: r"\bfind\s+.*-delete\b",
        reason: "bulk find-and-delete",
    },
    RuleSpec {
        tag: "find-exec-rm",
        pattern: r"\bfind\s+.*-exec(?:dir)?\s+rm\b",
        reason: "bulk find-and-delete",
    },
    RuleSpec {
        tag: "git-force-push",
        pattern: r"\bgit\s+push\b.*(?:\s--force(?:-with-lease)?\b|\s-f\b|\s\+\S)",
        reason: "forced push rewrites remote history",
    },
    RuleSpec {
        tag: "git-force-pull",
        pattern: r"\bgit\s+pull\b.*\s(?:--force|-f)\b",
        reason: "forced pull discards local history",
    },
    RuleSpec {
        tag: "git-reset-hard",
        pattern: r"\bgit\s+reset\s+.*--hard\b",
        reason: "hard reset discards uncommitted work",
    },
    RuleSpec {
        tag: "recursive-permissions",
        pattern: r"\bch(?:mod|own|grp)\s+(?:-\S+\s+)*(?:-[a-zA-Z]*R[a-zA-Z]*|--recursive)\b",
        reason: "recursive permission or ownership change",
    },
];
