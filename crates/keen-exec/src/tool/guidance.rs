//! Help text returned when the gate rejects a command
//!
//! A bare "not allowed" teaches the caller nothing, so each rejection names
//! what was refused and what to do instead.

use crate::gate::Verdict;

/// Help text for a rejected command. `None` for an allowed verdict.
pub(crate) fn rejection_help(
    command: &str,
    verdict: &Verdict,
    override_token: &str,
) -> Option<String> {
    match verdict {
        Verdict::Allowed { .. } => None,
        Verdict::RequiresOverride { reason, .. } => Some(destructive_help(reason, override_token)),
        Verdict::Blocked { rule, reason } => Some(match rule.as_str() {
            "privilege-escalation" => privilege_help(command),
            "sed" => sed_help(command),
            "awk" => awk_help(command),
            _ => base_command_help(command, reason),
        }),
    }
}

fn destructive_help(reason: &str, token: &str) -> String {
    format!(
        "🚨 DESTRUCTIVE OPERATION BLOCKED ({reason})\n\n\
         This command requires explicit permission. Before running it:\n\
         1. Ask the user what specifically should be affected\n\
         2. Show them what the command will change\n\
         3. Get explicit confirmation\n\
         4. Add the flag: {token}\n\n\
         Example: rm {token} -rf /path/to/delete"
    )
}

fn privilege_help(command: &str) -> String {
    format!(
        "🚨 PRIVILEGED COMMAND BLOCKED\n\n\
         Commands that escalate privileges cannot be run from here.\n\n\
         The command:\n```bash\n{command}\n```\n\n\
         What to do:\n\
         1. Show the command to the user\n\
         2. If they approve, they can run it in their own terminal\n\
         3. Ask them for the result before continuing"
    )
}

fn sed_help(command: &str) -> String {
    let trimmed = command.trim();
    let reading = trimmed.contains(" -n ") || trimmed.contains("sed -n");
    let editing = trimmed.contains(" -i") || trimmed.contains("s/");

    let advice = if reading {
        "To extract a line range, read the file with an offset and length.\n\
         For quick previews run `head -50 FILE` or `tail -50 FILE`.\n\
         To assemble a file from pieces, redirect head/tail output:\n\
         `head -100 FILE > NEW` then `tail -50 FILE >> NEW`."
    } else if editing {
        "In-place edits should go through a targeted edit tool that replaces\n\
         an exact block of text and shows the resulting diff.\n\
         Search for the pattern first, then edit each occurrence."
    } else {
        "Read files with offset/length, edit with a targeted edit tool, and\n\
         search with a code search tool."
    };
    format!(
        "🚫 SED COMMAND BLOCKED\n\nYou tried: {trimmed}\n\n\
         Why: sed is blocked to prevent accidental file corruption.\n\n\
         Instead:\n{advice}"
    )
}

fn awk_help(command: &str) -> String {
    let trimmed = command.trim();
    let advice = if trimmed.contains("NR") {
        "To extract a line range, read the file with an offset and length.\n\
         For data processing write a small Python or Node script and pipe\n\
         the input through it."
    } else {
        "Read files with offset/length, write a script for data processing,\n\
         and use a code search tool for pattern matching."
    };
    format!(
        "🚫 AWK COMMAND BLOCKED\n\nYou tried: {trimmed}\n\n\
         Why: awk is blocked to prevent complex text processing errors.\n\n\
         Instead:\n{advice}"
    )
}

fn base_command_help(command: &str, reason: &str) -> String {
    let trimmed = command.trim();
    let base = trimmed
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();

    match base.as_str() {
        "rm" => format!(
            "🚫 RM COMMAND BLOCKED\n\nYou tried: {trimmed}\n\n\
             Why: deleting files is blocked by configuration.\n\n\
             Ask the user before deleting anything; if they approve they can\n\
             run it themselves. Build artifacts in a git repository can be\n\
             cleaned with `git clean -fdx`."
        ),
        "mv" => format!(
            "🚫 MV COMMAND BLOCKED\n\nYou tried: {trimmed}\n\n\
             Why: mv can overwrite files and is blocked by configuration.\n\n\
             Ask the user whether to move the file; if they approve they can\n\
             run it themselves. Inside a git repository suggest `git mv`."
        ),
        "chmod" | "chown" => format!(
            "🚫 {} COMMAND BLOCKED\n\nYou tried: {trimmed}\n\n\
             Why: permission changes can break system security.\n\n\
             Tell the user the exact command so they can run it manually.",
            base.to_ascii_uppercase()
        ),
        _ => format!(
            "🚫 COMMAND BLOCKED: {base}\n\nYou tried: {trimmed}\n\n\
             Why: {reason}.\n\n\
             Look for a safer alternative, or ask the user to run it manually."
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::CommandGate;

    const TOKEN: &str = crate::config::DEFAULT_OVERRIDE_TOKEN;

    fn help(command: &str) -> String {
        let gate = CommandGate::new();
        rejection_help(command, &gate.classify(command), TOKEN).unwrap()
    }

    #[test]
    fn test_allowed_has_no_help() {
        let verdict = CommandGate::new().classify("ls");
        assert!(rejection_help("ls", &verdict, TOKEN).is_none());
    }

    #[test]
    fn test_destructive_help_names_token() {
        let text = help("rm -rf build");
        assert!(text.contains("DESTRUCTIVE OPERATION BLOCKED"));
        assert!(text.contains("recursive deletion"));
        assert!(text.contains(&format!("rm {TOKEN} -rf")));
    }

    #[test]
    fn test_sed_help_variants() {
        assert!(help("sed -n '10,20p' file").contains("head -50"));
        assert!(help("sed -i 's/a/b/' file").contains("targeted edit tool"));
        assert!(help("sed file").contains("SED COMMAND BLOCKED"));
    }

    #[test]
    fn test_awk_help_variants() {
        assert!(help("awk 'NR>5' file").contains("line range"));
        assert!(help("cat f | awk '{print $1}'").contains("AWK COMMAND BLOCKED"));
    }

    #[test]
    fn test_privilege_help() {
        let text = help("sudo systemctl restart nginx");
        assert!(text.contains("PRIVILEGED COMMAND BLOCKED"));
        assert!(text.contains("sudo systemctl restart nginx"));
    }

    #[test]
    fn test_configured_block_help() {
        let verdict = Verdict::Blocked {
            rule: "mv".into(),
            reason: "'mv' is on the configured block list".into(),
        };
        let text = rejection_help("mv a b", &verdict, TOKEN).unwrap();
        assert!(text.contains("MV COMMAND BLOCKED"));
        assert!(text.contains("git mv"));

        let verdict = Verdict::Blocked {
            rule: "chown".into(),
            reason: "'chown' is on the configured block list".into(),
        };
        assert!(rejection_help("chown me f", &verdict, TOKEN)
            .unwrap()
            .contains("CHOWN COMMAND BLOCKED"));
    }

    #[test]
    fn test_default_help_carries_reason() {
        let text = help("mkfs.ext4 /dev/sdb1");
        assert!(text.contains("COMMAND BLOCKED: mkfs.ext4"));
        assert!(text.contains("irreversible"));
    }
}
