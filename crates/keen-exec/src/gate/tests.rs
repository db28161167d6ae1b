//! Tests for the command gate

use super::*;

const TOKEN: &str = crate::config::DEFAULT_OVERRIDE_TOKEN;

fn gate() -> CommandGate {
    CommandGate::new()
}

fn rule_of(verdict: &Verdict) -> Option<&str> {
    match verdict {
        Verdict::Blocked { rule, .. } | Verdict::RequiresOverride { rule, .. } => Some(rule),
        Verdict::Allowed { .. } => None,
    }
}

#[test]
fn test_builtin_tables_compile() {
    let gate = gate();
    assert_eq!(gate.rules(RuleKind::Blocked).count(), BLOCKED_RULES.len());
    assert_eq!(
        gate.rules(RuleKind::Destructive).count(),
        DESTRUCTIVE_RULES.len()
    );
}

#[test]
fn test_plain_commands_allowed() {
    let gate = gate();
    for cmd in [
        "ls -la",
        "echo hello && pwd",
        "ps aux | grep node | head -20",
        "git status",
        "git push origin main",
        "rm notes.txt",
        "rm -f -v notes.txt",
        "cargo build --release",
        "python3 -c 'print(1)'",
    ] {
        assert_eq!(
            gate.classify(cmd),
            Verdict::Allowed {
                command: cmd.to_string(),
                overridden: false
            },
            "expected {cmd:?} to be allowed"
        );
    }
}

#[test]
fn test_blocked_regardless_of_token() {
    let gate = gate();
    for cmd in [
        "sed -i 's/a/b/' file.txt",
        "cat file | awk '{print $1}'",
        "sudo apt-get install foo",
        "echo hi; su root",
        "mkfs.ext4 /dev/sdb1",
        "dd if=/dev/zero of=/dev/sda bs=1M",
        "shutdown -h now",
        ":(){ :|:& };:",
    ] {
        let plain = gate.classify(cmd);
        assert!(
            matches!(plain, Verdict::Blocked { .. }),
            "{cmd:?} → {plain:?}"
        );
        let with_token = gate.classify(&format!("{cmd} {TOKEN}"));
        assert!(
            matches!(with_token, Verdict::Blocked { .. }),
            "{cmd:?} with token → {with_token:?}"
        );
    }
}

#[test]
fn test_blocked_takes_precedence_over_destructive() {
    let verdict = gate().classify("sudo rm -rf /var/cache");
    assert_eq!(rule_of(&verdict), Some("privilege-escalation"));
}

#[test]
fn test_destructive_requires_override() {
    let gate = gate();
    let cases = [
        ("rm -rf /tmp/x", "rm-recursive"),
        ("rm -r build/", "rm-recursive"),
        ("rm -Rf build/", "rm-recursive"),
        ("rm -f -r /x", "rm-recursive"),
        ("rm -v --recursive /x", "rm-recursive"),
        ("rm -i -v -R dist", "rm-recursive"),
        ("rm *.log", "rm-wildcard"),
        ("find . -name '*.o' -delete", "find-delete"),
        ("find /tmp -type f -exec rm {} +", "find-exec-rm"),
        ("git push --force origin main", "git-force-push"),
        ("git push origin main -f", "git-force-push"),
        ("git push origin +main", "git-force-push"),
        ("git pull --force", "git-force-pull"),
        ("git reset --hard HEAD~3", "git-reset-hard"),
        ("chmod -R 777 .", "recursive-permissions"),
        ("chown -v -R me:me .", "recursive-permissions"),
    ];
    for (cmd, tag) in cases {
        let verdict = gate.classify(cmd);
        assert!(
            matches!(verdict, Verdict::RequiresOverride { .. }),
            "{cmd:?} → {verdict:?}"
        );
        assert_eq!(rule_of(&verdict), Some(tag), "{cmd:?}");
    }
}

#[test]
fn test_override_token_strips_and_allows() {
    let gate = gate();
    let verdict = gate.classify(&format!("rm -rf /tmp/x {TOKEN}"));
    assert_eq!(
        verdict,
        Verdict::Allowed {
            command: "rm -rf /tmp/x".to_string(),
            overridden: true
        }
    );

    let verdict = gate.classify(&format!("rm {TOKEN} -rf /tmp/x"));
    match verdict {
        Verdict::Allowed {
            command,
            overridden,
        } => {
            assert!(overridden);
            assert!(!command.contains(TOKEN));
            assert!(command.starts_with("rm"));
            assert!(command.ends_with("-rf /tmp/x"));
        }
        other => panic!("unexpected verdict {other:?}"),
    }
}

#[test]
fn test_token_on_harmless_command_is_stripped() {
    let verdict = gate().classify(&format!("echo hi {TOKEN}"));
    assert_eq!(
        verdict,
        Verdict::Allowed {
            command: "echo hi".to_string(),
            overridden: false
        }
    );
}

#[test]
fn test_substring_false_positive_is_accepted() {
    // textual matching: a commit message mentioning sed is still blocked
    let verdict = gate().classify("git commit -m 'drop sed usage'");
    assert!(matches!(verdict, Verdict::Blocked { .. }));
    // but words merely containing the letters are not
    assert!(gate().classify("echo used").is_allowed());
    assert!(gate().classify("echo summary").is_allowed());
}

#[test]
fn test_configured_blocked_commands() {
    let config = ExecConfig::default().with_blocked_command("mv");
    let gate = CommandGate::from_config(&config).unwrap();
    assert!(matches!(
        gate.classify("mv a.txt b.txt"),
        Verdict::Blocked { .. }
    ));
    assert!(matches!(
        gate.classify("ls && mv a b"),
        Verdict::Blocked { .. }
    ));
    assert!(gate.classify("echo mvp").is_allowed());
    // whole-word match at any command position, so `git mv` is caught too
    assert!(!gate.classify("git mv a b").is_allowed());
}

#[test]
fn test_configured_override_token() {
    let config = ExecConfig {
        override_token: "--yes-really".to_string(),
        ..ExecConfig::default()
    };
    let gate = CommandGate::from_config(&config).unwrap();
    assert_eq!(gate.override_token(), "--yes-really");
    assert!(gate.classify("rm -rf out --yes-really").is_allowed());
    assert!(!gate.classify(&format!("rm -rf out {TOKEN}")).is_allowed());
}

#[test]
fn test_invalid_config_rejected() {
    let config = ExecConfig::default().with_blocked_command("   ");
    assert!(CommandGate::from_config(&config).is_err());

    let config = ExecConfig {
        override_token: String::new(),
        ..ExecConfig::default()
    };
    assert!(CommandGate::from_config(&config).is_err());
}

#[test]
fn test_verdict_reason() {
    let gate = gate();
    assert!(gate.classify("ls").reason().is_none());
    assert_eq!(
        gate.classify("rm -rf x").reason(),
        Some("recursive deletion")
    );
}
