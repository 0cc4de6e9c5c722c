//! Command resolution.
//!
//! A command string is either a literal shell line (run via `bash -c`) or a
//! reference to an embedded script (`scripts/<name>.sh`, body piped to
//! `bash -s`), optionally preceded by `KEY=VALUE` assignments that become the
//! child's environment when a script is referenced. For literal lines the
//! assignments are left in place, since bash handles them natively.

use std::collections::BTreeMap;

use crate::error::ExecError;
use crate::scripts::ScriptLibrary;

/// Prefix that marks an embedded script reference.
pub const SCRIPT_PREFIX: &str = "scripts/";
/// Suffix required on embedded script references.
pub const SCRIPT_SUFFIX: &str = ".sh";

/// A command ready to hand to the process spawner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolvedCommand {
    /// Literal line for `bash -c`.
    Shell { line: String },
    /// Embedded script body for `bash -s` with extra environment.
    Script {
        name: String,
        body: String,
        env: BTreeMap<String, String>,
    },
}

fn is_env_assignment(token: &str) -> bool {
    let Some((key, _)) = token.split_once('=') else {
        return false;
    };
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Split leading `KEY=VALUE` tokens off a command string.
pub fn split_env_prefix(input: &str) -> (BTreeMap<String, String>, &str) {
    let mut env = BTreeMap::new();
    let mut rest = input.trim();
    while let Some(token) = rest.split_whitespace().next() {
        if !is_env_assignment(token) {
            break;
        }
        let (key, value) = token.split_once('=').unwrap_or((token, ""));
        env.insert(key.to_string(), value.to_string());
        rest = rest[token.len()..].trim_start();
    }
    (env, rest)
}

/// Whether a command (after env-prefix stripping) names an embedded script.
pub fn is_script_ref(command: &str) -> bool {
    command.starts_with(SCRIPT_PREFIX)
        && command.ends_with(SCRIPT_SUFFIX)
        && !command.contains(char::is_whitespace)
}

/// Embedded scripts assume Linux tooling; refuse to run them elsewhere.
/// Pulled out with an explicit `os` parameter so the gate is testable on any
/// host.
pub fn platform_gate(os: &str) -> Result<(), ExecError> {
    if os == "linux" {
        Ok(())
    } else {
        Err(ExecError::UnsupportedPlatform { os: os.to_string() })
    }
}

/// Resolve a raw command string against the script library.
///
/// Fails fast (before any spawn) on empty commands, unknown script
/// references, and non-Linux hosts attempting to run embedded scripts.
pub fn resolve(command: &str, scripts: &ScriptLibrary) -> Result<ResolvedCommand, ExecError> {
    let trimmed = command.trim();
    if trimmed.is_empty() {
        return Err(ExecError::EmptyCommand);
    }

    let (env, rest) = split_env_prefix(trimmed);
    if !is_script_ref(rest) {
        return Ok(ResolvedCommand::Shell {
            line: trimmed.to_string(),
        });
    }

    platform_gate(std::env::consts::OS)?;
    let body = scripts
        .get(rest)
        .ok_or_else(|| ExecError::ScriptNotFound {
            name: rest.to_string(),
        })?;
    Ok(ResolvedCommand::Script {
        name: rest.to_string(),
        body: body.to_string(),
        env,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lib() -> ScriptLibrary {
        ScriptLibrary::from_entries([("scripts/hello.sh", "echo hello\n")])
    }

    #[test]
    fn env_prefix_is_split_off() {
        let (env, rest) = split_env_prefix("SITE=example.com PORT=8080 scripts/hello.sh");
        assert_eq!(env.get("SITE").map(String::as_str), Some("example.com"));
        assert_eq!(env.get("PORT").map(String::as_str), Some("8080"));
        assert_eq!(rest, "scripts/hello.sh");
    }

    #[test]
    fn env_prefix_stops_at_first_non_assignment() {
        let (env, rest) = split_env_prefix("A=1 echo B=2");
        assert_eq!(env.len(), 1);
        assert_eq!(rest, "echo B=2");
    }

    #[test]
    fn script_ref_detection() {
        assert!(is_script_ref("scripts/hello.sh"));
        assert!(is_script_ref("scripts/nginx/enable-site.sh"));
        assert!(!is_script_ref("scripts/hello.sh --verbose"));
        assert!(!is_script_ref("echo scripts/hello.sh"));
        assert!(!is_script_ref("/usr/local/scripts/hello.sh"));
        assert!(!is_script_ref("scripts/hello"));
    }

    #[test]
    fn literal_lines_pass_through_untouched() {
        let cmd = resolve("SITE=x systemctl restart nginx", &lib()).unwrap();
        assert_eq!(
            cmd,
            ResolvedCommand::Shell {
                line: "SITE=x systemctl restart nginx".to_string()
            }
        );
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn script_refs_resolve_to_bodies() {
        let cmd = resolve("NAME=world scripts/hello.sh", &lib()).unwrap();
        match cmd {
            ResolvedCommand::Script { name, body, env } => {
                assert_eq!(name, "scripts/hello.sh");
                assert_eq!(body, "echo hello\n");
                assert_eq!(env.get("NAME").map(String::as_str), Some("world"));
            }
            other => panic!("expected script, got {:?}", other),
        }
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn unknown_script_is_a_setup_error() {
        let err = resolve("scripts/missing.sh", &lib()).unwrap_err();
        assert!(matches!(err, ExecError::ScriptNotFound { .. }));
        assert!(err.is_setup());
    }

    #[test]
    fn empty_command_is_rejected() {
        assert!(matches!(
            resolve("   ", &lib()),
            Err(ExecError::EmptyCommand)
        ));
    }

    #[test]
    fn gate_refuses_non_linux() {
        assert!(platform_gate("linux").is_ok());
        let err = platform_gate("macos").unwrap_err();
        assert!(matches!(err, ExecError::UnsupportedPlatform { .. }));
        assert!(err.to_string().contains("macos"));
    }
}
