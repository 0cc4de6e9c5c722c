use std::io;

use thiserror::Error;

/// Errors produced while preparing or running a command.
///
/// Setup errors (`EmptyCommand`, `ScriptNotFound`, `UnsupportedPlatform`,
/// `Spawn`) are reported before any output is captured. `Timeout` and `Wait`
/// are runtime failures.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("nothing to run: command is empty")]
    EmptyCommand,

    #[error(
        "embedded script not found: {name}. Run `hostadm scripts` to list the scripts bundled with this build."
    )]
    ScriptNotFound { name: String },

    #[error(
        "embedded admin scripts rely on Linux tooling (systemctl, /etc/passwd, ss) and cannot run on this host (detected OS: {os}). Run hostadm on the target server, or execute the equivalent commands by hand."
    )]
    UnsupportedPlatform { os: String },

    #[error("failed to start process: {0}")]
    Spawn(#[source] io::Error),

    #[error("command timed out after {limit_secs}s and was killed")]
    Timeout { limit_secs: u64 },

    #[error("failed waiting for process: {0}")]
    Wait(#[source] io::Error),
}

impl ExecError {
    /// Setup errors happen before a subprocess exists, so they carry no
    /// captured output.
    pub fn is_setup(&self) -> bool {
        matches!(
            self,
            Self::EmptyCommand
                | Self::ScriptNotFound { .. }
                | Self::UnsupportedPlatform { .. }
                | Self::Spawn(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_errors_are_flagged() {
        assert!(ExecError::EmptyCommand.is_setup());
        assert!(
            ExecError::ScriptNotFound {
                name: "scripts/x.sh".into()
            }
            .is_setup()
        );
        assert!(!ExecError::Timeout { limit_secs: 600 }.is_setup());
    }

    #[test]
    fn platform_error_names_the_os() {
        let err = ExecError::UnsupportedPlatform { os: "macos".into() };
        let text = err.to_string();
        assert!(text.contains("macos"));
        assert!(text.contains("Linux"));
    }
}
