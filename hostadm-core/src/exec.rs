//! Execution model
//!
//! Types describing one subprocess invocation: the request that starts it,
//! its status, and the record tracked while it runs.

use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

/// Unique identifier for one execution (UUID string).
///
/// The id is assigned by whoever creates the [`ExecRequest`], so the
/// originating screen can match engine events against its own run and ignore
/// stale completions from a run it did not start.
pub type ExecId = String;

/// Wall-clock limit applied to every subprocess.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// Maximum output lines retained per execution; oldest lines are dropped.
pub const DEFAULT_MAX_LINES: usize = 1000;

/// A request for the engine to run one command.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecRequest {
    /// Correlation id, assigned by the requester.
    pub id: ExecId,
    /// Shell line, or embedded script reference with optional `KEY=VALUE`
    /// prefixes (see `shell::resolve`).
    pub command: String,
    /// Human description shown in the UI.
    pub description: String,
    /// Hard wall-clock limit for the subprocess.
    pub timeout: Duration,
    /// Output retention cap.
    pub max_lines: usize,
}

impl ExecRequest {
    pub fn new(
        id: impl Into<ExecId>,
        command: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            command: command.into(),
            description: description.into(),
            timeout: DEFAULT_TIMEOUT,
            max_lines: DEFAULT_MAX_LINES,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_lines(mut self, max_lines: usize) -> Self {
        self.max_lines = max_lines;
        self
    }
}

/// Status of an execution.
///
/// Transitions are monotone: `Running` moves to exactly one terminal state
/// and never back.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecStatus {
    Running,
    /// Exit code 0.
    Success,
    /// Non-zero exit, spawn failure, or timeout.
    Failed { code: Option<i32> },
    /// Killed on operator request.
    Cancelled,
}

impl ExecStatus {
    pub fn icon(&self) -> &'static str {
        match self {
            Self::Running => "●",
            Self::Success => "✓",
            Self::Failed { .. } => "✗",
            Self::Cancelled => "⊘",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed { .. } => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn is_finished(&self) -> bool {
        !self.is_active()
    }
}

/// The stateful record of one subprocess invocation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Execution {
    pub id: ExecId,
    pub command: String,
    pub description: String,
    pub status: ExecStatus,
    pub exit_code: Option<i32>,
    pub pid: Option<u32>,
    pub started_at: SystemTime,
    pub finished_at: Option<SystemTime>,
}

impl Execution {
    /// Begin tracking a run. The record starts `Running` immediately; the
    /// engine confirms with a `Started` event carrying the pid.
    pub fn start(req: &ExecRequest) -> Self {
        Self {
            id: req.id.clone(),
            command: req.command.clone(),
            description: req.description.clone(),
            status: ExecStatus::Running,
            exit_code: None,
            pid: None,
            started_at: SystemTime::now(),
            finished_at: None,
        }
    }

    /// Move to a terminal state. A second terminal transition, or an attempt
    /// to move back to `Running`, is ignored.
    pub fn finish(&mut self, status: ExecStatus, exit_code: Option<i32>) {
        if self.status.is_finished() || status.is_active() {
            return;
        }
        self.status = status;
        self.exit_code = exit_code;
        self.finished_at = Some(SystemTime::now());
    }

    pub fn duration(&self) -> Duration {
        let end = self.finished_at.unwrap_or_else(SystemTime::now);
        end.duration_since(self.started_at).unwrap_or_default()
    }

    /// Compact elapsed-time string for display ("4s", "2m08s").
    pub fn duration_str(&self) -> String {
        let secs = self.duration().as_secs();
        if secs < 60 {
            format!("{}s", secs)
        } else {
            format!("{}m{:02}s", secs / 60, secs % 60)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req() -> ExecRequest {
        ExecRequest::new("run-1", "echo hi", "test run")
    }

    #[test]
    fn request_defaults() {
        let r = req();
        assert_eq!(r.timeout, DEFAULT_TIMEOUT);
        assert_eq!(r.max_lines, DEFAULT_MAX_LINES);
    }

    #[test]
    fn starts_running() {
        let exec = Execution::start(&req());
        assert_eq!(exec.status, ExecStatus::Running);
        assert!(exec.exit_code.is_none());
        assert!(exec.finished_at.is_none());
    }

    #[test]
    fn finish_is_monotone() {
        let mut exec = Execution::start(&req());
        exec.finish(ExecStatus::Failed { code: Some(3) }, Some(3));
        assert_eq!(exec.status, ExecStatus::Failed { code: Some(3) });

        // A later terminal transition must not overwrite the first.
        exec.finish(ExecStatus::Success, Some(0));
        assert_eq!(exec.status, ExecStatus::Failed { code: Some(3) });
        assert_eq!(exec.exit_code, Some(3));
    }

    #[test]
    fn finish_rejects_running() {
        let mut exec = Execution::start(&req());
        exec.finish(ExecStatus::Running, None);
        assert_eq!(exec.status, ExecStatus::Running);
        assert!(exec.finished_at.is_none());

        exec.finish(ExecStatus::Cancelled, None);
        assert_eq!(exec.status, ExecStatus::Cancelled);
    }

    #[test]
    fn status_helpers() {
        assert!(ExecStatus::Running.is_active());
        assert!(ExecStatus::Success.is_finished());
        assert!(ExecStatus::Failed { code: None }.is_finished());
        assert_eq!(ExecStatus::Cancelled.label(), "cancelled");
    }
}
