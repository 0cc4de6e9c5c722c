use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::exec::{ExecId, ExecRequest, ExecStatus};
use crate::output::OutputStream;

/// Commands accepted by an execution engine.
#[derive(Clone, Debug)]
pub enum EngineCommand {
    /// Start a new run.
    Run { req: ExecRequest },
    /// Kill a running execution and report it as cancelled.
    Cancel { id: ExecId },
    /// Kill everything still running and stop the engine loop.
    Shutdown,
}

/// Events emitted by an execution engine, correlated by [`ExecId`].
///
/// For every run the engine emits `Started` (unless setup fails), zero or
/// more `Output` lines, and exactly one `Finished`.
#[derive(Clone, Debug)]
pub enum EngineEvent {
    Started {
        id: ExecId,
        command: String,
        description: String,
        pid: Option<u32>,
    },
    Output {
        id: ExecId,
        stream: OutputStream,
        text: String,
    },
    Finished {
        id: ExecId,
        /// Terminal status: `Success`, `Failed` or `Cancelled`.
        status: ExecStatus,
        exit_code: Option<i32>,
        /// Joined bounded transcript, or the `(no output)` sentinel.
        output: String,
        error: Option<String>,
    },
}

impl EngineEvent {
    pub fn id(&self) -> &ExecId {
        match self {
            Self::Started { id, .. } | Self::Output { id, .. } | Self::Finished { id, .. } => id,
        }
    }
}

/// A pluggable execution backend.
///
/// Engines receive [`EngineCommand`]s on `command_rx` and emit
/// [`EngineEvent`]s on `event_tx`; the dispatcher is the single consumer of
/// the event side. `run` returns once `Shutdown` is received (or the command
/// channel closes) and every child process has been reaped.
#[async_trait]
pub trait Engine: Send {
    async fn run(
        &mut self,
        command_rx: mpsc::Receiver<EngineCommand>,
        event_tx: mpsc::UnboundedSender<EngineEvent>,
    );

    fn name(&self) -> &'static str;
}
