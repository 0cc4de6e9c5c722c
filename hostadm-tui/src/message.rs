//! The message and command vocabulary of the runtime.
//!
//! Every state change in the UI is driven by a [`Msg`] delivered through the
//! dispatcher's mailbox, strictly in arrival order. Side effects are
//! described as [`Cmd`] values returned from a screen's `init`/`update` and
//! executed by the dispatcher off the main loop; each eventually yields at
//! most one `Msg` back into the mailbox. Commands never touch screen state
//! directly.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use crossterm::event::KeyEvent;
use uuid::Uuid;

use hostadm_core::engine::EngineEvent;
use hostadm_core::exec::{ExecId, ExecRequest};

use crate::router::ScreenTarget;

/// Periodic wakeups.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickKind {
    /// One-second heartbeat; keeps elapsed-time displays fresh.
    Second,
}

/// Snapshot of host vitals for the header bar.
#[derive(Clone, Debug)]
pub struct HostSample {
    pub hostname: String,
    pub cpu_pct: f32,
    pub mem_used: u64,
    pub mem_total: u64,
    pub load_one: f64,
}

/// One systemd unit as listed by `systemctl list-units`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnitEntry {
    pub name: String,
    pub description: String,
    pub active: String,
    pub sub: String,
}

#[derive(Clone, Debug)]
pub enum Msg {
    Key(KeyEvent),
    Resize { width: u16, height: u16 },
    /// Swap the active screen. Handled by the dispatcher, never by screens.
    Navigate(ScreenTarget),
    /// Execution engine event (started / output line / finished).
    Exec(EngineEvent),
    Tick(TickKind),
    Host(HostSample),
    ServicesLoaded(Result<Vec<UnitEntry>, String>),
    /// A background task panicked; the loop itself keeps going.
    TaskFailed { context: String },
}

pub type TaskFuture = Pin<Box<dyn Future<Output = Option<Msg>> + Send>>;

/// A deferred action returned from a screen.
pub enum Cmd {
    None,
    /// Stop the event loop and tear down.
    Quit,
    /// Re-enqueue a message at the back of the mailbox.
    Msg(Msg),
    /// Hand a run to the execution engine.
    Exec(ExecRequest),
    /// Ask the engine to kill a running execution.
    CancelExec(ExecId),
    /// Arbitrary async work producing at most one message.
    Task(TaskFuture),
    Batch(Vec<Cmd>),
}

impl Cmd {
    pub fn none() -> Self {
        Cmd::None
    }

    pub fn quit() -> Self {
        Cmd::Quit
    }

    pub fn msg(msg: Msg) -> Self {
        Cmd::Msg(msg)
    }

    pub fn navigate(target: ScreenTarget) -> Self {
        Cmd::Msg(Msg::Navigate(target))
    }

    pub fn task<F>(fut: F) -> Self
    where
        F: Future<Output = Option<Msg>> + Send + 'static,
    {
        Cmd::Task(Box::pin(fut))
    }

    pub fn batch(cmds: Vec<Cmd>) -> Self {
        let mut cmds: Vec<Cmd> = cmds
            .into_iter()
            .filter(|c| !matches!(c, Cmd::None))
            .collect();
        match cmds.len() {
            0 => Cmd::None,
            1 => cmds.remove(0),
            _ => Cmd::Batch(cmds),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Cmd::None)
    }
}

impl fmt::Debug for Cmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cmd::None => write!(f, "Cmd::None"),
            Cmd::Quit => write!(f, "Cmd::Quit"),
            Cmd::Msg(msg) => write!(f, "Cmd::Msg({:?})", msg),
            Cmd::Exec(req) => write!(f, "Cmd::Exec({})", req.id),
            Cmd::CancelExec(id) => write!(f, "Cmd::CancelExec({})", id),
            Cmd::Task(_) => write!(f, "Cmd::Task(..)"),
            Cmd::Batch(cmds) => f.debug_list().entries(cmds).finish(),
        }
    }
}

/// Build an [`ExecRequest`] with a fresh correlation id.
pub fn exec_request(command: impl Into<String>, description: impl Into<String>) -> ExecRequest {
    ExecRequest::new(Uuid::new_v4().to_string(), command, description)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_collapses_trivial_cases() {
        assert!(Cmd::batch(vec![]).is_none());
        assert!(Cmd::batch(vec![Cmd::None, Cmd::None]).is_none());
        assert!(matches!(
            Cmd::batch(vec![Cmd::None, Cmd::Quit]),
            Cmd::Quit
        ));
        assert!(matches!(
            Cmd::batch(vec![Cmd::Quit, Cmd::Quit]),
            Cmd::Batch(_)
        ));
    }

    #[test]
    fn exec_requests_get_unique_ids() {
        let a = exec_request("echo a", "a");
        let b = exec_request("echo b", "b");
        assert_ne!(a.id, b.id);
    }
}
