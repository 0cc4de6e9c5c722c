//! Shell execution engine.
//!
//! Runs each request as a `bash` subprocess in its own process group,
//! streams its output back as engine events, and enforces the wall-clock
//! timeout. Stdout and stderr are read by independent tasks that funnel
//! into one channel per run; a single consumer owns the bounded transcript,
//! so lines within one stream stay ordered while interleaving between the
//! two streams is best-effort.

use std::collections::BTreeMap;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use hostadm_core::engine::{Engine, EngineCommand, EngineEvent};
use hostadm_core::error::ExecError;
use hostadm_core::exec::{ExecRequest, ExecStatus};
use hostadm_core::output::{OutputLine, OutputLog, OutputStream};
use hostadm_core::scripts::ScriptLibrary;
use hostadm_core::shell::{self, ResolvedCommand};

const KILL_GRACE: Duration = Duration::from_millis(500);
const DRAIN_GRACE: Duration = Duration::from_millis(500);

struct RunHandle {
    cancel: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

pub struct ShellEngine {
    scripts: Arc<ScriptLibrary>,
    running: BTreeMap<String, RunHandle>,
}

impl ShellEngine {
    pub fn new(scripts: Arc<ScriptLibrary>) -> Self {
        Self {
            scripts,
            running: BTreeMap::new(),
        }
    }

    fn spawn_run(&mut self, req: ExecRequest, event_tx: &mpsc::UnboundedSender<EngineEvent>) {
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let id = req.id.clone();
        let scripts = self.scripts.clone();
        let tx = event_tx.clone();
        tracing::debug!(id = %id, command = %req.command, "spawning run");
        let task = tokio::spawn(async move {
            run_one(req, scripts, cancel_rx, tx).await;
        });
        self.running.insert(
            id,
            RunHandle {
                cancel: Some(cancel_tx),
                task,
            },
        );
    }

    fn cancel_run(&mut self, id: &str) {
        if let Some(handle) = self.running.get_mut(id) {
            if let Some(cancel) = handle.cancel.take() {
                tracing::debug!(id = %id, "cancel requested");
                let _ = cancel.send(());
            }
        }
    }

    /// Kill everything still running and wait until every child is reaped.
    async fn shutdown_all(&mut self) {
        for handle in self.running.values_mut() {
            if let Some(cancel) = handle.cancel.take() {
                let _ = cancel.send(());
            }
        }
        for (_, handle) in std::mem::take(&mut self.running) {
            let _ = handle.task.await;
        }
    }
}

#[async_trait]
impl Engine for ShellEngine {
    async fn run(
        &mut self,
        mut command_rx: mpsc::Receiver<EngineCommand>,
        event_tx: mpsc::UnboundedSender<EngineEvent>,
    ) {
        while let Some(cmd) = command_rx.recv().await {
            match cmd {
                EngineCommand::Run { req } => self.spawn_run(req, &event_tx),
                EngineCommand::Cancel { id } => self.cancel_run(&id),
                EngineCommand::Shutdown => break,
            }
            self.running.retain(|_, handle| !handle.task.is_finished());
        }
        self.shutdown_all().await;
    }

    fn name(&self) -> &'static str {
        "shell"
    }
}

enum WaitEnd {
    Exited(std::process::ExitStatus),
    Cancelled,
    TimedOut,
    WaitErr(std::io::Error),
}

async fn run_one(
    req: ExecRequest,
    scripts: Arc<ScriptLibrary>,
    mut cancel_rx: oneshot::Receiver<()>,
    tx: mpsc::UnboundedSender<EngineEvent>,
) {
    let id = req.id.clone();

    let resolved = match shell::resolve(&req.command, &scripts) {
        Ok(resolved) => resolved,
        Err(err) => {
            finish_setup_error(&tx, &id, &err);
            return;
        }
    };

    let mut cmd = Command::new("bash");
    match &resolved {
        ResolvedCommand::Shell { line } => {
            cmd.arg("-c").arg(line);
            cmd.stdin(Stdio::null());
        }
        ResolvedCommand::Script { env, .. } => {
            cmd.arg("-s");
            cmd.stdin(Stdio::piped());
            for (key, value) in env {
                cmd.env(key, value);
            }
        }
    }
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    // New process group, so cancellation can take the whole tree down.
    #[cfg(unix)]
    unsafe {
        cmd.pre_exec(|| {
            libc::setsid();
            Ok(())
        });
    }

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(err) => {
            finish_setup_error(&tx, &id, &ExecError::Spawn(err));
            return;
        }
    };
    let pid = child.id();
    let pgid = pid.map(|p| p as i32).unwrap_or(-1);

    if let ResolvedCommand::Script { body, .. } = &resolved {
        if let Some(mut stdin) = child.stdin.take() {
            let body = body.clone();
            tokio::spawn(async move {
                let _ = stdin.write_all(body.as_bytes()).await;
                let _ = stdin.shutdown().await;
            });
        }
    }

    let _ = tx.send(EngineEvent::Started {
        id: id.clone(),
        command: req.command.clone(),
        description: req.description.clone(),
        pid,
    });

    let (line_tx, mut line_rx) = mpsc::unbounded_channel::<(OutputStream, String)>();
    let mut readers: Vec<JoinHandle<()>> = [
        spawn_reader(child.stdout.take(), OutputStream::Stdout, line_tx.clone()),
        spawn_reader(child.stderr.take(), OutputStream::Stderr, line_tx),
    ]
    .into_iter()
    .flatten()
    .collect();

    let mut transcript = OutputLog::new(req.max_lines);
    let deadline = tokio::time::sleep(req.timeout);
    tokio::pin!(deadline);
    let mut lines_open = true;

    let end = loop {
        tokio::select! {
            maybe = line_rx.recv(), if lines_open => {
                match maybe {
                    Some((stream, text)) => {
                        emit_line(&tx, &id, &mut transcript, stream, text);
                    }
                    None => lines_open = false,
                }
            }
            status = child.wait() => {
                break match status {
                    Ok(status) => WaitEnd::Exited(status),
                    Err(err) => WaitEnd::WaitErr(err),
                };
            }
            _ = &mut cancel_rx => break WaitEnd::Cancelled,
            _ = &mut deadline => break WaitEnd::TimedOut,
        }
    };

    match end {
        WaitEnd::Exited(status) => {
            drain_lines(&tx, &id, &mut transcript, &mut line_rx, &mut readers).await;
            let code = status.code();
            if status.success() {
                finish(&tx, &id, &transcript, ExecStatus::Success, Some(0), None);
            } else {
                let diag = match code {
                    Some(code) => format!("process exited with code {}", code),
                    None => "process terminated by signal".to_string(),
                };
                emit_line(&tx, &id, &mut transcript, OutputStream::System, diag);
                finish(
                    &tx,
                    &id,
                    &transcript,
                    ExecStatus::Failed { code },
                    code,
                    Some(match code {
                        Some(code) => format!("exit code {}", code),
                        None => "terminated by signal".to_string(),
                    }),
                );
            }
        }
        WaitEnd::Cancelled => {
            kill_group(pgid, &mut child).await;
            drain_lines(&tx, &id, &mut transcript, &mut line_rx, &mut readers).await;
            emit_line(
                &tx,
                &id,
                &mut transcript,
                OutputStream::System,
                "cancelled by operator".to_string(),
            );
            finish(
                &tx,
                &id,
                &transcript,
                ExecStatus::Cancelled,
                None,
                Some("cancelled".to_string()),
            );
        }
        WaitEnd::TimedOut => {
            kill_group(pgid, &mut child).await;
            drain_lines(&tx, &id, &mut transcript, &mut line_rx, &mut readers).await;
            let err = ExecError::Timeout {
                limit_secs: req.timeout.as_secs(),
            };
            emit_line(
                &tx,
                &id,
                &mut transcript,
                OutputStream::System,
                err.to_string(),
            );
            finish(
                &tx,
                &id,
                &transcript,
                ExecStatus::Failed { code: None },
                None,
                Some(err.to_string()),
            );
        }
        WaitEnd::WaitErr(err) => {
            kill_group(pgid, &mut child).await;
            drain_lines(&tx, &id, &mut transcript, &mut line_rx, &mut readers).await;
            let err = ExecError::Wait(err);
            finish(
                &tx,
                &id,
                &transcript,
                ExecStatus::Failed { code: None },
                None,
                Some(err.to_string()),
            );
        }
    }
}

fn spawn_reader<R>(
    pipe: Option<R>,
    stream: OutputStream,
    tx: mpsc::UnboundedSender<(OutputStream, String)>,
) -> Option<JoinHandle<()>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let pipe = pipe?;
    Some(tokio::spawn(async move {
        let mut lines = BufReader::new(pipe).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send((stream, line)).is_err() {
                break;
            }
        }
    }))
}

fn emit_line(
    tx: &mpsc::UnboundedSender<EngineEvent>,
    id: &str,
    transcript: &mut OutputLog,
    stream: OutputStream,
    text: String,
) {
    transcript.push(OutputLine::new(stream, text.clone()));
    let _ = tx.send(EngineEvent::Output {
        id: id.to_string(),
        stream,
        text,
    });
}

/// Collect whatever the readers still have buffered. A backgrounded
/// grandchild can inherit the pipes and hold them open past the child's
/// exit, so EOF is not guaranteed: after a short grace the reader tasks are
/// aborted, their senders drop, and the channel drains dry.
async fn drain_lines(
    tx: &mpsc::UnboundedSender<EngineEvent>,
    id: &str,
    transcript: &mut OutputLog,
    line_rx: &mut mpsc::UnboundedReceiver<(OutputStream, String)>,
    readers: &mut Vec<JoinHandle<()>>,
) {
    let grace = tokio::time::sleep(DRAIN_GRACE);
    tokio::pin!(grace);
    let mut waiting = true;
    loop {
        tokio::select! {
            maybe = line_rx.recv() => match maybe {
                Some((stream, text)) => emit_line(tx, id, transcript, stream, text),
                None => break,
            },
            _ = &mut grace, if waiting => {
                waiting = false;
                for reader in readers.drain(..) {
                    reader.abort();
                }
            }
        }
    }
}

fn finish(
    tx: &mpsc::UnboundedSender<EngineEvent>,
    id: &str,
    transcript: &OutputLog,
    status: ExecStatus,
    exit_code: Option<i32>,
    error: Option<String>,
) {
    tracing::debug!(id = %id, status = status.label(), exit_code, "run finished");
    let _ = tx.send(EngineEvent::Finished {
        id: id.to_string(),
        status,
        exit_code,
        output: transcript.joined(),
        error,
    });
}

fn finish_setup_error(tx: &mpsc::UnboundedSender<EngineEvent>, id: &str, err: &ExecError) {
    tracing::debug!(id = %id, error = %err, "setup failed");
    let empty = OutputLog::new(1);
    let _ = tx.send(EngineEvent::Finished {
        id: id.to_string(),
        status: ExecStatus::Failed { code: None },
        exit_code: None,
        output: empty.joined(),
        error: Some(err.to_string()),
    });
}

/// SIGTERM the process group, give it a moment, then SIGKILL, and reap.
async fn kill_group(pgid: i32, child: &mut Child) {
    #[cfg(unix)]
    if pgid > 0 {
        unsafe {
            libc::killpg(pgid, libc::SIGTERM);
        }
        if tokio::time::timeout(KILL_GRACE, child.wait()).await.is_err() {
            unsafe {
                libc::killpg(pgid, libc::SIGKILL);
            }
            let _ = child.wait().await;
        }
        return;
    }
    let _ = child.kill().await;
}
