use std::fs::File;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::{Parser, Subcommand};
use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::sync::mpsc;

use hostadm_core::config::HostadmConfig;
use hostadm_core::engine::{Engine, EngineCommand, EngineEvent};
use hostadm_core::exec::ExecStatus;
use hostadm_core::output::OutputStream;
use hostadm_core::scripts::ScriptLibrary;

use hostadm_tui::dispatcher::Dispatcher;
use hostadm_tui::engine::ShellEngine;
use hostadm_tui::input::spawn_input;
use hostadm_tui::message::{Msg, TickKind, exec_request};
use hostadm_tui::router::{RouterCtx, ScreenTarget};
use hostadm_tui::sampler::spawn_sampler;

#[derive(Parser)]
#[command(name = "hostadm")]
#[command(about = "Interactive terminal dashboard for administering a Linux host", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the interactive dashboard (the default).
    Tui,
    /// Run one command through the execution engine and print its output.
    Exec {
        #[arg(required = true)]
        command: Vec<String>,
    },
    /// List the embedded admin scripts.
    Scripts,
}

/// Opt-in file logging: set HOSTADM_LOG to a path. Writing to the terminal
/// would fight the alternate screen, so there is no stderr fallback.
fn init_tracing() {
    let Ok(path) = std::env::var("HOSTADM_LOG") else {
        return;
    };
    let Ok(file) = File::create(&path) else {
        eprintln!("hostadm: cannot open log file {path}");
        return;
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("hostadm=debug"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Some(Commands::Exec { command }) => run_exec(command.join(" ")).await,
        Some(Commands::Scripts) => {
            let library = ScriptLibrary::builtin();
            for name in library.names() {
                println!("{name}");
            }
            Ok(())
        }
        Some(Commands::Tui) | None => run_tui().await,
    }
}

/// One-shot mode: run a single command, mirror its output to this terminal,
/// exit with the child's code.
async fn run_exec(command: String) -> io::Result<()> {
    let (engine_tx, engine_rx) = mpsc::channel::<EngineCommand>(100);
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<EngineEvent>();

    let mut engine = ShellEngine::new(Arc::new(ScriptLibrary::builtin()));
    let engine_task = tokio::spawn(async move {
        engine.run(engine_rx, event_tx).await;
    });

    let req = exec_request(command, "exec");
    let run_id = req.id.clone();
    engine_tx
        .send(EngineCommand::Run { req })
        .await
        .map_err(|_| io::Error::other("engine stopped"))?;

    let mut exit_code = 0;
    loop {
        tokio::select! {
            // The child sits in its own session, so the terminal's SIGINT
            // never reaches it. Forward the interrupt as a cancel and keep
            // draining until the engine reports the reap.
            _ = tokio::signal::ctrl_c() => {
                let _ = engine_tx
                    .send(EngineCommand::Cancel { id: run_id.clone() })
                    .await;
            }
            maybe = event_rx.recv() => {
                let Some(event) = maybe else { break };
                match event {
                    EngineEvent::Started { .. } => {}
                    EngineEvent::Output { stream, text, .. } => match stream {
                        OutputStream::Stdout => println!("{text}"),
                        OutputStream::Stderr | OutputStream::System => eprintln!("{text}"),
                    },
                    EngineEvent::Finished {
                        status,
                        exit_code: code,
                        error,
                        ..
                    } => {
                        if let Some(reason) = error {
                            eprintln!("hostadm: {reason}");
                        }
                        exit_code = final_exit_code(&status, code);
                        break;
                    }
                }
            }
        }
    }

    let _ = engine_tx.send(EngineCommand::Shutdown).await;
    let _ = engine_task.await;
    std::process::exit(exit_code);
}

/// Exit code for one-shot mode: the child's code, shell convention 130 for
/// an interrupted run, 1 when the child never produced a code.
fn final_exit_code(status: &ExecStatus, code: Option<i32>) -> i32 {
    match status {
        ExecStatus::Success => 0,
        ExecStatus::Cancelled => 130,
        _ => code.unwrap_or(1),
    }
}

fn setup_terminal() -> io::Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend)
}

fn restore_terminal(mut terminal: Terminal<CrosstermBackend<io::Stdout>>) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

async fn run_tui() -> io::Result<()> {
    let config = match HostadmConfig::discover() {
        Ok(Some((path, config))) => {
            tracing::info!(path = %path.display(), "loaded config");
            config
        }
        Ok(None) => HostadmConfig::default(),
        Err(err) => {
            eprintln!("hostadm: config error: {err}");
            std::process::exit(1);
        }
    };

    let (msg_tx, mut msg_rx) = mpsc::unbounded_channel::<Msg>();
    let (engine_tx, engine_rx) = mpsc::channel::<EngineCommand>(100);
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<EngineEvent>();

    let mut engine = ShellEngine::new(Arc::new(ScriptLibrary::builtin()));
    let engine_task = tokio::spawn(async move {
        engine.run(engine_rx, event_tx).await;
    });

    // Bridge engine events into the mailbox.
    let exec_tx = msg_tx.clone();
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            if exec_tx.send(Msg::Exec(event)).is_err() {
                break;
            }
        }
    });

    // One-second heartbeat for elapsed-time displays.
    let tick_tx = msg_tx.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        loop {
            interval.tick().await;
            if tick_tx.send(Msg::Tick(TickKind::Second)).is_err() {
                break;
            }
        }
    });

    spawn_sampler(msg_tx.clone());
    spawn_input(msg_tx.clone());

    let mut terminal = setup_terminal()?;
    let ctx = RouterCtx::new(config);
    let mut dispatcher = Dispatcher::new(ScreenTarget::Home, ctx, engine_tx.clone(), msg_tx);
    let result = dispatcher.run(&mut terminal, &mut msg_rx).await;
    restore_terminal(terminal)?;

    // Stop the engine and wait for every child to be reaped, then close the
    // mailbox so the blocking input pump notices and exits.
    let _ = engine_tx.send(EngineCommand::Shutdown).await;
    drop(msg_rx);
    let _ = engine_task.await;

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_shot_exit_codes_follow_shell_convention() {
        assert_eq!(final_exit_code(&ExecStatus::Success, Some(0)), 0);
        assert_eq!(
            final_exit_code(&ExecStatus::Failed { code: Some(3) }, Some(3)),
            3
        );
        assert_eq!(final_exit_code(&ExecStatus::Failed { code: None }, None), 1);
        assert_eq!(final_exit_code(&ExecStatus::Cancelled, None), 130);
    }
}
