//! The single-threaded message loop at the centre of the UI.
//!
//! Every input source (keyboard pump, engine event bridge, ticker, host
//! sampler, spawned tasks) funnels into one unbounded mailbox. The
//! dispatcher drains it strictly in arrival order, hands each message to the
//! active screen, runs the commands the screen returns, and redraws after
//! every message. Screens never see the mailbox and never perform I/O
//! themselves.

use ratatui::Frame;
use ratatui::Terminal;
use ratatui::backend::Backend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use tokio::sync::mpsc;

use hostadm_core::engine::EngineCommand;

use crate::message::{Cmd, HostSample, Msg};
use crate::router::{self, RouterCtx, ScreenTarget};
use crate::sampler::format_bytes;
use crate::screen::Screen;
use crate::theme::Theme;

pub struct Dispatcher {
    screen: Box<dyn Screen>,
    ctx: RouterCtx,
    theme: Theme,
    engine_tx: mpsc::Sender<EngineCommand>,
    msg_tx: mpsc::UnboundedSender<Msg>,
    host: Option<HostSample>,
    should_quit: bool,
}

impl Dispatcher {
    pub fn new(
        target: ScreenTarget,
        ctx: RouterCtx,
        engine_tx: mpsc::Sender<EngineCommand>,
        msg_tx: mpsc::UnboundedSender<Msg>,
    ) -> Self {
        let screen = router::build(target, &ctx);
        Self::with_screen(screen, ctx, engine_tx, msg_tx)
    }

    pub fn with_screen(
        screen: Box<dyn Screen>,
        ctx: RouterCtx,
        engine_tx: mpsc::Sender<EngineCommand>,
        msg_tx: mpsc::UnboundedSender<Msg>,
    ) -> Self {
        Self {
            screen,
            ctx,
            theme: Theme::default(),
            engine_tx,
            msg_tx,
            host: None,
            should_quit: false,
        }
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Drain the mailbox until `Cmd::Quit` or until every sender is gone,
    /// redrawing after each message.
    pub async fn run<B: Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
        msg_rx: &mut mpsc::UnboundedReceiver<Msg>,
    ) -> std::io::Result<()> {
        let init = self.screen.init();
        self.apply(init).await;
        terminal.draw(|frame| self.render(frame))?;

        while let Some(msg) = msg_rx.recv().await {
            self.handle(msg).await;
            if self.should_quit {
                break;
            }
            terminal.draw(|frame| self.render(frame))?;
        }
        Ok(())
    }

    /// Feed one message to the active screen. Navigation is intercepted
    /// here so screens only ever return it as a command.
    pub async fn handle(&mut self, msg: Msg) {
        match msg {
            Msg::Navigate(target) => {
                tracing::debug!(screen = target.label(), "navigate");
                let parting = self.screen.deinit();
                self.apply(parting).await;
                self.screen = router::build(target, &self.ctx);
                let init = self.screen.init();
                self.apply(init).await;
            }
            Msg::Host(sample) => {
                self.host = Some(sample);
            }
            Msg::TaskFailed { context } => {
                tracing::warn!(context, "background task panicked");
            }
            other => {
                let cmd = self.screen.update(other);
                self.apply(cmd).await;
            }
        }
    }

    /// Execute a command tree iteratively. Commands that produce a message
    /// post it back through the mailbox so ordering stays first-in
    /// first-out with everything else.
    pub async fn apply(&mut self, cmd: Cmd) {
        let mut stack = vec![cmd];
        while let Some(cmd) = stack.pop() {
            match cmd {
                Cmd::None => {}
                Cmd::Quit => self.should_quit = true,
                Cmd::Msg(msg) => {
                    let _ = self.msg_tx.send(msg);
                }
                Cmd::Exec(req) => {
                    if self.engine_tx.send(EngineCommand::Run { req }).await.is_err() {
                        tracing::warn!("engine command channel closed");
                    }
                }
                Cmd::CancelExec(id) => {
                    let _ = self.engine_tx.send(EngineCommand::Cancel { id }).await;
                }
                Cmd::Task(fut) => {
                    let tx = self.msg_tx.clone();
                    tokio::spawn(async move {
                        match tokio::spawn(fut).await {
                            Ok(Some(msg)) => {
                                let _ = tx.send(msg);
                            }
                            Ok(None) => {}
                            Err(err) => {
                                let _ = tx.send(Msg::TaskFailed {
                                    context: err.to_string(),
                                });
                            }
                        }
                    });
                }
                Cmd::Batch(cmds) => {
                    // Reverse so the batch executes in written order.
                    stack.extend(cmds.into_iter().rev());
                }
            }
        }
    }

    fn render(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(1),
                Constraint::Length(1),
            ])
            .split(frame.area());

        self.render_header(frame, chunks[0]);
        self.screen.view(frame, chunks[1], &self.theme);
        self.render_footer(frame, chunks[2]);
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let mut spans = vec![Span::styled(
            format!(" {} ", self.screen.title()),
            self.theme.title(),
        )];
        if let Some(host) = &self.host {
            spans.push(Span::styled(
                format!(
                    "  {}  cpu {:>4.1}%  mem {}/{}  load {:.2}",
                    host.hostname,
                    host.cpu_pct,
                    format_bytes(host.mem_used),
                    format_bytes(host.mem_total),
                    host.load_one,
                ),
                self.theme.text_dim(),
            ));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn render_footer(&self, frame: &mut Frame, area: Rect) {
        let mut spans = Vec::new();
        for (key, action) in self.screen.hints() {
            spans.push(Span::styled(format!(" {key} "), self.theme.key_hint()));
            spans.push(Span::styled(format!("{action}  "), self.theme.text_dim()));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }
}
