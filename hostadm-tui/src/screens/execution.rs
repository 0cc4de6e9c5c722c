//! Live view of a single command run: status header plus scrollable output.

use std::cell::Cell;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};
use uuid::Uuid;

use hostadm_core::engine::EngineEvent;
use hostadm_core::exec::{ExecRequest, ExecStatus, Execution};
use hostadm_core::output::{OutputLine, OutputLog, OutputStream, ScrollState, classify_line};

use crate::message::{Cmd, Msg};
use crate::router::ScreenTarget;
use crate::screen::Screen;
use crate::theme::Theme;

pub struct ExecutionScreen {
    req: ExecRequest,
    exec: Execution,
    log: OutputLog,
    scroll: ScrollState,
    // Height of the output pane as of the last render, so key handling can
    // page by a full viewport.
    viewport: Cell<usize>,
}

impl ExecutionScreen {
    pub fn new(req: ExecRequest) -> Self {
        let exec = Execution::start(&req);
        let log = OutputLog::new(req.max_lines);
        Self {
            req,
            exec,
            log,
            scroll: ScrollState::new(),
            viewport: Cell::new(1),
        }
    }

    fn visible(&self) -> usize {
        self.viewport.get().max(1)
    }

    fn rerun(&mut self) -> Cmd {
        self.req.id = Uuid::new_v4().to_string();
        self.exec = Execution::start(&self.req);
        self.log = OutputLog::new(self.req.max_lines);
        self.scroll = ScrollState::new();
        tracing::debug!(id = %self.req.id, command = %self.req.command, "rerun");
        Cmd::Exec(self.req.clone())
    }

    fn on_event(&mut self, event: EngineEvent) -> Cmd {
        if event.id() != &self.req.id {
            tracing::debug!(id = %event.id(), "ignoring event for stale run");
            return Cmd::none();
        }
        match event {
            EngineEvent::Started { pid, .. } => {
                self.exec.pid = pid;
            }
            EngineEvent::Output { stream, text, .. } => {
                self.log.push(OutputLine::new(stream, text));
            }
            EngineEvent::Finished {
                status,
                exit_code,
                error,
                ..
            } => {
                self.exec.finish(status, exit_code);
                // Runtime failures already carry a System diagnostic from
                // the engine; only setup errors arrive with a bare reason.
                if let Some(reason) = error {
                    let already_noted = self
                        .log
                        .iter()
                        .any(|line| matches!(line.stream, OutputStream::System));
                    if !already_noted {
                        self.log.push(OutputLine::new(OutputStream::System, reason));
                    }
                }
                if self.log.is_empty() {
                    self.log
                        .push(OutputLine::new(OutputStream::System, "(no output)"));
                }
            }
        }
        Cmd::none()
    }

    fn on_key(&mut self, key: KeyEvent) -> Cmd {
        let total = self.log.len();
        let visible = self.visible();
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            if self.exec.status.is_active() {
                return Cmd::CancelExec(self.req.id.clone());
            }
            return Cmd::none();
        }
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.scroll.scroll_up(1, total, visible),
            KeyCode::Down | KeyCode::Char('j') => self.scroll.scroll_down(1, total, visible),
            KeyCode::PageUp => self.scroll.scroll_up(visible, total, visible),
            KeyCode::PageDown => self.scroll.scroll_down(visible, total, visible),
            KeyCode::Home => self.scroll.to_top(),
            KeyCode::End => self.scroll.to_tail(),
            KeyCode::Char('r') => {
                if self.exec.status.is_finished() {
                    return self.rerun();
                }
            }
            KeyCode::Esc => return Cmd::navigate(ScreenTarget::Home),
            KeyCode::Char('q') => return Cmd::quit(),
            _ => {}
        }
        Cmd::none()
    }
}

impl Screen for ExecutionScreen {
    fn title(&self) -> String {
        self.req.description.clone()
    }

    fn hints(&self) -> Vec<(&'static str, &'static str)> {
        if self.exec.status.is_active() {
            vec![("↑/↓", "scroll"), ("ctrl-c", "cancel"), ("esc", "back")]
        } else {
            vec![("↑/↓", "scroll"), ("r", "rerun"), ("esc", "back")]
        }
    }

    fn init(&mut self) -> Cmd {
        Cmd::Exec(self.req.clone())
    }

    fn update(&mut self, msg: Msg) -> Cmd {
        match msg {
            Msg::Exec(event) => self.on_event(event),
            Msg::Key(key) => self.on_key(key),
            _ => Cmd::none(),
        }
    }

    fn view(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(1)])
            .split(area);

        let mut header = vec![
            Span::styled(self.exec.status.icon(), theme.status(&self.exec.status)),
            Span::raw(" "),
            Span::styled(self.exec.status.label(), theme.status(&self.exec.status)),
            Span::raw("  "),
            Span::styled(self.exec.duration_str(), theme.text_dim()),
        ];
        if let Some(pid) = self.exec.pid {
            header.push(Span::styled(format!("  pid {pid}"), theme.text_dim()));
        }
        if let Some(code) = self.exec.exit_code {
            header.push(Span::styled(format!("  exit {code}"), theme.text_dim()));
        }
        let status = Paragraph::new(vec![
            Line::from(Span::styled(format!("$ {}", self.req.command), theme.text())),
            Line::from(header),
        ])
        .block(
            Block::default()
                .borders(Borders::BOTTOM)
                .border_style(theme.border()),
        );
        frame.render_widget(status, chunks[0]);

        let pane = chunks[1];
        let inner_height = pane.height.saturating_sub(2) as usize;
        self.viewport.set(inner_height);

        let total = self.log.len();
        let offset = self.scroll.offset(total, inner_height);
        let items: Vec<ListItem> = self
            .log
            .iter()
            .skip(offset)
            .take(inner_height)
            .map(|line| {
                ListItem::new(Span::styled(
                    line.text.clone(),
                    theme.output_line(line.stream, classify_line(&line.text)),
                ))
            })
            .collect();

        let position = if self.scroll.follow() {
            format!(" {total} lines ")
        } else {
            format!(" {}-{}/{} ", offset + 1, (offset + inner_height).min(total), total)
        };
        let list = List::new(items).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.border())
                .title(Span::styled(" output ", theme.text_dim()))
                .title_bottom(Span::styled(position, theme.text_dim())),
        );
        frame.render_widget(list, pane);
    }

    fn deinit(&mut self) -> Cmd {
        if self.exec.status.is_active() {
            return Cmd::CancelExec(self.req.id.clone());
        }
        Cmd::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req() -> ExecRequest {
        ExecRequest::new("run-1", "echo hi", "Echo")
    }

    fn finished(id: &str, status: ExecStatus) -> Msg {
        Msg::Exec(EngineEvent::Finished {
            id: id.to_string(),
            status,
            exit_code: Some(0),
            output: "hi".to_string(),
            error: None,
        })
    }

    #[test]
    fn events_for_other_runs_are_ignored() {
        let mut screen = ExecutionScreen::new(req());
        screen.update(finished("run-2", ExecStatus::Success));
        assert!(screen.exec.status.is_active());
        screen.update(finished("run-1", ExecStatus::Success));
        assert_eq!(screen.exec.status, ExecStatus::Success);
    }

    #[test]
    fn empty_run_gets_sentinel_line() {
        let mut screen = ExecutionScreen::new(req());
        screen.update(finished("run-1", ExecStatus::Success));
        assert_eq!(screen.log.len(), 1);
        assert_eq!(screen.log.iter().next().unwrap().text, "(no output)");
    }

    #[test]
    fn engine_diagnostic_is_not_repeated_on_failure() {
        let mut screen = ExecutionScreen::new(req());
        screen.update(Msg::Exec(EngineEvent::Output {
            id: "run-1".to_string(),
            stream: OutputStream::System,
            text: "process exited with code 3".to_string(),
        }));
        screen.update(Msg::Exec(EngineEvent::Finished {
            id: "run-1".to_string(),
            status: ExecStatus::Failed { code: Some(3) },
            exit_code: Some(3),
            output: "process exited with code 3".to_string(),
            error: Some("exit code 3".to_string()),
        }));
        let system_lines: Vec<&str> = screen
            .log
            .iter()
            .filter(|l| matches!(l.stream, OutputStream::System))
            .map(|l| l.text.as_str())
            .collect();
        assert_eq!(system_lines, vec!["process exited with code 3"]);
    }

    #[test]
    fn setup_error_reason_is_surfaced() {
        let mut screen = ExecutionScreen::new(req());
        screen.update(Msg::Exec(EngineEvent::Finished {
            id: "run-1".to_string(),
            status: ExecStatus::Failed { code: None },
            exit_code: None,
            output: "(no output)".to_string(),
            error: Some("embedded script not found: scripts/x.sh".to_string()),
        }));
        assert_eq!(screen.log.len(), 1);
        assert!(screen.log.iter().next().unwrap().text.contains("not found"));
    }

    #[test]
    fn deinit_cancels_while_running() {
        let mut screen = ExecutionScreen::new(req());
        match screen.deinit() {
            Cmd::CancelExec(id) => assert_eq!(id, "run-1"),
            other => panic!("expected cancel, got {:?}", other),
        }
        screen.update(finished("run-1", ExecStatus::Cancelled));
        assert!(matches!(screen.deinit(), Cmd::None));
    }

    #[test]
    fn rerun_assigns_a_fresh_id_and_resets_state() {
        let mut screen = ExecutionScreen::new(req());
        screen.update(Msg::Exec(EngineEvent::Output {
            id: "run-1".to_string(),
            stream: OutputStream::Stdout,
            text: "hi".to_string(),
        }));
        screen.update(finished("run-1", ExecStatus::Success));
        let cmd = screen.update(Msg::Key(KeyEvent::new(
            KeyCode::Char('r'),
            KeyModifiers::NONE,
        )));
        match cmd {
            Cmd::Exec(new_req) => {
                assert_ne!(new_req.id, "run-1");
                assert_eq!(new_req.command, "echo hi");
            }
            other => panic!("expected exec, got {:?}", other),
        }
        assert!(screen.log.is_empty());
        assert!(screen.exec.status.is_active());
    }

    #[test]
    fn ctrl_c_cancels_only_active_runs() {
        let mut screen = ExecutionScreen::new(req());
        let key = Msg::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(matches!(screen.update(key.clone()), Cmd::CancelExec(_)));
        screen.update(finished("run-1", ExecStatus::Success));
        assert!(matches!(screen.update(key), Cmd::None));
    }
}
