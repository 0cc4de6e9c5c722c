//! Systemd service browser backed by `systemctl list-units`.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use tokio::process::Command;

use crate::message::{Cmd, Msg, UnitEntry, exec_request};
use crate::router::ScreenTarget;
use crate::screen::Screen;
use crate::theme::Theme;

enum LoadState {
    Loading,
    Loaded,
    Failed(String),
}

pub struct ServicesScreen {
    units: Vec<UnitEntry>,
    selected: usize,
    state: LoadState,
    preselect: Option<String>,
}

impl ServicesScreen {
    pub fn new(preselect: Option<String>) -> Self {
        Self {
            units: Vec::new(),
            selected: 0,
            state: LoadState::Loading,
            preselect,
        }
    }

    fn move_selection(&mut self, delta: isize) {
        if self.units.is_empty() {
            return;
        }
        let len = self.units.len() as isize;
        self.selected = (self.selected as isize + delta).rem_euclid(len) as usize;
    }

    fn selected_unit(&self) -> Option<&UnitEntry> {
        self.units.get(self.selected)
    }
}

async fn load_units() -> Result<Vec<UnitEntry>, String> {
    let output = Command::new("systemctl")
        .args([
            "list-units",
            "--type=service",
            "--all",
            "--output=json",
            "--no-pager",
        ])
        .output()
        .await
        .map_err(|err| format!("failed to run systemctl: {err}"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!(
            "systemctl exited with {:?}: {}",
            output.status.code(),
            stderr.trim()
        ));
    }

    parse_units(&output.stdout)
}

fn parse_units(raw: &[u8]) -> Result<Vec<UnitEntry>, String> {
    let value: serde_json::Value =
        serde_json::from_slice(raw).map_err(|err| format!("bad systemctl json: {err}"))?;
    let rows = value
        .as_array()
        .ok_or_else(|| "systemctl json is not an array".to_string())?;

    let mut units = Vec::with_capacity(rows.len());
    for row in rows {
        let field = |key: &str| row.get(key).and_then(|v| v.as_str()).unwrap_or("");
        let name = field("unit");
        if name.is_empty() {
            continue;
        }
        units.push(UnitEntry {
            name: name.to_string(),
            description: field("description").to_string(),
            active: field("active").to_string(),
            sub: field("sub").to_string(),
        });
    }
    units.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(units)
}

impl Screen for ServicesScreen {
    fn title(&self) -> String {
        "systemd services".to_string()
    }

    fn hints(&self) -> Vec<(&'static str, &'static str)> {
        vec![
            ("↑/↓", "move"),
            ("enter", "status"),
            ("r", "restart"),
            ("esc", "back"),
        ]
    }

    fn init(&mut self) -> Cmd {
        Cmd::task(async { Some(Msg::ServicesLoaded(load_units().await)) })
    }

    fn update(&mut self, msg: Msg) -> Cmd {
        match msg {
            Msg::ServicesLoaded(Ok(units)) => {
                self.units = units;
                self.state = LoadState::Loaded;
                if let Some(wanted) = self.preselect.take() {
                    if let Some(idx) = self.units.iter().position(|u| u.name == wanted) {
                        self.selected = idx;
                    }
                }
                self.selected = self.selected.min(self.units.len().saturating_sub(1));
                Cmd::none()
            }
            Msg::ServicesLoaded(Err(reason)) => {
                self.state = LoadState::Failed(reason);
                Cmd::none()
            }
            Msg::Key(KeyEvent { code, .. }) => match code {
                KeyCode::Up | KeyCode::Char('k') => {
                    self.move_selection(-1);
                    Cmd::none()
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    self.move_selection(1);
                    Cmd::none()
                }
                KeyCode::Enter => match self.selected_unit() {
                    Some(unit) => Cmd::navigate(ScreenTarget::Execution(exec_request(
                        format!("systemctl status --no-pager {}", unit.name),
                        format!("Status of {}", unit.name),
                    ))),
                    None => Cmd::none(),
                },
                KeyCode::Char('r') => match self.selected_unit() {
                    Some(unit) => Cmd::navigate(ScreenTarget::Execution(exec_request(
                        format!("systemctl restart {}", unit.name),
                        format!("Restart {}", unit.name),
                    ))),
                    None => Cmd::none(),
                },
                KeyCode::Esc => Cmd::navigate(ScreenTarget::Home),
                KeyCode::Char('q') => Cmd::quit(),
                _ => Cmd::none(),
            },
            _ => Cmd::none(),
        }
    }

    fn view(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(area);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(theme.border())
            .title(Span::styled(" units ", theme.text_dim()));

        match &self.state {
            LoadState::Loading => {
                frame.render_widget(
                    Paragraph::new(Span::styled("loading units...", theme.text_dim()))
                        .block(block),
                    chunks[0],
                );
            }
            LoadState::Failed(reason) => {
                frame.render_widget(
                    Paragraph::new(Span::styled(reason.clone(), theme.text_muted()))
                        .block(block),
                    chunks[0],
                );
            }
            LoadState::Loaded => {
                let items: Vec<ListItem> = self
                    .units
                    .iter()
                    .map(|unit| {
                        let state_style = if unit.active == "active" {
                            theme.text()
                        } else if unit.active == "failed" {
                            theme.text_muted()
                        } else {
                            theme.text_dim()
                        };
                        ListItem::new(Line::from(vec![
                            Span::styled(format!("{:<10}", unit.sub), state_style),
                            Span::styled(unit.name.clone(), theme.text()),
                        ]))
                    })
                    .collect();
                let mut state = ListState::default();
                state.select(Some(self.selected));
                let list = List::new(items)
                    .block(block)
                    .highlight_style(theme.selection());
                frame.render_stateful_widget(list, chunks[0], &mut state);
            }
        }

        let detail = self
            .selected_unit()
            .map(|u| format!("{} ({}/{})", u.description, u.active, u.sub))
            .unwrap_or_default();
        frame.render_widget(
            Paragraph::new(Span::styled(detail, theme.text_dim())),
            chunks[1],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn unit(name: &str) -> UnitEntry {
        UnitEntry {
            name: name.to_string(),
            description: String::new(),
            active: "active".to_string(),
            sub: "running".to_string(),
        }
    }

    #[test]
    fn parses_systemctl_json() {
        let raw = br#"[
            {"unit":"ssh.service","load":"loaded","active":"active","sub":"running","description":"OpenSSH server"},
            {"unit":"cron.service","load":"loaded","active":"active","sub":"running","description":"Scheduler"}
        ]"#;
        let units = parse_units(raw).unwrap();
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].name, "cron.service");
        assert_eq!(units[1].description, "OpenSSH server");
    }

    #[test]
    fn rejects_non_array_json() {
        assert!(parse_units(br#"{"unit":"x"}"#).is_err());
    }

    #[test]
    fn preselect_lands_on_named_unit() {
        let mut screen = ServicesScreen::new(Some("nginx.service".to_string()));
        screen.update(Msg::ServicesLoaded(Ok(vec![
            unit("cron.service"),
            unit("nginx.service"),
            unit("ssh.service"),
        ])));
        assert_eq!(screen.selected, 1);
    }

    #[test]
    fn load_failure_is_kept_for_display() {
        let mut screen = ServicesScreen::new(None);
        screen.update(Msg::ServicesLoaded(Err("no systemd here".to_string())));
        assert!(matches!(screen.state, LoadState::Failed(_)));
    }

    #[test]
    fn enter_targets_status_of_selected_unit() {
        let mut screen = ServicesScreen::new(None);
        screen.update(Msg::ServicesLoaded(Ok(vec![unit("nginx.service")])));
        let cmd = screen.update(Msg::Key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)));
        match cmd {
            Cmd::Msg(Msg::Navigate(ScreenTarget::Execution(req))) => {
                assert_eq!(req.command, "systemctl status --no-pager nginx.service");
            }
            other => panic!("expected execution target, got {:?}", other),
        }
    }
}
