//! Home menu: built-in admin actions plus quick actions from the config.

use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

use hostadm_core::config::HostadmConfig;

use crate::message::{Cmd, Msg, exec_request};
use crate::router::ScreenTarget;
use crate::screen::Screen;
use crate::theme::Theme;

struct MenuEntry {
    label: String,
    detail: String,
    target: ScreenTarget,
}

pub struct HomeScreen {
    config: Arc<HostadmConfig>,
    entries: Vec<MenuEntry>,
    selected: usize,
}

impl HomeScreen {
    pub fn new(config: Arc<HostadmConfig>) -> Self {
        let mut entries = vec![
            MenuEntry {
                label: "Systemd services".to_string(),
                detail: "Browse units, view status, restart".to_string(),
                target: ScreenTarget::Services { preselect: None },
            },
            MenuEntry {
                label: "Service overview".to_string(),
                detail: "Running and failed services at a glance".to_string(),
                target: ScreenTarget::Execution(exec_request(
                    "scripts/service-summary.sh",
                    "Service overview",
                )),
            },
            MenuEntry {
                label: "System users".to_string(),
                detail: "Login-capable accounts on this host".to_string(),
                target: ScreenTarget::Execution(exec_request(
                    "scripts/list-users.sh",
                    "System users",
                )),
            },
            MenuEntry {
                label: "Disk usage".to_string(),
                detail: "Filesystems and heavy /var directories".to_string(),
                target: ScreenTarget::Execution(exec_request(
                    "scripts/disk-usage.sh",
                    "Disk usage",
                )),
            },
            MenuEntry {
                label: "Listening ports".to_string(),
                detail: "Sockets in listening state with owners".to_string(),
                target: ScreenTarget::Execution(exec_request(
                    "scripts/listening-ports.sh",
                    "Listening ports",
                )),
            },
        ];

        for action in &config.quick_actions {
            entries.push(MenuEntry {
                label: action.label.clone(),
                detail: action
                    .description
                    .clone()
                    .unwrap_or_else(|| action.command.clone()),
                target: ScreenTarget::Execution(exec_request(&action.command, &action.label)),
            });
        }

        Self {
            config,
            entries,
            selected: 0,
        }
    }

    fn move_selection(&mut self, delta: isize) {
        if self.entries.is_empty() {
            return;
        }
        let len = self.entries.len() as isize;
        let next = (self.selected as isize + delta).rem_euclid(len);
        self.selected = next as usize;
    }
}

impl Screen for HomeScreen {
    fn title(&self) -> String {
        self.config.title().to_string()
    }

    fn hints(&self) -> Vec<(&'static str, &'static str)> {
        vec![("↑/↓", "move"), ("enter", "open"), ("q", "quit")]
    }

    fn update(&mut self, msg: Msg) -> Cmd {
        let Msg::Key(KeyEvent { code, .. }) = msg else {
            return Cmd::none();
        };
        match code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.move_selection(-1);
                Cmd::none()
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.move_selection(1);
                Cmd::none()
            }
            KeyCode::Enter => match self.entries.get(self.selected) {
                Some(entry) => Cmd::navigate(entry.target.clone()),
                None => Cmd::none(),
            },
            KeyCode::Char('q') | KeyCode::Esc => Cmd::quit(),
            _ => Cmd::none(),
        }
    }

    fn view(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(2)])
            .split(area);

        let items: Vec<ListItem> = self
            .entries
            .iter()
            .map(|entry| {
                ListItem::new(Line::from(vec![
                    Span::styled("▸ ", theme.text_muted()),
                    Span::styled(entry.label.clone(), theme.text()),
                ]))
            })
            .collect();

        let mut state = ListState::default();
        state.select(Some(self.selected));

        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(theme.border())
                    .title(Span::styled(" actions ", theme.text_dim())),
            )
            .highlight_style(theme.selection());
        frame.render_stateful_widget(list, chunks[0], &mut state);

        let detail = self
            .entries
            .get(self.selected)
            .map(|e| e.detail.as_str())
            .unwrap_or("");
        frame.render_widget(
            Paragraph::new(Line::from(Span::styled(detail, theme.text_dim()))),
            chunks[1],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use hostadm_core::config::QuickAction;

    fn key(code: KeyCode) -> Msg {
        Msg::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn quick_actions_become_entries() {
        let config = HostadmConfig {
            title: Some("web-01".into()),
            quick_actions: vec![QuickAction {
                label: "Reload nginx".into(),
                command: "systemctl reload nginx".into(),
                description: None,
            }],
        };
        let screen = HomeScreen::new(Arc::new(config));
        assert_eq!(screen.title(), "web-01");
        assert!(screen.entries.iter().any(|e| e.label == "Reload nginx"));
    }

    #[test]
    fn enter_navigates_to_selected_entry() {
        let mut screen = HomeScreen::new(Arc::new(HostadmConfig::default()));
        let cmd = screen.update(key(KeyCode::Enter));
        match cmd {
            Cmd::Msg(Msg::Navigate(ScreenTarget::Services { preselect })) => {
                assert!(preselect.is_none());
            }
            other => panic!("expected navigate to services, got {:?}", other),
        }
    }

    #[test]
    fn selection_wraps() {
        let mut screen = HomeScreen::new(Arc::new(HostadmConfig::default()));
        screen.update(key(KeyCode::Up));
        assert_eq!(screen.selected, screen.entries.len() - 1);
        screen.update(key(KeyCode::Down));
        assert_eq!(screen.selected, 0);
    }
}
