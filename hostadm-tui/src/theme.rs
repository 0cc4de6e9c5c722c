//! Color palette and style helpers.

use ratatui::style::{Color, Modifier, Style};

use hostadm_core::exec::ExecStatus;
use hostadm_core::output::{OutputStream, Severity};

#[derive(Clone, Debug)]
pub struct Palette {
    pub text: Color,
    pub text_dim: Color,
    pub text_muted: Color,
    pub accent: Color,
    pub success: Color,
    pub warn: Color,
    pub error: Color,
    pub border: Color,
    pub selection_bg: Color,
    pub selection_fg: Color,
    pub key_hint: Color,
}

impl Palette {
    pub fn dark() -> Self {
        Self {
            text: Color::Rgb(214, 214, 214),
            text_dim: Color::Rgb(158, 158, 158),
            text_muted: Color::Rgb(105, 105, 105),
            accent: Color::Rgb(97, 175, 239),
            success: Color::Rgb(120, 200, 140),
            warn: Color::Rgb(229, 192, 123),
            error: Color::Rgb(224, 108, 117),
            border: Color::Rgb(70, 70, 70),
            selection_bg: Color::Rgb(45, 75, 110),
            selection_fg: Color::White,
            key_hint: Color::Rgb(198, 146, 120),
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::dark()
    }
}

#[derive(Clone, Debug, Default)]
pub struct Theme {
    pub palette: Palette,
}

impl Theme {
    pub fn text(&self) -> Style {
        Style::default().fg(self.palette.text)
    }

    pub fn text_dim(&self) -> Style {
        Style::default().fg(self.palette.text_dim)
    }

    pub fn text_muted(&self) -> Style {
        Style::default().fg(self.palette.text_muted)
    }

    pub fn title(&self) -> Style {
        Style::default()
            .fg(self.palette.accent)
            .add_modifier(Modifier::BOLD)
    }

    pub fn border(&self) -> Style {
        Style::default().fg(self.palette.border)
    }

    pub fn key_hint(&self) -> Style {
        Style::default().fg(self.palette.key_hint)
    }

    pub fn selection(&self) -> Style {
        Style::default()
            .bg(self.palette.selection_bg)
            .fg(self.palette.selection_fg)
    }

    pub fn status(&self, status: &ExecStatus) -> Style {
        let color = match status {
            ExecStatus::Running => self.palette.accent,
            ExecStatus::Success => self.palette.success,
            ExecStatus::Failed { .. } => self.palette.error,
            ExecStatus::Cancelled => self.palette.warn,
        };
        Style::default().fg(color)
    }

    /// Style for one captured output line. Severity sniffing wins over
    /// stream origin for coloring; the stream still picks the neutral tone.
    pub fn output_line(&self, stream: OutputStream, severity: Severity) -> Style {
        match severity {
            Severity::Error => Style::default().fg(self.palette.error),
            Severity::Warning => Style::default().fg(self.palette.warn),
            Severity::Normal => match stream {
                OutputStream::Stdout => self.text(),
                OutputStream::Stderr => self.text_dim(),
                OutputStream::System => self.text_muted().add_modifier(Modifier::ITALIC),
            },
        }
    }
}
