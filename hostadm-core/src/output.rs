//! Bounded output log and scroll state for an execution.

use std::collections::VecDeque;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Shown in place of a transcript when a run produced nothing.
pub const NO_OUTPUT: &str = "(no output)";

/// Which stream a captured line came from.
///
/// Stdout and stderr are read by independent tasks; order is guaranteed
/// within one stream only, interleaving between the two is best-effort.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputStream {
    Stdout,
    Stderr,
    /// Diagnostics emitted by hostadm itself (exit codes, cancellations).
    System,
}

#[derive(Clone, Debug)]
pub struct OutputLine {
    pub at: SystemTime,
    pub stream: OutputStream,
    pub text: String,
}

impl OutputLine {
    pub fn new(stream: OutputStream, text: impl Into<String>) -> Self {
        Self {
            at: SystemTime::now(),
            stream,
            text: text.into(),
        }
    }
}

/// Ring buffer of captured output lines.
///
/// The cap is enforced after every push, so `len() <= cap` holds at all
/// times and the retained lines are always the most recent ones.
#[derive(Clone, Debug)]
pub struct OutputLog {
    cap: usize,
    lines: VecDeque<OutputLine>,
}

impl OutputLog {
    pub fn new(cap: usize) -> Self {
        Self {
            cap: cap.max(1),
            lines: VecDeque::new(),
        }
    }

    pub fn push(&mut self, line: OutputLine) {
        self.lines.push_back(line);
        while self.lines.len() > self.cap {
            self.lines.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn iter(&self) -> impl Iterator<Item = &OutputLine> {
        self.lines.iter()
    }

    /// The transcript as one string, or the [`NO_OUTPUT`] sentinel.
    pub fn joined(&self) -> String {
        if self.lines.is_empty() {
            return NO_OUTPUT.to_string();
        }
        let mut out = String::new();
        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(&line.text);
        }
        out
    }
}

/// Rough severity of an output line, sniffed from its content.
///
/// Used only for display coloring; the authoritative origin of a line is its
/// [`OutputStream`] tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Normal,
    Warning,
    Error,
}

pub fn classify_line(text: &str) -> Severity {
    let lower = text.to_lowercase();
    if lower.contains("error")
        || lower.contains("fatal")
        || lower.contains("panic")
        || lower.contains("failed")
    {
        return Severity::Error;
    }
    if lower.contains("warn") || lower.contains("deprecat") {
        return Severity::Warning;
    }
    Severity::Normal
}

/// Scroll position over an [`OutputLog`].
///
/// `offset` is the index of the first visible line and is always clamped to
/// `[0, max(0, len - visible)]`. While `follow` is set the view sticks to the
/// tail; any manual scroll up disengages it.
#[derive(Clone, Copy, Debug)]
pub struct ScrollState {
    offset: usize,
    follow: bool,
}

impl Default for ScrollState {
    fn default() -> Self {
        Self {
            offset: 0,
            follow: true,
        }
    }
}

impl ScrollState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn follow(&self) -> bool {
        self.follow
    }

    fn max_offset(total: usize, visible: usize) -> usize {
        total.saturating_sub(visible)
    }

    /// First visible line for the current state, clamped.
    pub fn offset(&self, total: usize, visible: usize) -> usize {
        let max = Self::max_offset(total, visible);
        if self.follow { max } else { self.offset.min(max) }
    }

    pub fn scroll_up(&mut self, n: usize, total: usize, visible: usize) {
        // Leaving the tail pins the view.
        self.offset = self.offset(total, visible).saturating_sub(n);
        self.follow = false;
    }

    pub fn scroll_down(&mut self, n: usize, total: usize, visible: usize) {
        let max = Self::max_offset(total, visible);
        self.offset = (self.offset(total, visible) + n).min(max);
        if self.offset == max {
            self.follow = true;
        }
    }

    pub fn to_top(&mut self) {
        self.offset = 0;
        self.follow = false;
    }

    /// Jump to the tail and re-engage following.
    pub fn to_tail(&mut self) {
        self.follow = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str) -> OutputLine {
        OutputLine::new(OutputStream::Stdout, text)
    }

    #[test]
    fn cap_enforced_after_every_push() {
        let mut log = OutputLog::new(3);
        for i in 1..=10 {
            log.push(line(&format!("l{}", i)));
            assert!(log.len() <= 3);
        }
        let texts: Vec<_> = log.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["l8", "l9", "l10"]);
    }

    #[test]
    fn retains_most_recent_thousand_of_1500() {
        let mut log = OutputLog::new(1000);
        for i in 1..=1500 {
            log.push(line(&format!("line-{}", i)));
        }
        assert_eq!(log.len(), 1000);
        assert_eq!(log.iter().next().unwrap().text, "line-501");
        assert_eq!(log.iter().last().unwrap().text, "line-1500");
    }

    #[test]
    fn joined_uses_sentinel_when_empty() {
        let log = OutputLog::new(10);
        assert_eq!(log.joined(), NO_OUTPUT);

        let mut log = OutputLog::new(10);
        log.push(line("a"));
        log.push(line("b"));
        assert_eq!(log.joined(), "a\nb");
    }

    #[test]
    fn classify_sniffs_content() {
        assert_eq!(classify_line("ERROR: no such unit"), Severity::Error);
        assert_eq!(classify_line("job failed"), Severity::Error);
        assert_eq!(classify_line("warning: deprecated"), Severity::Warning);
        assert_eq!(classify_line("GET /health 200"), Severity::Normal);
    }

    #[test]
    fn offset_is_clamped() {
        let mut s = ScrollState::new();
        // Following sticks to the tail.
        assert_eq!(s.offset(100, 20), 80);
        assert_eq!(s.offset(10, 20), 0);

        s.scroll_up(15, 100, 20);
        assert!(!s.follow());
        assert_eq!(s.offset(100, 20), 65);

        // Shrinking the log keeps the offset in range.
        assert_eq!(s.offset(30, 20), 10);
        assert_eq!(s.offset(5, 20), 0);
    }

    #[test]
    fn scroll_down_to_tail_reengages_follow() {
        let mut s = ScrollState::new();
        s.scroll_up(50, 100, 20);
        assert!(!s.follow());

        s.scroll_down(10, 100, 20);
        assert!(!s.follow());

        s.scroll_down(1000, 100, 20);
        assert!(s.follow());
        assert_eq!(s.offset(100, 20), 80);
    }

    #[test]
    fn end_key_jumps_to_tail() {
        let mut s = ScrollState::new();
        s.to_top();
        assert_eq!(s.offset(100, 20), 0);
        s.to_tail();
        assert!(s.follow());
        assert_eq!(s.offset(100, 20), 80);
    }
}
