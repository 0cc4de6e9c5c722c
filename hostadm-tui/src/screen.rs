use ratatui::Frame;
use ratatui::layout::Rect;

use crate::message::{Cmd, Msg};
use crate::theme::Theme;

/// A unit of UI state.
///
/// Screens are constructed by the router, receive `init` once, then a
/// stream of `update` calls, and are dropped after `deinit` when the router
/// swaps them out. `view` must be free of side effects: rendering twice with
/// no update in between produces the identical frame.
pub trait Screen: Send {
    fn title(&self) -> String;

    /// Key hints for the footer, as (key, action) pairs.
    fn hints(&self) -> Vec<(&'static str, &'static str)> {
        Vec::new()
    }

    fn init(&mut self) -> Cmd {
        Cmd::none()
    }

    fn update(&mut self, msg: Msg) -> Cmd;

    fn view(&self, frame: &mut Frame, area: Rect, theme: &Theme);

    /// Called before the screen is discarded. An execution screen uses this
    /// to cancel a run it still owns so no subprocess outlives its screen.
    fn deinit(&mut self) -> Cmd {
        Cmd::none()
    }
}
