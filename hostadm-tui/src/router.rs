//! Screen routing.
//!
//! Navigation targets are a closed sum type: each destination names the
//! payload it expects, so the router constructs screens with validated data
//! instead of handing them an untyped blob. Swapping always builds a fresh
//! screen and discards the old one; there is no central history stack.

use std::sync::Arc;

use hostadm_core::config::HostadmConfig;
use hostadm_core::exec::ExecRequest;

use crate::screen::Screen;
use crate::screens::execution::ExecutionScreen;
use crate::screens::home::HomeScreen;
use crate::screens::services::ServicesScreen;

/// Where to navigate, with the typed payload the destination expects.
#[derive(Clone, Debug)]
pub enum ScreenTarget {
    Home,
    /// Systemd unit browser. `preselect: None` starts at the top of the
    /// list.
    Services { preselect: Option<String> },
    /// Run a command and watch its output.
    Execution(ExecRequest),
}

impl ScreenTarget {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Services { .. } => "services",
            Self::Execution(_) => "execution",
        }
    }
}

/// Shared data screens are constructed with.
#[derive(Clone)]
pub struct RouterCtx {
    pub config: Arc<HostadmConfig>,
}

impl RouterCtx {
    pub fn new(config: HostadmConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

/// Construct a fresh screen for a navigation target.
pub fn build(target: ScreenTarget, ctx: &RouterCtx) -> Box<dyn Screen> {
    match target {
        ScreenTarget::Home => Box::new(HomeScreen::new(ctx.config.clone())),
        ScreenTarget::Services { preselect } => Box::new(ServicesScreen::new(preselect)),
        ScreenTarget::Execution(req) => Box::new(ExecutionScreen::new(req)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_every_target() {
        let ctx = RouterCtx::new(HostadmConfig::default());
        assert_eq!(build(ScreenTarget::Home, &ctx).title(), "hostadm");

        // Absent payload falls back to a safe default, not a crash.
        let screen = build(ScreenTarget::Services { preselect: None }, &ctx);
        assert!(screen.title().contains("services"));
    }
}
