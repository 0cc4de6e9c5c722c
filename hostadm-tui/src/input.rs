//! Terminal input pump.
//!
//! Crossterm reads are blocking, so they run on the blocking pool and feed
//! the dispatcher's mailbox like every other message producer. The pump
//! exits once the mailbox receiver is gone.

use std::time::Duration;

use crossterm::event::{self, Event as CEvent, KeyEventKind};
use tokio::sync::mpsc::UnboundedSender;

use crate::message::Msg;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub fn spawn_input(tx: UnboundedSender<Msg>) {
    tokio::task::spawn_blocking(move || {
        loop {
            if tx.is_closed() {
                break;
            }
            match event::poll(POLL_INTERVAL) {
                Ok(false) => continue,
                Ok(true) => {}
                Err(_) => break,
            }
            let msg = match event::read() {
                Ok(CEvent::Key(key)) if key.kind != KeyEventKind::Release => Msg::Key(key),
                Ok(CEvent::Resize(width, height)) => Msg::Resize { width, height },
                Ok(_) => continue,
                Err(_) => break,
            };
            if tx.send(msg).is_err() {
                break;
            }
        }
    });
}
