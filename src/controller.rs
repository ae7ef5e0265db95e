use std::time::Duration;
use tracing::trace;

use crate::domain::{Message, SVConfig, SVError};
use crate::model::Model;
use ratatui::crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &SVConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    /// Waits at most `event_poll_time` ms for an input event.
    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, SVError> {
        if !event::poll(Duration::from_millis(self.event_poll_time))? {
            return Ok(None);
        }
        let message = match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                if model.raw_keyevents() {
                    Some(Message::RawKey(key))
                } else {
                    self.handle_key(key)
                }
            }
            _ => None,
        };
        Ok(message)
    }

    fn handle_key(&self, key: KeyEvent) -> Option<Message> {
        let message = match key.code {
            KeyCode::Char('q') => Some(Message::Quit),
            KeyCode::Char('/') => Some(Message::Search),
            KeyCode::Esc => Some(Message::Exit),
            KeyCode::Char('?') => Some(Message::Help),
            KeyCode::Char('c') => Some(Message::NextCategory),
            KeyCode::Char('C') => Some(Message::PreviousCategory),
            KeyCode::Char('p') => Some(Message::NextPageSize),
            KeyCode::Char('P') => Some(Message::PreviousPageSize),
            KeyCode::Right | KeyCode::Char('n') | KeyCode::PageDown => Some(Message::NextPage),
            KeyCode::Left | KeyCode::Char('b') | KeyCode::PageUp => Some(Message::PreviousPage),
            KeyCode::Char('g') | KeyCode::Home => Some(Message::FirstPage),
            KeyCode::Char('G') | KeyCode::End => Some(Message::LastPage),
            KeyCode::Up | KeyCode::Char('k') => Some(Message::MoveUp),
            KeyCode::Down | KeyCode::Char('j') => Some(Message::MoveDown),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}
