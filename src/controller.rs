use std::time::Duration;
use tracing::trace;

use crate::domain::{Message, TFConfig, TFError};
use crate::model::Model;
use ratatui::crossterm::event::{self, Event, KeyCode};

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &TFConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, TFError> {
        if event::poll(Duration::from_millis(self.event_poll_time))? {
            match event::read()? {
                Event::Key(key) if key.kind == event::KeyEventKind::Press => {
                    if model.raw_keyevents() {
                        return Ok(Some(Message::RawKey(key)));
                    }
                    return Ok(self.handle_key(key));
                }
                Event::Resize(width, height) => {
                    return Ok(Some(Message::Resize(width as usize, height as usize)));
                }
                _ => {}
            }
        }
        Ok(None)
    }

    fn handle_key(&self, key: event::KeyEvent) -> Option<Message> {
        let message = match key.code {
            KeyCode::Char('q') => Some(Message::Quit),
            KeyCode::Down | KeyCode::Char('j') => Some(Message::MoveDown),
            KeyCode::Up | KeyCode::Char('k') => Some(Message::MoveUp),
            KeyCode::Left | KeyCode::Char('h') => Some(Message::MoveLeft),
            KeyCode::Right | KeyCode::Char('l') => Some(Message::MoveRight),
            KeyCode::PageDown => Some(Message::MovePageDown),
            KeyCode::PageUp => Some(Message::MovePageUp),
            KeyCode::Home | KeyCode::Char('g') => Some(Message::MoveBeginning),
            KeyCode::End | KeyCode::Char('G') => Some(Message::MoveEnd),
            KeyCode::Char('0') => Some(Message::MoveToFirstColumn),
            KeyCode::Char('$') => Some(Message::MoveToLastColumn),
            KeyCode::Char('/') => Some(Message::Filter),
            KeyCode::Char('!') => Some(Message::NegatedFilter),
            KeyCode::Tab => Some(Message::FocusFilters),
            KeyCode::Char(' ') => Some(Message::ToggleFilter),
            KeyCode::Char('d') | KeyCode::Delete => Some(Message::RemoveFilter),
            KeyCode::Char('x') => Some(Message::ClearFilters),
            KeyCode::Char('s') => Some(Message::SortAscending),
            KeyCode::Char('S') => Some(Message::SortDescending),
            KeyCode::Char('u') => Some(Message::Unsort),
            KeyCode::Char('r') => Some(Message::Reload),
            KeyCode::Char('o') => Some(Message::Open),
            KeyCode::Char('c') => Some(Message::CopyCell),
            KeyCode::Char('C') => Some(Message::CopyRow),
            KeyCode::Char('?') => Some(Message::Help),
            KeyCode::Enter => Some(Message::Enter),
            KeyCode::Esc => Some(Message::Exit),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_keys() {
        let controller = Controller::new(&TFConfig::default());
        assert_eq!(controller.handle_key(KeyCode::Char('/').into()), Some(Message::Filter));
        assert_eq!(
            controller.handle_key(KeyCode::Char('!').into()),
            Some(Message::NegatedFilter)
        );
        assert_eq!(controller.handle_key(KeyCode::Tab.into()), Some(Message::FocusFilters));
        assert_eq!(controller.handle_key(KeyCode::F(5).into()), None);
    }
}
