use std::time::Duration;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crate::shared::{Direction, InputEvent};

// poll for a key press for at most `timeout`, and turn it into input events
// for the middle layer
pub fn poll_input(timeout: Duration) -> std::io::Result<Vec<InputEvent>> {
    if !event::poll(timeout)? {
        return Ok(vec![]);
    }

    if let Event::Key(key) = event::read()? {
        if key.kind != KeyEventKind::Press {
            return Ok(vec![]);
        }
        return Ok(handle_key(key.code));
    }
    Ok(vec![])
}

pub fn handle_key(code: KeyCode) -> Vec<InputEvent> {
    match code {
        KeyCode::Esc => vec![InputEvent::Quit],
        KeyCode::Char(' ') => vec![InputEvent::PlayPress],

        // cursor over the grid
        KeyCode::Up => vec![InputEvent::MoveCursor(Direction::Up)],
        KeyCode::Down => vec![InputEvent::MoveCursor(Direction::Down)],
        KeyCode::Left => vec![InputEvent::MoveCursor(Direction::Left)],
        KeyCode::Right => vec![InputEvent::MoveCursor(Direction::Right)],
        KeyCode::Enter | KeyCode::Char('x') => vec![InputEvent::ToggleCell],

        // tempo, fine and coarse
        KeyCode::Char('+') | KeyCode::Char('=') => vec![InputEvent::NudgeBpm(1)],
        KeyCode::Char('-') => vec![InputEvent::NudgeBpm(-1)],
        KeyCode::Char(']') => vec![InputEvent::NudgeBpm(10)],
        KeyCode::Char('[') => vec![InputEvent::NudgeBpm(-10)],

        KeyCode::Char('c') => vec![InputEvent::ClearPattern],
        _ => vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_transport_and_tempo_keys() {
        assert_eq!(handle_key(KeyCode::Char(' ')), vec![InputEvent::PlayPress]);
        assert_eq!(handle_key(KeyCode::Char('=')), vec![InputEvent::NudgeBpm(1)]);
        assert_eq!(handle_key(KeyCode::Char('[')), vec![InputEvent::NudgeBpm(-10)]);
        assert_eq!(handle_key(KeyCode::Esc), vec![InputEvent::Quit]);
    }

    #[test]
    fn ignores_unbound_keys() {
        assert!(handle_key(KeyCode::Char('z')).is_empty());
        assert!(handle_key(KeyCode::Tab).is_empty());
    }
}
