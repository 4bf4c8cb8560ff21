use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use crate::app::App;
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => app.scroll_chat_to_bottom(),
        AppEvent::Tick => app.tick_animation(),
        AppEvent::Reply { generation, outcome } => app.apply_reply(generation, outcome),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    // Keys that work whether or not a request is pending
    match key.code {
        KeyCode::Char('c') if ctrl => {
            app.quit();
            return;
        }
        KeyCode::Esc => {
            app.quit();
            return;
        }
        KeyCode::PageUp => {
            app.scroll_up(app.chat_height.max(2) / 2);
            return;
        }
        KeyCode::PageDown => {
            app.scroll_down(app.chat_height.max(2) / 2);
            return;
        }
        KeyCode::Up => {
            app.scroll_up(1);
            return;
        }
        KeyCode::Down => {
            app.scroll_down(1);
            return;
        }
        _ => {}
    }

    // Input box and reset are disabled while waiting on the tutor
    if app.is_pending() {
        return;
    }

    match key.code {
        KeyCode::Char('r') if ctrl => app.reset(),
        KeyCode::Enter => app.submit(),
        KeyCode::Backspace => {
            if app.cursor > 0 {
                app.cursor -= 1;
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.input.chars().count();
            if app.cursor < char_count {
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.cursor = app.cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.input.chars().count();
            app.cursor = (app.cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.cursor = 0;
        }
        KeyCode::End => {
            app.cursor = app.input.chars().count();
        }
        KeyCode::Char(c) if !ctrl => {
            let byte_pos = char_to_byte_index(&app.input, app.cursor);
            app.input.insert(byte_pos, c);
            app.cursor += 1;
        }
        _ => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let in_chat = app
        .chat_area
        .map(|r| point_in_rect(mouse.column, mouse.row, r))
        .unwrap_or(false);
    if !in_chat {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(3),
        MouseEventKind::ScrollUp => app.scroll_up(3),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::{deliver_reply, plants_reply, test_app};
    use crossterm::event::{KeyEventKind, KeyEventState};

    fn press(app: &mut App, code: KeyCode) {
        handle_event(app, AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE)));
    }

    fn ctrl(app: &mut App, c: char) {
        handle_event(
            app,
            AppEvent::Key(KeyEvent {
                code: KeyCode::Char(c),
                modifiers: KeyModifiers::CONTROL,
                kind: KeyEventKind::Press,
                state: KeyEventState::NONE,
            }),
        );
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    #[test]
    fn test_char_to_byte_index_multibyte() {
        let s = "héllo";
        assert_eq!(char_to_byte_index(s, 0), 0);
        assert_eq!(char_to_byte_index(s, 2), 3);
        assert_eq!(char_to_byte_index(s, 10), s.len());
    }

    #[test]
    fn test_point_in_rect() {
        let rect = Rect::new(2, 2, 4, 3);
        assert!(point_in_rect(2, 2, rect));
        assert!(point_in_rect(5, 4, rect));
        assert!(!point_in_rect(6, 4, rect));
        assert!(!point_in_rect(1, 3, rect));
    }

    #[tokio::test]
    async fn test_cursor_editing() {
        let (mut app, _rx) = test_app(vec![]);
        type_text(&mut app, "wy");
        press(&mut app, KeyCode::Left);
        type_text(&mut app, "h");
        assert_eq!(app.input, "why");
        assert_eq!(app.cursor, 2);

        press(&mut app, KeyCode::Home);
        press(&mut app, KeyCode::Delete);
        assert_eq!(app.input, "hy");
        press(&mut app, KeyCode::End);
        press(&mut app, KeyCode::Backspace);
        assert_eq!(app.input, "h");
        assert_eq!(app.cursor, 1);
    }

    #[tokio::test]
    async fn test_enter_sends_and_locks_input() {
        let (mut app, mut rx) = test_app(vec![plants_reply()]);
        type_text(&mut app, "Why are plants green?");
        press(&mut app, KeyCode::Enter);
        assert!(app.is_pending());

        // Typing, sending and reset are all ignored while pending
        type_text(&mut app, "more");
        press(&mut app, KeyCode::Enter);
        ctrl(&mut app, 'r');
        assert!(app.input.is_empty());
        assert_eq!(app.messages().len(), 1);

        deliver_reply(&mut app, &mut rx).await;
        assert_eq!(app.messages().len(), 2);
        assert_eq!(app.coordinator.total_tokens(), 12);

        ctrl(&mut app, 'r');
        assert!(app.messages().is_empty());
        assert_eq!(app.coordinator.total_tokens(), 0);
    }

    #[tokio::test]
    async fn test_enter_on_blank_input_does_nothing() {
        let (mut app, _rx) = test_app(vec![]);
        type_text(&mut app, "  ");
        press(&mut app, KeyCode::Enter);
        assert!(!app.is_pending());
        assert!(app.messages().is_empty());
    }

    #[tokio::test]
    async fn test_quit_keys() {
        let (mut app, _rx) = test_app(vec![]);
        press(&mut app, KeyCode::Esc);
        assert!(app.should_quit);

        let (mut app, _rx) = test_app(vec![]);
        ctrl(&mut app, 'c');
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn test_reply_event_is_applied() {
        let (mut app, mut rx) = test_app(vec![plants_reply()]);
        type_text(&mut app, "q");
        press(&mut app, KeyCode::Enter);

        let event = rx.recv().await.unwrap();
        handle_event(&mut app, event);
        assert!(!app.is_pending());
        assert_eq!(app.messages().len(), 2);
    }

    #[tokio::test]
    async fn test_scroll_keys_work_while_pending() {
        let (mut app, _rx) = test_app(vec![plants_reply()]);
        app.transcript_height = 40;
        app.chat_height = 10;
        type_text(&mut app, "q");
        press(&mut app, KeyCode::Enter);
        assert!(app.is_pending());

        press(&mut app, KeyCode::PageDown);
        assert_eq!(app.chat_scroll, 5);
        press(&mut app, KeyCode::Down);
        assert_eq!(app.chat_scroll, 6);
        press(&mut app, KeyCode::Up);
        press(&mut app, KeyCode::PageUp);
        assert_eq!(app.chat_scroll, 0);
    }
}
