use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use crate::app::App;
use crate::tui::AppEvent;

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => app.scroll_to_bottom(),
        AppEvent::Tick => app.tick_animation(),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        // Quit
        KeyCode::Char('c') if ctrl => app.should_quit = true,
        KeyCode::Esc => app.should_quit = true,

        // Clear Chat
        KeyCode::Char('l') if ctrl => {
            app.clear_chat();
        }

        // Enter submits; with Shift (or Alt, for terminals that can't report Shift) it's a newline
        KeyCode::Enter
            if key.modifiers.intersects(KeyModifiers::SHIFT | KeyModifiers::ALT) =>
        {
            app.insert_char('\n');
        }
        KeyCode::Enter => app.submit(),

        // Editing
        KeyCode::Backspace => app.backspace(),
        KeyCode::Delete => app.delete(),
        KeyCode::Left => app.cursor_left(),
        KeyCode::Right => app.cursor_right(),
        KeyCode::Home => app.cursor_home(),
        KeyCode::End => app.cursor_end(),
        KeyCode::Char('u') if ctrl => app.clear_input(),

        // Message list scrolling
        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),
        KeyCode::PageUp => app.scroll_up(app.page_height()),
        KeyCode::PageDown => app.scroll_down(app.page_height()),

        KeyCode::Char(c) if !ctrl => app.insert_char(c),

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
    use async_trait::async_trait;
    use copilot_core::{BackendError, ChatBackend, ChatRequest, ChatSession, MemoryStore};
    use crossterm::event::{KeyEventKind, KeyEventState};
    use std::sync::Arc;

    struct FixedBackend;

    #[async_trait]
    impl ChatBackend for FixedBackend {
        async fn send(&self, _request: &ChatRequest) -> Result<String, BackendError> {
            Ok("Assessment: no danger signs".to_string())
        }
    }

    fn app(store: &MemoryStore) -> App {
        App::new(ChatSession::initialize(
            Box::new(store.clone()),
            Arc::new(FixedBackend),
            "demo_user",
        ))
    }

    fn key(code: KeyCode, modifiers: KeyModifiers) -> AppEvent {
        AppEvent::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_event(app, key(KeyCode::Char(c), KeyModifiers::NONE));
        }
    }

    #[tokio::test]
    async fn test_enter_submits_and_sets_busy() {
        let store = MemoryStore::new();
        let mut app = app(&store);

        type_text(&mut app, "cough");
        handle_event(&mut app, key(KeyCode::Enter, KeyModifiers::NONE));

        assert!(app.is_busy());
        assert_eq!(app.session.messages().len(), 2);

        app.await_reply().await;
        assert!(!app.is_busy());
        assert_eq!(app.session.messages().len(), 3);
    }

    #[test]
    fn test_shift_enter_inserts_newline() {
        let store = MemoryStore::new();
        let mut app = app(&store);

        type_text(&mut app, "fever");
        handle_event(&mut app, key(KeyCode::Enter, KeyModifiers::SHIFT));
        type_text(&mut app, "rash");

        assert_eq!(app.session.input(), "fever\nrash");
        assert!(!app.is_busy());
        assert_eq!(app.session.messages().len(), 1);
    }

    #[test]
    fn test_enter_on_blank_input_is_ignored() {
        let store = MemoryStore::new();
        let mut app = app(&store);

        type_text(&mut app, "   ");
        handle_event(&mut app, key(KeyCode::Enter, KeyModifiers::NONE));

        assert!(!app.is_busy());
        assert!(app.reply_task.is_none());
        assert_eq!(app.session.messages().len(), 1);
        assert_eq!(app.session.input(), "   ");
    }

    #[tokio::test]
    async fn test_ctrl_l_clears_chat() {
        let store = MemoryStore::new();
        let mut app = app(&store);

        type_text(&mut app, "cough");
        handle_event(&mut app, key(KeyCode::Enter, KeyModifiers::NONE));
        app.await_reply().await;

        handle_event(&mut app, key(KeyCode::Char('l'), KeyModifiers::CONTROL));
        assert!(app.session.transcript().is_seeded());
        assert!(store.raw().is_none());
        assert!(app.session.input().is_empty());
    }

    #[test]
    fn test_ctrl_c_and_esc_quit() {
        let store = MemoryStore::new();

        let mut a = app(&store);
        handle_event(&mut a, key(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(a.should_quit);
        assert!(a.session.input().is_empty());

        let mut b = app(&store);
        handle_event(&mut b, key(KeyCode::Esc, KeyModifiers::NONE));
        assert!(b.should_quit);
    }

    #[test]
    fn test_point_in_rect() {
        let rect = Rect::new(2, 3, 10, 5);
        assert!(point_in_rect(2, 3, rect));
        assert!(point_in_rect(11, 7, rect));
        assert!(!point_in_rect(12, 7, rect));
        assert!(!point_in_rect(1, 3, rect));
    }
}
