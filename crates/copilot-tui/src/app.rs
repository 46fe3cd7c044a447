use copilot_core::{BackendError, ChatSession};
use ratatui::layout::Rect;
use tokio::task::JoinHandle;

pub type ReplyTask = JoinHandle<Result<String, BackendError>>;

/// Convert a character index to a byte index for UTF-8 safe string operations
pub fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub struct App {
    pub should_quit: bool,
    pub session: ChatSession,

    // Input cursor, as a character index into the session's pending input
    pub input_cursor: usize,

    // Message list scroll state
    pub chat_scroll: u16,
    pub chat_height: u16, // Inner height of the message area, set on render
    pub chat_lines: u16,  // Wrapped row count of the message list, set on render
    pub chat_area: Option<Rect>,

    pub animation_frame: u8,

    // Outstanding backend request, if any
    pub reply_task: Option<ReplyTask>,
}

impl App {
    pub fn new(session: ChatSession) -> Self {
        let mut app = Self {
            should_quit: false,
            session,
            input_cursor: 0,
            chat_scroll: 0,
            chat_height: 0,
            chat_lines: 0,
            chat_area: None,
            animation_frame: 0,
            reply_task: None,
        };
        app.scroll_to_bottom();
        app
    }

    /// Submit the pending input, or run it as an inline command.
    pub fn submit(&mut self) {
        let text = self.session.input().to_string();

        match text.trim().to_lowercase().as_str() {
            "/clear" | "/reset" => {
                if self.clear_chat() {
                    self.clear_input();
                }
                return;
            }
            "/exit" | "/quit" => {
                self.should_quit = true;
                return;
            }
            _ => {}
        }

        let Some(request) = self.session.begin_submit(&text) else {
            return;
        };
        self.input_cursor = 0;

        let backend = self.session.backend();
        self.reply_task = Some(tokio::spawn(async move { backend.send(&request).await }));

        // Scroll to bottom so "Thinking..." is visible
        self.scroll_to_bottom();
    }

    /// Record the outcome of the outstanding request.
    pub fn finish_reply(&mut self, outcome: Result<String, BackendError>) {
        self.reply_task = None;
        if self.session.finish_submit(outcome) {
            self.scroll_to_bottom();
        }
    }

    /// Wait for the outstanding request, if there is one, and record it.
    pub async fn await_reply(&mut self) {
        if self.reply_task.is_none() {
            return;
        }
        let outcome = wait_for_reply(&mut self.reply_task).await;
        self.finish_reply(outcome);
    }

    pub fn clear_chat(&mut self) -> bool {
        if self.session.clear() {
            self.chat_scroll = 0;
            true
        } else {
            false
        }
    }

    pub fn is_busy(&self) -> bool {
        self.session.is_busy()
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_busy() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Input editing

    pub fn insert_char(&mut self, c: char) {
        let byte_pos = char_to_byte_index(self.session.input(), self.input_cursor);
        self.session.input_mut().insert(byte_pos, c);
        self.input_cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.input_cursor > 0 {
            self.input_cursor -= 1;
            let byte_pos = char_to_byte_index(self.session.input(), self.input_cursor);
            self.session.input_mut().remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.input_cursor < self.session.input().chars().count() {
            let byte_pos = char_to_byte_index(self.session.input(), self.input_cursor);
            self.session.input_mut().remove(byte_pos);
        }
    }

    pub fn cursor_left(&mut self) {
        self.input_cursor = self.input_cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        let char_count = self.session.input().chars().count();
        self.input_cursor = (self.input_cursor + 1).min(char_count);
    }

    pub fn cursor_home(&mut self) {
        self.input_cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.input_cursor = self.session.input().chars().count();
    }

    pub fn clear_input(&mut self) {
        self.session.input_mut().clear();
        self.input_cursor = 0;
    }

    // Scrolling

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    /// Clamped to the last page when the message list is next drawn.
    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines);
    }

    pub fn page_height(&self) -> u16 {
        (self.visible_height() / 2).max(1)
    }

    pub fn scroll_to_bottom(&mut self) {
        self.chat_scroll = u16::MAX;
    }

    /// Last valid scroll offset for the most recent draw.
    pub fn max_scroll(&self) -> u16 {
        self.chat_lines.saturating_sub(self.chat_height)
    }

    fn visible_height(&self) -> u16 {
        if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        }
    }
}

/// Resolve once the outstanding reply task finishes. Pends forever when
/// there is no task, so it can sit in a `select!` unconditionally.
pub async fn wait_for_reply(task: &mut Option<ReplyTask>) -> Result<String, BackendError> {
    let Some(handle) = task.as_mut() else {
        return std::future::pending().await;
    };

    let joined = handle.await;
    *task = None;

    match joined {
        Ok(outcome) => outcome,
        Err(e) => Err(BackendError::Task(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use copilot_core::{
        ChatBackend, ChatMessage, ChatRequest, MemoryStore, CONNECTION_ERROR_MESSAGE,
    };
    use std::sync::Arc;

    struct EchoBackend;

    #[async_trait]
    impl ChatBackend for EchoBackend {
        async fn send(&self, request: &ChatRequest) -> Result<String, BackendError> {
            Ok(format!("echo: {}", request.message))
        }
    }

    struct DownBackend;

    #[async_trait]
    impl ChatBackend for DownBackend {
        async fn send(&self, _request: &ChatRequest) -> Result<String, BackendError> {
            Err(BackendError::Task("connection refused".to_string()))
        }
    }

    fn app_with(backend: Arc<dyn ChatBackend>, store: &MemoryStore) -> App {
        App::new(ChatSession::initialize(Box::new(store.clone()), backend, "demo_user"))
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.insert_char(c);
        }
    }

    #[test]
    fn test_char_to_byte_index_multibyte() {
        let s = "né fever";
        assert_eq!(char_to_byte_index(s, 0), 0);
        assert_eq!(char_to_byte_index(s, 2), 3);
        assert_eq!(char_to_byte_index(s, 100), s.len());
    }

    #[test]
    fn test_input_editing_respects_cursor() {
        let store = MemoryStore::new();
        let mut app = app_with(Arc::new(EchoBackend), &store);

        type_text(&mut app, "feer");
        app.cursor_left();
        app.cursor_left();
        app.insert_char('v');
        assert_eq!(app.session.input(), "fever");

        app.cursor_home();
        app.delete();
        assert_eq!(app.session.input(), "ever");

        app.cursor_end();
        app.backspace();
        assert_eq!(app.session.input(), "eve");
        assert_eq!(app.input_cursor, 3);
    }

    #[tokio::test]
    async fn test_submit_spawns_request_and_appends_reply() {
        let store = MemoryStore::new();
        let mut app = app_with(Arc::new(EchoBackend), &store);

        type_text(&mut app, "2yo fever and cough");
        app.submit();

        assert!(app.is_busy());
        assert!(app.reply_task.is_some());
        assert!(app.session.input().is_empty());
        assert_eq!(app.input_cursor, 0);
        assert_eq!(app.session.messages()[1], ChatMessage::user("2yo fever and cough"));

        app.await_reply().await;

        assert!(!app.is_busy());
        assert!(app.reply_task.is_none());
        assert_eq!(
            app.session.messages()[2],
            ChatMessage::assistant("echo: 2yo fever and cough")
        );
    }

    #[tokio::test]
    async fn test_submit_while_busy_keeps_input() {
        let store = MemoryStore::new();
        let mut app = app_with(Arc::new(EchoBackend), &store);

        type_text(&mut app, "first");
        app.submit();
        type_text(&mut app, "second");
        app.submit();

        assert_eq!(app.session.input(), "second");
        assert_eq!(app.session.messages().len(), 2);

        app.await_reply().await;
        assert_eq!(app.session.messages().len(), 3);
    }

    #[tokio::test]
    async fn test_failed_reply_shows_warning() {
        let store = MemoryStore::new();
        let mut app = app_with(Arc::new(DownBackend), &store);

        type_text(&mut app, "hello");
        app.submit();
        app.await_reply().await;

        assert_eq!(
            app.session.messages().last(),
            Some(&ChatMessage::assistant(CONNECTION_ERROR_MESSAGE))
        );
        assert!(!app.is_busy());
    }

    #[tokio::test]
    async fn test_clear_command_never_reaches_backend() {
        let store = MemoryStore::new();
        let mut app = app_with(Arc::new(EchoBackend), &store);

        type_text(&mut app, "hello");
        app.submit();
        app.await_reply().await;

        type_text(&mut app, " /CLEAR ");
        app.submit();

        assert!(app.reply_task.is_none());
        assert!(app.session.transcript().is_seeded());
        assert!(app.session.input().is_empty());
        assert!(store.raw().is_none());
    }

    #[test]
    fn test_exit_command_quits() {
        let store = MemoryStore::new();
        let mut app = app_with(Arc::new(EchoBackend), &store);

        type_text(&mut app, "/exit");
        app.submit();
        assert!(app.should_quit);
        assert_eq!(app.session.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_await_reply_without_task_returns() {
        let store = MemoryStore::new();
        let mut app = app_with(Arc::new(EchoBackend), &store);
        app.await_reply().await;
        assert_eq!(app.session.messages().len(), 1);
    }

    #[test]
    fn test_scroll_up_stops_at_top() {
        let store = MemoryStore::new();
        let mut app = app_with(Arc::new(EchoBackend), &store);
        app.chat_scroll = 5;

        app.scroll_up(3);
        assert_eq!(app.chat_scroll, 2);
        app.scroll_up(1000);
        assert_eq!(app.chat_scroll, 0);
    }

    #[tokio::test]
    async fn test_new_reply_scrolls_to_bottom() {
        let store = MemoryStore::new();
        let mut app = app_with(Arc::new(EchoBackend), &store);
        app.chat_scroll = 0;

        type_text(&mut app, "hello");
        app.submit();
        app.await_reply().await;
        assert_eq!(app.chat_scroll, u16::MAX);
    }
}
