use std::sync::Arc;

use ratatui::layout::Rect;
use socratic_core::{ChatMessage, Coordinator, DialogueBackend, DialogueError, DialogueReply, Generation};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::tui::AppEvent;

pub struct App {
    pub should_quit: bool,

    // Conversation state
    pub coordinator: Coordinator,
    backend: Arc<dyn DialogueBackend>,
    pub api_url: String,
    reply_task: Option<JoinHandle<()>>,
    events: mpsc::UnboundedSender<AppEvent>,

    // Input box
    pub input: String,
    pub cursor: usize,

    // Transcript scrolling
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations
    pub chat_area: Option<Rect>,
    pub transcript_height: u16, // Wrapped transcript height, measured at render
    pub follow_bottom: bool,    // Pin the view to the latest entry on next render

    pub animation_frame: u8,
}

impl App {
    pub fn new(
        backend: Arc<dyn DialogueBackend>,
        api_url: String,
        events: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            should_quit: false,

            coordinator: Coordinator::new(),
            backend,
            api_url,
            reply_task: None,
            events,

            input: String::new(),
            cursor: 0,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            chat_area: None,
            transcript_height: 0,
            follow_bottom: false,

            animation_frame: 0,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.coordinator.is_pending()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.coordinator.messages()
    }

    /// Send is only offered when there is something to send and nothing in flight
    pub fn can_send(&self) -> bool {
        self.coordinator.can_submit(&self.input)
    }

    /// Submit the input box. Blank input or a pending request makes this a no-op.
    pub fn submit(&mut self) {
        let Some(dispatch) = self.coordinator.submit(&self.input) else {
            return;
        };

        self.input.clear();
        self.cursor = 0;
        self.animation_frame = 0;

        // Request runs off the event loop; its outcome comes back as an event
        let backend = Arc::clone(&self.backend);
        let events = self.events.clone();
        let generation = dispatch.generation;
        self.reply_task = Some(tokio::spawn(async move {
            let outcome = backend.dialogue(&dispatch.request).await;
            if events.send(AppEvent::Reply { generation, outcome }).is_err() {
                debug!(generation, "event loop gone before dialogue reply arrived");
            }
        }));

        // Scroll to bottom so "Thinking..." is visible
        self.scroll_chat_to_bottom();
    }

    pub fn apply_reply(&mut self, generation: Generation, outcome: Result<DialogueReply, DialogueError>) {
        if self.coordinator.resolve(generation, outcome) {
            self.reply_task = None;
            self.scroll_chat_to_bottom();
        }
    }

    /// Clear the conversation. Only offered while idle.
    pub fn reset(&mut self) {
        if self.is_pending() {
            warn!("reset requested while a request is pending; ignoring");
            return;
        }
        self.coordinator.reset();
        self.chat_scroll = 0;
        self.follow_bottom = false;
    }

    /// Leave the app, dropping any request still in flight
    pub fn quit(&mut self) {
        if let Some(task) = self.reply_task.take() {
            task.abort();
        }
        self.should_quit = true;
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_pending() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(self.max_scroll());
    }

    /// Largest scroll offset that still fills the pane
    pub fn max_scroll(&self) -> u16 {
        self.transcript_height.saturating_sub(self.chat_height)
    }

    /// Scroll chat to the latest entry once the next frame knows the pane size
    pub fn scroll_chat_to_bottom(&mut self) {
        self.follow_bottom = true;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use socratic_core::{DialogueRequest, FALLBACK_ERROR};

    use super::*;

    /// Backend that answers from a script
    pub(crate) struct ScriptedBackend {
        outcomes: Mutex<VecDeque<Result<DialogueReply, DialogueError>>>,
    }

    impl ScriptedBackend {
        pub(crate) fn new(outcomes: Vec<Result<DialogueReply, DialogueError>>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(outcomes.into()),
            })
        }
    }

    #[async_trait]
    impl DialogueBackend for ScriptedBackend {
        async fn dialogue(&self, _request: &DialogueRequest) -> Result<DialogueReply, DialogueError> {
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(DialogueError::Transport("script exhausted".to_string())))
        }
    }

    pub(crate) fn plants_reply() -> Result<DialogueReply, DialogueError> {
        Ok(DialogueReply {
            socratic_response: "Why do you think plants absorb light?".to_string(),
            processed_input: "why are plants green".to_string(),
            tokens_used: Some(12),
        })
    }

    pub(crate) fn test_app(
        outcomes: Vec<Result<DialogueReply, DialogueError>>,
    ) -> (App, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let app = App::new(ScriptedBackend::new(outcomes), "http://127.0.0.1:8000".to_string(), tx);
        (app, rx)
    }

    /// Wait for the spawned request and feed its reply back in
    pub(crate) async fn deliver_reply(app: &mut App, rx: &mut mpsc::UnboundedReceiver<AppEvent>) {
        match rx.recv().await {
            Some(AppEvent::Reply { generation, outcome }) => app.apply_reply(generation, outcome),
            other => panic!("expected a reply event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_submit_and_reply() {
        let (mut app, mut rx) = test_app(vec![plants_reply()]);
        app.input = "Why are plants green?".to_string();
        app.cursor = app.input.chars().count();

        app.submit();
        assert!(app.is_pending());
        assert!(app.input.is_empty());
        assert_eq!(app.cursor, 0);
        assert_eq!(app.messages().len(), 1);

        deliver_reply(&mut app, &mut rx).await;
        assert!(!app.is_pending());
        assert_eq!(app.messages().len(), 2);
        assert_eq!(app.coordinator.total_tokens(), 12);
    }

    #[tokio::test]
    async fn test_blank_submit_keeps_input() {
        let (mut app, _rx) = test_app(vec![]);
        app.input = "   ".to_string();
        app.submit();
        assert!(!app.is_pending());
        assert!(app.messages().is_empty());
        assert_eq!(app.input, "   ");
        assert!(!app.can_send());
    }

    #[tokio::test]
    async fn test_failure_shows_fallback() {
        let (mut app, mut rx) = test_app(vec![Err(DialogueError::Status {
            status: 502,
            detail: None,
        })]);
        app.input = "x".to_string();
        app.submit();
        deliver_reply(&mut app, &mut rx).await;

        assert_eq!(app.messages().len(), 1);
        assert_eq!(app.coordinator.last_error(), Some(FALLBACK_ERROR));
        assert!(!app.is_pending());
    }

    #[tokio::test]
    async fn test_reset_ignored_while_pending() {
        let (mut app, mut rx) = test_app(vec![plants_reply()]);
        app.input = "Why are plants green?".to_string();
        app.submit();

        app.reset();
        assert!(app.is_pending());
        assert_eq!(app.messages().len(), 1);

        deliver_reply(&mut app, &mut rx).await;
        app.reset();
        assert!(app.messages().is_empty());
        assert_eq!(app.coordinator.total_tokens(), 0);
        assert_eq!(app.chat_scroll, 0);
    }

    #[tokio::test]
    async fn test_animation_only_runs_while_pending() {
        let (mut app, _rx) = test_app(vec![plants_reply()]);
        app.tick_animation();
        assert_eq!(app.animation_frame, 0);

        app.input = "q".to_string();
        app.submit();
        app.tick_animation();
        app.tick_animation();
        assert_eq!(app.animation_frame, 2);
        app.tick_animation();
        assert_eq!(app.animation_frame, 0);
    }

    #[tokio::test]
    async fn test_quit_while_pending() {
        let (mut app, _rx) = test_app(vec![plants_reply()]);
        app.input = "q".to_string();
        app.submit();
        app.quit();
        assert!(app.should_quit);
        assert!(app.reply_task.is_none());
    }

    #[tokio::test]
    async fn test_submit_and_reply_follow_bottom() {
        let (mut app, mut rx) = test_app(vec![plants_reply()]);
        app.input = "q".to_string();
        app.submit();
        assert!(app.follow_bottom);

        app.follow_bottom = false;
        deliver_reply(&mut app, &mut rx).await;
        assert!(app.follow_bottom);

        app.reset();
        assert!(!app.follow_bottom);
    }

    #[test]
    fn test_scroll_clamps_to_transcript() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::new(ScriptedBackend::new(vec![]), String::new(), tx);
        app.transcript_height = 8;
        app.chat_height = 4;
        assert_eq!(app.max_scroll(), 4);

        app.scroll_down(10);
        assert_eq!(app.chat_scroll, 4);
        app.scroll_up(3);
        assert_eq!(app.chat_scroll, 1);
        app.scroll_up(3);
        assert_eq!(app.chat_scroll, 0);
    }
}
