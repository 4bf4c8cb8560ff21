pub mod config;
pub mod coordinator;
pub mod dialogue;
pub mod state;

// Re-export main types for convenience
pub use config::Config;
pub use coordinator::{Coordinator, Dispatch, Generation, Phase};
pub use dialogue::{
    DialogueBackend, DialogueClient, DialogueError, DialogueReply, DialogueRequest,
    DEFAULT_API_URL, FALLBACK_ERROR,
};
pub use state::{ChatMessage, ChatRole, ConversationStore, HistoryEntry, MessageMeta};
