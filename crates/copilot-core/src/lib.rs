pub mod backend;
pub mod config;
pub mod emergency;
pub mod session;
pub mod state;
pub mod storage;

// Re-export main types for convenience
pub use backend::{BackendError, ChatBackend, ChatRequest, CopilotClient};
pub use config::Config;
pub use emergency::{is_emergency, is_emergency_turn, EMERGENCY_MARKER};
pub use session::ChatSession;
pub use state::{ChatMessage, ChatRole, Transcript, CONNECTION_ERROR_MESSAGE, WELCOME_MESSAGE};
pub use storage::{FileStore, MemoryStore, StorageError, TranscriptStore};
