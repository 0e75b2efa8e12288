#![forbid(unsafe_code)]

pub mod auth;
pub mod chat;
pub mod error;
pub mod study;

pub use tinhoc_core::Clock;

pub use auth::{AuthService, DEFAULT_LOGIN_DELAY, UserSession};
pub use chat::{
    ChatHandle, ChatMessage, ChatProvider, ChatRequest, ChatRole, ChatSession, ChatTurn,
    FALLBACK_REPLY, GeminiChatProvider, GeminiConfig, PendingChat,
};
pub use error::{AuthError, ChatError, StudyError};
pub use study::{GradeCompletion, StudyService, StudyStats};
