//! Lesson-scoped tutoring chat.

mod gemini;
mod session;

use async_trait::async_trait;
use tinhoc_core::model::{Grade, Lesson, LessonId};

use crate::error::ChatError;

pub use gemini::{GeminiChatProvider, GeminiConfig};
pub use session::{ChatMessage, ChatSession, FALLBACK_REPLY, PendingChat};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChatRole {
    User,
    Model,
}

/// One completed exchange half, as replayed to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
}

/// Provider-side context for one lesson's conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatHandle {
    pub grade: Grade,
    pub lesson_id: LessonId,
    pub lesson_title: String,
    pub system_instruction: String,
}

impl ChatHandle {
    #[must_use]
    pub fn for_lesson(grade: Grade, lesson: &Lesson) -> Self {
        Self {
            grade,
            lesson_id: lesson.id.clone(),
            lesson_title: lesson.title.clone(),
            system_instruction: system_instruction(grade, lesson),
        }
    }
}

/// Everything a stateless provider needs to produce the next reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub system_instruction: String,
    pub history: Vec<ChatTurn>,
    pub message: String,
}

#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Build the conversation context for a lesson.
    fn create_session(&self, grade: Grade, lesson: &Lesson) -> ChatHandle {
        ChatHandle::for_lesson(grade, lesson)
    }

    /// Produce the model's reply to `request.message`.
    ///
    /// # Errors
    ///
    /// Returns `ChatError` when the provider is disabled or the request fails.
    async fn send_message(&self, request: &ChatRequest) -> Result<String, ChatError>;
}

/// Tutor persona for a lesson: grade, title and key points, answers in
/// Vietnamese.
#[must_use]
pub fn system_instruction(grade: Grade, lesson: &Lesson) -> String {
    format!(
        "Bạn là một trợ lý giáo dục chuyên nghiệp về môn Tin học lớp {grade} tại Việt Nam. \
         Nhiệm vụ của bạn là giải thích các khái niệm trong bài \"{title}\" một cách dễ hiểu, \
         chính xác theo chương trình SGK. \
         Bài học có các nội dung chính: {points}. \
         Hãy trả lời bằng tiếng Việt, ngắn gọn, súc tích và có ví dụ minh họa cụ thể.",
        title = lesson.title,
        points = lesson.key_points.join(", "),
    )
}
