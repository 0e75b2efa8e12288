use chrono::{DateTime, Utc};

use super::{ChatHandle, ChatProvider, ChatRequest, ChatRole, ChatTurn};
use crate::Clock;
use crate::error::ChatError;

/// Shown in place of a reply when the provider fails or returns nothing.
pub const FALLBACK_REPLY: &str = "Hệ thống bận, em thử lại nhé.";

/// A transcript entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Ticket for an outstanding send. Hand it back to `complete_send` together
/// with the provider's result.
#[derive(Debug, PartialEq, Eq)]
pub struct PendingChat {
    session_id: u64,
    seq: u64,
    request: ChatRequest,
}

impl PendingChat {
    #[must_use]
    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    /// Position of the send within its session, starting at 1.
    #[must_use]
    pub fn seq(&self) -> u64 {
        self.seq
    }

    #[must_use]
    pub fn request(&self) -> &ChatRequest {
        &self.request
    }
}

/// Conversation about a single lesson.
///
/// At most one send is in flight. The visible transcript always starts with
/// the greeting; `history` holds only the turns the provider answered, so a
/// failed exchange is never replayed.
#[derive(Debug, Clone)]
pub struct ChatSession {
    id: u64,
    handle: ChatHandle,
    transcript: Vec<ChatMessage>,
    history: Vec<ChatTurn>,
    /// Sequence number of the outstanding send.
    in_flight: Option<u64>,
    sent: u64,
}

impl ChatSession {
    /// Open a session seeded with the tutor's greeting.
    #[must_use]
    pub fn open(id: u64, handle: ChatHandle, now: DateTime<Utc>) -> Self {
        let greeting = ChatMessage {
            role: ChatRole::Model,
            text: greeting(&handle.lesson_title),
            timestamp: now,
        };
        Self {
            id,
            handle,
            transcript: vec![greeting],
            history: Vec::new(),
            in_flight: None,
            sent: 0,
        }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn handle(&self) -> &ChatHandle {
        &self.handle
    }

    #[must_use]
    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    /// True while a reply is outstanding.
    #[must_use]
    pub fn is_typing(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Append the user's message and return the request to hand to a provider.
    ///
    /// # Errors
    ///
    /// `ChatError::EmptyMessage` for blank text, `ChatError::Busy` while a
    /// previous send is outstanding. The transcript is unchanged on error.
    pub fn begin_send(&mut self, text: &str, now: DateTime<Utc>) -> Result<PendingChat, ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if self.in_flight.is_some() {
            return Err(ChatError::Busy);
        }

        self.transcript.push(ChatMessage {
            role: ChatRole::User,
            text: text.to_string(),
            timestamp: now,
        });
        self.sent += 1;
        self.in_flight = Some(self.sent);

        Ok(PendingChat {
            session_id: self.id,
            seq: self.sent,
            request: ChatRequest {
                system_instruction: self.handle.system_instruction.clone(),
                history: self.history.clone(),
                message: text.to_string(),
            },
        })
    }

    /// Apply a provider result. A ticket is honoured only for the send that is
    /// still outstanding in this session; anything else (another session, an
    /// already answered send) is ignored and yields `None`. Otherwise the
    /// appended reply (or fallback) is returned.
    pub fn complete_send(
        &mut self,
        pending: PendingChat,
        result: Result<String, ChatError>,
        now: DateTime<Utc>,
    ) -> Option<&ChatMessage> {
        if pending.session_id != self.id {
            tracing::debug!(
                ticket = pending.session_id,
                session = self.id,
                "ignoring reply for a closed chat session"
            );
            return None;
        }
        if self.in_flight != Some(pending.seq) {
            tracing::debug!(
                ticket = pending.seq,
                outstanding = ?self.in_flight,
                "ignoring reply for a send that is no longer outstanding"
            );
            return None;
        }
        Some(self.apply(pending.request, result, now))
    }

    /// Send sequentially: begin, await the provider, complete.
    ///
    /// # Errors
    ///
    /// Only the input errors of `begin_send`; provider failures become the
    /// fallback reply.
    pub async fn send(
        &mut self,
        provider: &dyn ChatProvider,
        text: &str,
        clock: &Clock,
    ) -> Result<&ChatMessage, ChatError> {
        let pending = self.begin_send(text, clock.now())?;
        let result = provider.send_message(&pending.request).await;
        Ok(self.apply(pending.request, result, clock.now()))
    }

    fn apply(
        &mut self,
        request: ChatRequest,
        result: Result<String, ChatError>,
        now: DateTime<Utc>,
    ) -> &ChatMessage {
        self.in_flight = None;

        let reply = match result {
            Ok(text) if !text.trim().is_empty() => {
                let text = text.trim().to_string();
                self.history.push(ChatTurn {
                    role: ChatRole::User,
                    text: request.message,
                });
                self.history.push(ChatTurn {
                    role: ChatRole::Model,
                    text: text.clone(),
                });
                text
            }
            Ok(_) => {
                tracing::warn!(lesson = %self.handle.lesson_id, "chat provider returned an empty reply");
                FALLBACK_REPLY.to_string()
            }
            Err(err) => {
                tracing::warn!(lesson = %self.handle.lesson_id, error = %err, "chat request failed");
                FALLBACK_REPLY.to_string()
            }
        };

        self.transcript.push(ChatMessage {
            role: ChatRole::Model,
            text: reply,
            timestamp: now,
        });
        let last = self.transcript.len() - 1;
        &self.transcript[last]
    }
}

fn greeting(lesson_title: &str) -> String {
    format!(
        "Chào em! Thầy là trợ lý Tin học Pro. Chúng ta cùng bắt đầu tìm hiểu bài \"{lesson_title}\" nhé. Em có câu hỏi nào không?"
    )
}
