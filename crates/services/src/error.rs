//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use tinhoc_core::navigation::NavigationError;
use tinhoc_core::quiz::QuizError;

/// Errors emitted by chat sessions and `ChatProvider`s.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ChatError {
    #[error("chat assistant is not configured")]
    Disabled,
    #[error("message is empty")]
    EmptyMessage,
    #[error("a reply is still pending")]
    Busy,
    #[error("chat provider returned an empty response")]
    EmptyResponse,
    #[error("chat request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    /// The provider answered but refused the request.
    #[error("chat request failed: {0}")]
    RequestFailed(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted by `AuthService`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AuthError {
    #[error("email and password are required")]
    MissingCredentials,
}

/// Errors emitted by `StudyService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StudyError {
    #[error("no user is signed in")]
    NotLoggedIn,
    #[error("no quiz in progress")]
    NoQuiz,
    #[error("no chat session is open")]
    NoChatSession,
    #[error(transparent)]
    Navigation(#[from] NavigationError),
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    Chat(#[from] ChatError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
