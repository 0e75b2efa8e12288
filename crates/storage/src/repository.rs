use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tinhoc_core::model::{Grade, LessonId, ProgressSnapshot};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),
}

/// Aggregate per-user statistics: opened lessons, quiz totals and points.
///
/// Implementations apply each call atomically; callers never see a quiz result
/// half applied.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Start a fresh aggregate for a signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be written.
    async fn begin(&self, display_name: &str) -> Result<(), StorageError>;

    /// Remember the grade the user is currently browsing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be written.
    async fn set_active_grade(&self, grade: Option<Grade>) -> Result<(), StorageError>;

    /// Mark a lesson as opened. Idempotent; returns `true` only on first open.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be written.
    async fn mark_lesson_opened(&self, lesson: &LessonId) -> Result<bool, StorageError>;

    /// Add one quiz outcome to the totals and award `10 × correct` points.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be written.
    async fn record_quiz_result(&self, correct: u32, total: u32) -> Result<(), StorageError>;

    /// Current aggregate.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read.
    async fn read(&self) -> Result<ProgressSnapshot, StorageError>;

    /// Drop the aggregate (sign-out).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be written.
    async fn clear(&self) -> Result<(), StorageError>;
}

/// Memory-only progress store; everything is lost when the process exits.
#[derive(Clone, Default)]
pub struct InMemoryProgressStore {
    progress: Arc<Mutex<ProgressSnapshot>>,
}

impl InMemoryProgressStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            progress: Arc::new(Mutex::new(ProgressSnapshot::default())),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, ProgressSnapshot>, StorageError> {
        self.progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl ProgressStore for InMemoryProgressStore {
    async fn begin(&self, display_name: &str) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        *guard = ProgressSnapshot::for_user(display_name);
        Ok(())
    }

    async fn set_active_grade(&self, grade: Option<Grade>) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard.grade = grade;
        Ok(())
    }

    async fn mark_lesson_opened(&self, lesson: &LessonId) -> Result<bool, StorageError> {
        let mut guard = self.lock()?;
        Ok(guard.mark_lesson_opened(lesson))
    }

    async fn record_quiz_result(&self, correct: u32, total: u32) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard.record_quiz_result(correct, total);
        Ok(())
    }

    async fn read(&self) -> Result<ProgressSnapshot, StorageError> {
        let guard = self.lock()?;
        Ok(guard.clone())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        *guard = ProgressSnapshot::default();
        Ok(())
    }
}
