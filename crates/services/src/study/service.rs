use std::sync::Arc;

use storage::repository::ProgressStore;
use tinhoc_core::StudyTimer;
use tinhoc_core::model::{Curriculum, Grade, Lesson, LessonId, QuizResult};
use tinhoc_core::navigation::{self, NavigationError, NavigationState, Screen, ScreenKind};
use tinhoc_core::quiz::{Advance, QuizScore, QuizSession};

use super::stats::{GradeCompletion, StudyStats};
use crate::Clock;
use crate::auth::{AuthService, UserSession};
use crate::chat::{ChatMessage, ChatProvider, ChatSession, PendingChat};
use crate::error::{ChatError, StudyError};

/// One signed-in learner's walk through the curriculum.
///
/// Owns navigation, the active quiz and the lesson chat; progress lives in the
/// injected `ProgressStore`. Every transition is computed on a copy of the
/// navigation state and committed only after its side effects succeed, so a
/// failed call leaves the service as it was.
pub struct StudyService {
    clock: Clock,
    curriculum: Arc<Curriculum>,
    progress: Arc<dyn ProgressStore>,
    chat_provider: Arc<dyn ChatProvider>,
    auth: AuthService,
    user: Option<UserSession>,
    timer: StudyTimer,
    navigation: NavigationState,
    quiz: Option<QuizSession>,
    chat: Option<ChatSession>,
    next_chat_id: u64,
    unrecorded: Option<QuizResult>,
}

impl StudyService {
    #[must_use]
    pub fn new(
        clock: Clock,
        curriculum: Arc<Curriculum>,
        progress: Arc<dyn ProgressStore>,
        chat_provider: Arc<dyn ChatProvider>,
    ) -> Self {
        Self {
            clock,
            curriculum,
            progress,
            chat_provider,
            auth: AuthService::new(clock),
            user: None,
            timer: StudyTimer::new(),
            navigation: NavigationState::new(),
            quiz: None,
            chat: None,
            next_chat_id: 1,
            unrecorded: None,
        }
    }

    #[must_use]
    pub fn with_auth(mut self, auth: AuthService) -> Self {
        self.auth = auth;
        self
    }

    #[must_use]
    pub fn curriculum(&self) -> &Curriculum {
        &self.curriculum
    }

    //
    // ─── SESSION ───────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn user(&self) -> Option<&UserSession> {
        self.user.as_ref()
    }

    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.user.is_some()
    }

    /// Sign in and start a fresh progress aggregate and study timer.
    ///
    /// Signing in while already signed in replaces the previous session.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::Auth` for blank credentials and
    /// `StudyError::Storage` if the progress store cannot be reset.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<&UserSession, StudyError> {
        let session = self.auth.login(email, password).await?;
        self.progress.begin(session.display_name()).await?;

        self.navigation.reset();
        self.quiz = None;
        self.chat = None;
        self.unrecorded = None;
        self.timer.reset();
        self.timer.start(self.clock.now());

        Ok(self.user.insert(session))
    }

    /// Sign out, dropping progress, quiz and chat.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::NotLoggedIn` without a user and
    /// `StudyError::Storage` if the progress store cannot be cleared.
    pub async fn logout(&mut self) -> Result<(), StudyError> {
        let user = self.require_user()?.display_name().to_string();
        self.progress.clear().await?;

        self.timer.stop(self.clock.now());
        self.timer.reset();
        self.navigation.reset();
        self.quiz = None;
        self.chat = None;
        self.unrecorded = None;
        self.user = None;
        tracing::info!(user = %user, "signed out");
        Ok(())
    }

    //
    // ─── NAVIGATION ────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn navigation(&self) -> &NavigationState {
        &self.navigation
    }

    #[must_use]
    pub fn screen(&self) -> &Screen {
        self.navigation.screen()
    }

    #[must_use]
    pub fn grades(&self) -> Vec<Grade> {
        self.curriculum.grades().collect()
    }

    /// Pick a grade from any screen and remember it as the active grade.
    ///
    /// # Errors
    ///
    /// `NotLoggedIn`, `Navigation(InvalidGrade)` or a storage failure.
    pub async fn select_grade(&mut self, grade: Grade) -> Result<(), StudyError> {
        self.require_user()?;
        let mut next = self.navigation.clone();
        next.select_grade(&self.curriculum, grade)?;
        self.progress.set_active_grade(Some(grade)).await?;
        self.commit(next);
        tracing::debug!(%grade, "grade selected");
        Ok(())
    }

    /// # Errors
    ///
    /// `NotLoggedIn`, or the navigation error for a missing grade or an
    /// unknown topic.
    pub fn select_topic(&mut self, topic: &str) -> Result<(), StudyError> {
        self.require_user()?;
        let mut next = self.navigation.clone();
        next.select_topic(&self.curriculum, topic)?;
        self.commit(next);
        Ok(())
    }

    /// Open a lesson: marks it opened in the progress store and starts a new
    /// chat session for it. Returns `true` the first time the lesson is opened.
    ///
    /// # Errors
    ///
    /// `NotLoggedIn`, the navigation error for a lesson outside the current
    /// grade/topic, or a storage failure.
    pub async fn select_lesson(&mut self, lesson_id: &LessonId) -> Result<bool, StudyError> {
        self.require_user()?;
        let curriculum = Arc::clone(&self.curriculum);
        let mut next = self.navigation.clone();
        let lesson = next.select_lesson(&curriculum, lesson_id)?;
        let grade = next
            .selected_grade()
            .ok_or(NavigationError::NoGradeSelected)?;

        let first_open = self.progress.mark_lesson_opened(&lesson.id).await?;

        let handle = self.chat_provider.create_session(grade, lesson);
        let chat_id = self.next_chat_id;
        self.next_chat_id += 1;

        self.commit(next);
        self.quiz = None;
        self.chat = Some(ChatSession::open(chat_id, handle, self.clock.now()));
        tracing::info!(lesson = %lesson.id, first_open, "lesson opened");
        Ok(first_open)
    }

    /// Step one level up, dropping the quiz and chat when leaving their scope.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::NotLoggedIn` without a user.
    pub fn go_back(&mut self) -> Result<&Screen, StudyError> {
        self.require_user()?;
        let mut next = self.navigation.clone();
        next.go_back();
        self.commit(next);
        Ok(self.navigation.screen())
    }

    /// Jump to the grade picker. The store's active grade is left alone.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::NotLoggedIn` without a user.
    pub fn return_home(&mut self) -> Result<(), StudyError> {
        self.require_user()?;
        self.commit(NavigationState::new());
        Ok(())
    }

    #[must_use]
    pub fn current_lesson(&self) -> Option<&Lesson> {
        self.navigation.current_lesson(&self.curriculum)
    }

    /// # Errors
    ///
    /// Returns `Navigation(NoGradeSelected)` without a grade.
    pub fn topics(&self) -> Result<Vec<&str>, StudyError> {
        Ok(self.navigation.topics(&self.curriculum)?)
    }

    /// # Errors
    ///
    /// Returns the navigation error when grade or topic is missing.
    pub fn lessons(&self) -> Result<Vec<&Lesson>, StudyError> {
        Ok(self.navigation.lessons(&self.curriculum)?)
    }

    //
    // ─── QUIZ ──────────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn quiz(&self) -> Option<&QuizSession> {
        self.quiz.as_ref()
    }

    /// Start (or restart) the quiz of the selected lesson.
    ///
    /// # Errors
    ///
    /// `NotLoggedIn`, `Navigation(NoLessonSelected)` or
    /// `Navigation(NoQuestions)`.
    pub fn start_quiz(&mut self) -> Result<&QuizSession, StudyError> {
        self.require_user()?;
        let curriculum = Arc::clone(&self.curriculum);
        let mut next = self.navigation.clone();
        let lesson = next.start_quiz(&curriculum)?;
        let quiz = QuizSession::for_lesson(lesson)?;

        self.commit(next);
        tracing::debug!(lesson = %lesson.id, questions = quiz.question_count(), "quiz started");
        Ok(self.quiz.insert(quiz))
    }

    /// # Errors
    ///
    /// `NoQuiz` without a quiz, or the quiz error for an inactive quiz or an
    /// option the question does not have.
    pub fn select_answer(&mut self, option: usize) -> Result<(), StudyError> {
        self.quiz_mut()?.select_answer(option)?;
        Ok(())
    }

    /// Move to the next question. Completing the quiz records its result in
    /// the progress store exactly once.
    ///
    /// # Errors
    ///
    /// `NoQuiz`, the quiz error for an unanswered question, or a storage
    /// failure while recording. After a storage failure the quiz stays
    /// completed and `retry_record_result` persists the pending result.
    pub async fn advance(&mut self) -> Result<Advance, StudyError> {
        let outcome = self.quiz_mut()?.advance()?;
        if let Advance::Completed(result) = &outcome {
            tracing::info!(
                lesson = %result.lesson_id,
                correct = result.correct,
                total = result.total,
                "quiz completed"
            );
            self.unrecorded = Some(result.clone());
            self.record_pending().await?;
        }
        Ok(outcome)
    }

    /// Persist a completed quiz result whose first recording failed.
    /// Returns `false` when nothing was pending.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::Storage` if persistence fails again.
    pub async fn retry_record_result(&mut self) -> Result<bool, StudyError> {
        self.record_pending().await
    }

    #[must_use]
    pub fn has_unrecorded_result(&self) -> bool {
        self.unrecorded.is_some()
    }

    /// # Errors
    ///
    /// `NoQuiz`, or `Quiz(NotCompleted)` before the last answer.
    pub fn quiz_score(&self) -> Result<QuizScore, StudyError> {
        let quiz = self.quiz.as_ref().ok_or(StudyError::NoQuiz)?;
        Ok(quiz.score()?)
    }

    /// Leave the quiz for the lesson detail screen.
    ///
    /// # Errors
    ///
    /// `NotLoggedIn` or `Navigation(NotInQuiz)`.
    pub fn finish_quiz(&mut self) -> Result<(), StudyError> {
        self.require_user()?;
        let mut next = self.navigation.clone();
        next.finish_quiz()?;
        self.commit(next);
        Ok(())
    }

    //
    // ─── CHAT ──────────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn chat(&self) -> Option<&ChatSession> {
        self.chat.as_ref()
    }

    #[must_use]
    pub fn transcript(&self) -> &[ChatMessage] {
        match &self.chat {
            Some(chat) => chat.transcript(),
            None => &[],
        }
    }

    #[must_use]
    pub fn is_typing(&self) -> bool {
        self.chat.as_ref().is_some_and(ChatSession::is_typing)
    }

    #[must_use]
    pub fn chat_provider(&self) -> Arc<dyn ChatProvider> {
        Arc::clone(&self.chat_provider)
    }

    /// Append the user's message and hand back the request to send.
    ///
    /// Await `chat_provider().send_message(pending.request())` without holding
    /// the service, then pass the result to `complete_chat`.
    ///
    /// # Errors
    ///
    /// `NoChatSession` outside a lesson, `Chat(EmptyMessage)` or `Chat(Busy)`.
    pub fn begin_chat(&mut self, text: &str) -> Result<PendingChat, StudyError> {
        let now = self.clock.now();
        let chat = self.chat.as_mut().ok_or(StudyError::NoChatSession)?;
        Ok(chat.begin_send(text, now)?)
    }

    /// Apply a provider result. Replies for a chat that has since been closed
    /// are dropped and yield `None`.
    pub fn complete_chat(
        &mut self,
        pending: PendingChat,
        result: Result<String, ChatError>,
    ) -> Option<&ChatMessage> {
        let now = self.clock.now();
        match self.chat.as_mut() {
            Some(chat) => chat.complete_send(pending, result, now),
            None => {
                tracing::debug!(
                    ticket = pending.session_id(),
                    "ignoring reply, no chat session open"
                );
                None
            }
        }
    }

    /// Send a message and wait for the reply (or the fallback).
    ///
    /// # Errors
    ///
    /// `NoChatSession`, `Chat(EmptyMessage)` or `Chat(Busy)`.
    pub async fn send_chat(&mut self, text: &str) -> Result<&ChatMessage, StudyError> {
        let provider = Arc::clone(&self.chat_provider);
        let clock = self.clock;
        let chat = self.chat.as_mut().ok_or(StudyError::NoChatSession)?;
        Ok(chat.send(provider.as_ref(), text, &clock).await?)
    }

    //
    // ─── STATS ─────────────────────────────────────────────────────────────────
    //

    /// Progress aggregate, study time and per-grade completion.
    ///
    /// # Errors
    ///
    /// `NotLoggedIn` or a storage failure.
    pub async fn stats(&self) -> Result<StudyStats, StudyError> {
        self.require_user()?;
        let progress = self.progress.read().await?;
        let completion = self
            .curriculum
            .grades()
            .map(|grade| {
                navigation::completion_percentage(
                    &self.curriculum,
                    grade,
                    &progress.completed_lessons,
                )
                .map(|percent| GradeCompletion { grade, percent })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(StudyStats {
            progress,
            study_time: self.timer.elapsed(self.clock.now()),
            completion,
        })
    }

    //
    // ─── INTERNALS ─────────────────────────────────────────────────────────────
    //

    fn require_user(&self) -> Result<&UserSession, StudyError> {
        self.user.as_ref().ok_or(StudyError::NotLoggedIn)
    }

    fn quiz_mut(&mut self) -> Result<&mut QuizSession, StudyError> {
        self.quiz.as_mut().ok_or(StudyError::NoQuiz)
    }

    /// Install a new navigation state and drop whatever no longer fits it:
    /// the quiz outside the quiz screen, the chat without a selected lesson.
    fn commit(&mut self, next: NavigationState) {
        self.navigation = next;
        if self.navigation.screen().kind() != ScreenKind::Quiz && self.quiz.take().is_some() {
            tracing::debug!("quiz discarded");
        }
        if self.navigation.selected_lesson().is_none() && self.chat.take().is_some() {
            tracing::debug!("chat session closed");
        }
    }

    async fn record_pending(&mut self) -> Result<bool, StudyError> {
        let Some(result) = self.unrecorded.clone() else {
            return Ok(false);
        };
        self.progress
            .record_quiz_result(result.correct, result.total)
            .await?;
        self.unrecorded = None;
        tracing::info!(
            lesson = %result.lesson_id,
            points = result.points(),
            "quiz result recorded"
        );
        Ok(true)
    }
}
