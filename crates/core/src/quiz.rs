//! Quiz session state machine over a lesson's question set.
//!
//! `NotStarted -> Active { index } -> Completed`. Starting a new attempt replaces
//! whatever the session held before; there is no way back from `Completed`
//! except another `start`.

use thiserror::Error;

use crate::model::{Lesson, LessonId, Question, QuizResult};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("lesson {0} has no questions")]
    NoQuestions(LessonId),

    #[error("quiz is not in progress")]
    NotActive,

    #[error("quiz is not completed yet")]
    NotCompleted,

    #[error("question {index} has no answer selected")]
    NoAnswerSelected { index: usize },

    #[error("option {option} is out of range for a question with {options} options")]
    OptionOutOfRange { option: usize, options: usize },
}

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizState {
    NotStarted,
    Active { index: usize },
    Completed,
}

/// Outcome of `QuizSession::advance`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// Moved on to the question at `index`.
    Next { index: usize },
    /// The last question was answered; the delta to feed into progress.
    Completed(QuizResult),
}

/// Aggregated view of quiz progress, useful for UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizProgress {
    pub total: usize,
    pub answered: usize,
    pub index: usize,
}

/// Per-question line of the post-quiz review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionReview {
    pub index: usize,
    pub prompt: String,
    pub selected: Option<usize>,
    pub correct_answer: usize,
    pub correct_option: String,
    pub explanation: Option<String>,
    pub is_correct: bool,
}

/// Final score of a completed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizScore {
    pub lesson_id: LessonId,
    pub correct: usize,
    pub total: usize,
    pub review: Vec<QuestionReview>,
}

#[derive(Debug, Clone)]
struct Attempt {
    lesson_id: LessonId,
    questions: Vec<Question>,
    answers: Vec<Option<usize>>,
    index: usize,
    completed: bool,
}

impl Attempt {
    fn correct_count(&self) -> usize {
        self.questions
            .iter()
            .zip(&self.answers)
            .filter(|(question, answer)| **answer == Some(question.correct_answer))
            .count()
    }
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One attempt at a lesson's question set.
#[derive(Debug, Clone, Default)]
pub struct QuizSession {
    attempt: Option<Attempt>,
}

impl QuizSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a session that is already started on `lesson`.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NoQuestions` if the lesson has no questions.
    pub fn for_lesson(lesson: &Lesson) -> Result<Self, QuizError> {
        let mut session = Self::new();
        session.start(lesson)?;
        Ok(session)
    }

    /// Start (or restart) an attempt with one unanswered slot per question.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NoQuestions` if the lesson has no questions; the
    /// session is left as it was.
    pub fn start(&mut self, lesson: &Lesson) -> Result<(), QuizError> {
        if !lesson.has_quiz() {
            return Err(QuizError::NoQuestions(lesson.id.clone()));
        }
        self.attempt = Some(Attempt {
            lesson_id: lesson.id.clone(),
            questions: lesson.questions.clone(),
            answers: vec![None; lesson.questions.len()],
            index: 0,
            completed: false,
        });
        Ok(())
    }

    #[must_use]
    pub fn state(&self) -> QuizState {
        match &self.attempt {
            None => QuizState::NotStarted,
            Some(attempt) if attempt.completed => QuizState::Completed,
            Some(attempt) => QuizState::Active {
                index: attempt.index,
            },
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self.state(), QuizState::Active { .. })
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self.state(), QuizState::Completed)
    }

    #[must_use]
    pub fn lesson_id(&self) -> Option<&LessonId> {
        self.attempt.as_ref().map(|attempt| &attempt.lesson_id)
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.attempt
            .as_ref()
            .map_or(0, |attempt| attempt.questions.len())
    }

    /// Index of the current question while active.
    #[must_use]
    pub fn current_index(&self) -> Option<usize> {
        match self.state() {
            QuizState::Active { index } => Some(index),
            _ => None,
        }
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        let index = self.current_index()?;
        self.attempt.as_ref()?.questions.get(index)
    }

    /// Answer recorded for the current question, if any.
    #[must_use]
    pub fn selected_answer(&self) -> Option<usize> {
        let index = self.current_index()?;
        self.attempt.as_ref()?.answers.get(index).copied().flatten()
    }

    #[must_use]
    pub fn answers(&self) -> &[Option<usize>] {
        match &self.attempt {
            Some(attempt) => &attempt.answers,
            None => &[],
        }
    }

    /// Whether `advance` would succeed right now.
    #[must_use]
    pub fn can_advance(&self) -> bool {
        self.selected_answer().is_some()
    }

    #[must_use]
    pub fn is_last_question(&self) -> bool {
        match (self.current_index(), &self.attempt) {
            (Some(index), Some(attempt)) => index + 1 == attempt.questions.len(),
            _ => false,
        }
    }

    #[must_use]
    pub fn progress(&self) -> QuizProgress {
        let answers = self.answers();
        QuizProgress {
            total: answers.len(),
            answered: answers.iter().filter(|answer| answer.is_some()).count(),
            index: self.current_index().unwrap_or(answers.len()),
        }
    }

    /// Record (or overwrite) the answer for the current question.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NotActive` outside the active state and
    /// `QuizError::OptionOutOfRange` for an option the question does not have.
    pub fn select_answer(&mut self, option: usize) -> Result<(), QuizError> {
        let attempt = self.active_attempt_mut()?;
        let index = attempt.index;
        let options = attempt.questions[index].option_count();
        if option >= options {
            return Err(QuizError::OptionOutOfRange { option, options });
        }
        attempt.answers[index] = Some(option);
        Ok(())
    }

    /// Move past the current question, completing the quiz after the last one.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NotActive` outside the active state and
    /// `QuizError::NoAnswerSelected` if the current question is unanswered.
    pub fn advance(&mut self) -> Result<Advance, QuizError> {
        let attempt = self.active_attempt_mut()?;
        let index = attempt.index;
        if attempt.answers[index].is_none() {
            return Err(QuizError::NoAnswerSelected { index });
        }

        if index + 1 < attempt.questions.len() {
            attempt.index = index + 1;
            return Ok(Advance::Next {
                index: attempt.index,
            });
        }

        attempt.completed = true;
        let correct = attempt.correct_count();
        let total = attempt.questions.len();
        Ok(Advance::Completed(QuizResult {
            lesson_id: attempt.lesson_id.clone(),
            correct: u32::try_from(correct).unwrap_or(u32::MAX),
            total: u32::try_from(total).unwrap_or(u32::MAX),
        }))
    }

    /// Final score and per-question review.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NotCompleted` unless the quiz has been completed.
    pub fn score(&self) -> Result<QuizScore, QuizError> {
        let attempt = match &self.attempt {
            Some(attempt) if attempt.completed => attempt,
            _ => return Err(QuizError::NotCompleted),
        };

        let review = attempt
            .questions
            .iter()
            .zip(&attempt.answers)
            .enumerate()
            .map(|(index, (question, selected))| QuestionReview {
                index,
                prompt: question.prompt.clone(),
                selected: *selected,
                correct_answer: question.correct_answer,
                correct_option: question.correct_option().unwrap_or_default().to_string(),
                explanation: question.explanation.clone(),
                is_correct: *selected == Some(question.correct_answer),
            })
            .collect();

        Ok(QuizScore {
            lesson_id: attempt.lesson_id.clone(),
            correct: attempt.correct_count(),
            total: attempt.questions.len(),
            review,
        })
    }

    fn active_attempt_mut(&mut self) -> Result<&mut Attempt, QuizError> {
        match self.attempt.as_mut() {
            Some(attempt) if !attempt.completed => Ok(attempt),
            _ => Err(QuizError::NotActive),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
