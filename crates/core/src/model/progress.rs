use std::collections::BTreeSet;

use crate::model::ids::{Grade, LessonId};

/// Points awarded for every correct quiz answer.
pub const POINTS_PER_CORRECT: u32 = 10;

/// Progress delta emitted when a quiz session completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizResult {
    pub lesson_id: LessonId,
    pub correct: u32,
    pub total: u32,
}

impl QuizResult {
    #[must_use]
    pub fn points(&self) -> u32 {
        self.correct.saturating_mul(POINTS_PER_CORRECT)
    }
}

/// Aggregate, cross-lesson statistics for the signed-in user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub display_name: String,
    pub grade: Option<Grade>,
    pub total_correct: u32,
    pub total_questions: u32,
    pub completed_lessons: BTreeSet<LessonId>,
    pub total_points: u32,
}

impl ProgressSnapshot {
    #[must_use]
    pub fn for_user(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            ..Self::default()
        }
    }

    /// Marks a lesson opened. Returns `false` if it was already recorded.
    pub fn mark_lesson_opened(&mut self, lesson: &LessonId) -> bool {
        if self.completed_lessons.contains(lesson) {
            return false;
        }
        self.completed_lessons.insert(lesson.clone())
    }

    /// Adds one quiz outcome to the cumulative totals.
    ///
    /// Repeated attempts at the same lesson are counted again.
    pub fn record_quiz_result(&mut self, correct: u32, total: u32) {
        self.total_correct = self.total_correct.saturating_add(correct);
        self.total_questions = self.total_questions.saturating_add(total);
        self.total_points = self
            .total_points
            .saturating_add(correct.saturating_mul(POINTS_PER_CORRECT));
    }

    /// Share of answered questions that were correct, rounded to a whole percent.
    #[must_use]
    pub fn accuracy_percentage(&self) -> Option<u32> {
        if self.total_questions == 0 {
            return None;
        }
        let correct = u64::from(self.total_correct);
        let total = u64::from(self.total_questions);
        u32::try_from((200 * correct + total) / (2 * total)).ok()
    }
}
