use serde::{Deserialize, Serialize};

use crate::model::ids::{Grade, LessonId};

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A multiple-choice question attached to a lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(rename = "question")]
    pub prompt: String,
    pub options: Vec<String>,
    /// Index into `options`.
    pub correct_answer: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl Question {
    #[must_use]
    pub fn option_count(&self) -> usize {
        self.options.len()
    }

    /// Text of the correct option, if the index is in range.
    #[must_use]
    pub fn correct_option(&self) -> Option<&str> {
        self.options.get(self.correct_answer).map(String::as_str)
    }

    #[must_use]
    pub fn is_correct(&self, option: usize) -> bool {
        option == self.correct_answer
    }
}

//
// ─── LESSON ────────────────────────────────────────────────────────────────────
//

/// A unit of instructional content, optionally paired with a quiz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: LessonId,
    pub title: String,
    pub topic: String,
    pub summary: String,
    #[serde(default)]
    pub key_points: Vec<String>,
    pub grade: Grade,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub questions: Vec<Question>,
}

impl Lesson {
    /// A lesson without questions cannot start a quiz.
    #[must_use]
    pub fn has_quiz(&self) -> bool {
        !self.questions.is_empty()
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }
}
