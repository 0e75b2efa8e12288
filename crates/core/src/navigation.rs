//! Position in the curriculum hierarchy (grade → topic → lesson) and the
//! screen shown for it.
//!
//! The screen carries its own selections, so a topic without a grade or a quiz
//! without a lesson cannot be expressed. Every failed transition leaves the
//! state untouched.

use std::collections::BTreeSet;
use std::fmt;

use thiserror::Error;

use crate::model::{Curriculum, Grade, Lesson, LessonId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum NavigationError {
    #[error("grade {0} is not part of the curriculum")]
    InvalidGrade(Grade),

    #[error("no grade selected")]
    NoGradeSelected,

    #[error("no topic selected")]
    NoTopicSelected,

    #[error("topic {topic:?} has no lessons in grade {grade}")]
    InvalidTopic { grade: Grade, topic: String },

    #[error("lesson {lesson} is not in topic {topic:?} of grade {grade}")]
    LessonNotInTopic {
        lesson: LessonId,
        grade: Grade,
        topic: String,
    },

    #[error("no lesson selected")]
    NoLessonSelected,

    #[error("lesson {0} has no questions")]
    NoQuestions(LessonId),

    #[error("not on the quiz screen")]
    NotInQuiz,
}

//
// ─── SCREEN ────────────────────────────────────────────────────────────────────
//

/// The current view together with the selections it depends on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Screen {
    #[default]
    Home,
    TopicList {
        grade: Grade,
    },
    LessonList {
        grade: Grade,
        topic: String,
    },
    LessonDetail {
        grade: Grade,
        topic: String,
        lesson: LessonId,
    },
    Quiz {
        grade: Grade,
        topic: String,
        lesson: LessonId,
    },
}

/// Tag of a `Screen` without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScreenKind {
    Home,
    TopicList,
    LessonList,
    LessonDetail,
    Quiz,
}

impl Screen {
    #[must_use]
    pub fn kind(&self) -> ScreenKind {
        match self {
            Screen::Home => ScreenKind::Home,
            Screen::TopicList { .. } => ScreenKind::TopicList,
            Screen::LessonList { .. } => ScreenKind::LessonList,
            Screen::LessonDetail { .. } => ScreenKind::LessonDetail,
            Screen::Quiz { .. } => ScreenKind::Quiz,
        }
    }

    /// The screen one level up, dropping the deepest selection.
    #[must_use]
    fn parent(&self) -> Screen {
        match self {
            Screen::Home | Screen::TopicList { .. } => Screen::Home,
            Screen::LessonList { grade, .. } => Screen::TopicList { grade: *grade },
            Screen::LessonDetail { grade, topic, .. } => Screen::LessonList {
                grade: *grade,
                topic: topic.clone(),
            },
            Screen::Quiz {
                grade,
                topic,
                lesson,
            } => Screen::LessonDetail {
                grade: *grade,
                topic: topic.clone(),
                lesson: lesson.clone(),
            },
        }
    }
}

impl fmt::Display for ScreenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            ScreenKind::Home => "home",
            ScreenKind::TopicList => "topic-list",
            ScreenKind::LessonList => "lesson-list",
            ScreenKind::LessonDetail => "lesson-detail",
            ScreenKind::Quiz => "quiz",
        };
        f.write_str(tag)
    }
}

//
// ─── NAVIGATION STATE ──────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationState {
    screen: Screen,
}

impl NavigationState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    #[must_use]
    pub fn selected_grade(&self) -> Option<Grade> {
        match &self.screen {
            Screen::Home => None,
            Screen::TopicList { grade }
            | Screen::LessonList { grade, .. }
            | Screen::LessonDetail { grade, .. }
            | Screen::Quiz { grade, .. } => Some(*grade),
        }
    }

    #[must_use]
    pub fn selected_topic(&self) -> Option<&str> {
        match &self.screen {
            Screen::Home | Screen::TopicList { .. } => None,
            Screen::LessonList { topic, .. }
            | Screen::LessonDetail { topic, .. }
            | Screen::Quiz { topic, .. } => Some(topic),
        }
    }

    #[must_use]
    pub fn selected_lesson(&self) -> Option<&LessonId> {
        match &self.screen {
            Screen::LessonDetail { lesson, .. } | Screen::Quiz { lesson, .. } => Some(lesson),
            _ => None,
        }
    }

    /// Select a grade from any screen; clears topic and lesson.
    ///
    /// # Errors
    ///
    /// Returns `NavigationError::InvalidGrade` if the curriculum lacks the grade.
    pub fn select_grade(
        &mut self,
        curriculum: &Curriculum,
        grade: Grade,
    ) -> Result<(), NavigationError> {
        if !curriculum.contains_grade(grade) {
            return Err(NavigationError::InvalidGrade(grade));
        }
        self.screen = Screen::TopicList { grade };
        Ok(())
    }

    /// Select a topic of the current grade; clears the lesson.
    ///
    /// # Errors
    ///
    /// Returns `NoGradeSelected` without a grade and `InvalidTopic` if no lesson
    /// of the grade carries the topic.
    pub fn select_topic(
        &mut self,
        curriculum: &Curriculum,
        topic: &str,
    ) -> Result<(), NavigationError> {
        let grade = self
            .selected_grade()
            .ok_or(NavigationError::NoGradeSelected)?;
        let lessons = lessons_for_topic(curriculum, grade, topic)?;
        if lessons.is_empty() {
            return Err(NavigationError::InvalidTopic {
                grade,
                topic: topic.to_string(),
            });
        }
        self.screen = Screen::LessonList {
            grade,
            topic: topic.to_string(),
        };
        Ok(())
    }

    /// Open a lesson of the current grade/topic.
    ///
    /// Returns the opened lesson so the caller can run the side effects of
    /// opening it (chat session, progress).
    ///
    /// # Errors
    ///
    /// Returns `NoGradeSelected`/`NoTopicSelected` when the hierarchy is not
    /// filled in and `LessonNotInTopic` for a lesson outside the current filter.
    pub fn select_lesson<'c>(
        &mut self,
        curriculum: &'c Curriculum,
        lesson_id: &LessonId,
    ) -> Result<&'c Lesson, NavigationError> {
        let grade = self
            .selected_grade()
            .ok_or(NavigationError::NoGradeSelected)?;
        let topic = self
            .selected_topic()
            .ok_or(NavigationError::NoTopicSelected)?
            .to_string();

        let lesson = lessons_for_topic(curriculum, grade, &topic)?
            .into_iter()
            .find(|lesson| &lesson.id == lesson_id)
            .ok_or_else(|| NavigationError::LessonNotInTopic {
                lesson: lesson_id.clone(),
                grade,
                topic: topic.clone(),
            })?;

        self.screen = Screen::LessonDetail {
            grade,
            topic,
            lesson: lesson.id.clone(),
        };
        Ok(lesson)
    }

    /// Enter the quiz screen for the selected lesson.
    ///
    /// # Errors
    ///
    /// Returns `NoLessonSelected` without a lesson and `NoQuestions` if the lesson
    /// has no quiz.
    pub fn start_quiz<'c>(
        &mut self,
        curriculum: &'c Curriculum,
    ) -> Result<&'c Lesson, NavigationError> {
        let lesson = self
            .current_lesson(curriculum)
            .ok_or(NavigationError::NoLessonSelected)?;
        if !lesson.has_quiz() {
            return Err(NavigationError::NoQuestions(lesson.id.clone()));
        }

        if let Screen::LessonDetail {
            grade,
            topic,
            lesson: id,
        } = &self.screen
        {
            self.screen = Screen::Quiz {
                grade: *grade,
                topic: topic.clone(),
                lesson: id.clone(),
            };
        }
        Ok(lesson)
    }

    /// Leave the quiz screen back to the lesson.
    ///
    /// # Errors
    ///
    /// Returns `NavigationError::NotInQuiz` on any other screen.
    pub fn finish_quiz(&mut self) -> Result<(), NavigationError> {
        if self.screen.kind() != ScreenKind::Quiz {
            return Err(NavigationError::NotInQuiz);
        }
        self.screen = self.screen.parent();
        Ok(())
    }

    /// Step one level up. On `Home` this is a no-op.
    pub fn go_back(&mut self) -> &Screen {
        self.screen = self.screen.parent();
        &self.screen
    }

    pub fn reset(&mut self) {
        self.screen = Screen::Home;
    }

    /// The selected lesson looked up in the curriculum.
    #[must_use]
    pub fn current_lesson<'c>(&self, curriculum: &'c Curriculum) -> Option<&'c Lesson> {
        curriculum.lesson(self.selected_lesson()?)
    }

    /// Topics of the selected grade.
    ///
    /// # Errors
    ///
    /// Returns `NoGradeSelected` without a grade.
    pub fn topics<'c>(&self, curriculum: &'c Curriculum) -> Result<Vec<&'c str>, NavigationError> {
        let grade = self
            .selected_grade()
            .ok_or(NavigationError::NoGradeSelected)?;
        topics_for_grade(curriculum, grade)
    }

    /// Lessons of the selected grade and topic.
    ///
    /// # Errors
    ///
    /// Returns `NoGradeSelected`/`NoTopicSelected` when the selection is missing.
    pub fn lessons<'c>(
        &self,
        curriculum: &'c Curriculum,
    ) -> Result<Vec<&'c Lesson>, NavigationError> {
        let grade = self
            .selected_grade()
            .ok_or(NavigationError::NoGradeSelected)?;
        let topic = self
            .selected_topic()
            .ok_or(NavigationError::NoTopicSelected)?;
        lessons_for_topic(curriculum, grade, topic)
    }
}

//
// ─── DERIVED VIEWS ─────────────────────────────────────────────────────────────
//

/// Distinct topics of `grade` in first-occurrence order.
///
/// # Errors
///
/// Returns `NavigationError::InvalidGrade` for a grade absent from the curriculum.
pub fn topics_for_grade(
    curriculum: &Curriculum,
    grade: Grade,
) -> Result<Vec<&str>, NavigationError> {
    curriculum
        .topics(grade)
        .ok_or(NavigationError::InvalidGrade(grade))
}

/// Lessons of `grade` whose topic equals `topic`, in curriculum order.
///
/// # Errors
///
/// Returns `NavigationError::InvalidGrade` for a grade absent from the curriculum.
pub fn lessons_for_topic<'c>(
    curriculum: &'c Curriculum,
    grade: Grade,
    topic: &str,
) -> Result<Vec<&'c Lesson>, NavigationError> {
    curriculum
        .lessons_in_topic(grade, topic)
        .ok_or(NavigationError::InvalidGrade(grade))
}

/// Whole-number share of the grade's lessons that appear in `completed`.
///
/// # Errors
///
/// Returns `NavigationError::InvalidGrade` for a grade absent from the curriculum.
pub fn completion_percentage(
    curriculum: &Curriculum,
    grade: Grade,
    completed: &BTreeSet<LessonId>,
) -> Result<u8, NavigationError> {
    curriculum
        .completion_percentage(grade, completed)
        .ok_or(NavigationError::InvalidGrade(grade))
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
