use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{Grade, LessonId};
use crate::model::lesson::Lesson;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CurriculumError {
    #[error("curriculum has no grades")]
    Empty,

    #[error("grade {0} has no lessons")]
    EmptyGrade(Grade),

    #[error("lesson under grade {grade} has a blank id")]
    BlankLessonId { grade: Grade },

    #[error("lesson {lesson} declares grade {declared} but is filed under grade {filed_under}")]
    GradeMismatch {
        lesson: LessonId,
        declared: Grade,
        filed_under: Grade,
    },

    #[error("lesson id {0} is used more than once")]
    DuplicateLesson(LessonId),

    #[error("question {question} of lesson {lesson} needs at least 2 options")]
    TooFewOptions { lesson: LessonId, question: usize },

    #[error(
        "question {question} of lesson {lesson} marks option {index} correct but has {options} options"
    )]
    CorrectAnswerOutOfRange {
        lesson: LessonId,
        question: usize,
        index: usize,
        options: usize,
    },
}

//
// ─── CURRICULUM ────────────────────────────────────────────────────────────────
//

/// Static catalog of lessons grouped by grade.
///
/// Immutable once built; `new` is the only constructor and rejects catalogs that
/// would break navigation or scoring (empty grades, duplicate ids, bad answers).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<Grade, Vec<Lesson>>",
    into = "BTreeMap<Grade, Vec<Lesson>>"
)]
pub struct Curriculum {
    grades: BTreeMap<Grade, Vec<Lesson>>,
}

impl Curriculum {
    /// Validate and build a curriculum.
    ///
    /// # Errors
    ///
    /// Returns `CurriculumError` for the first structural problem found.
    pub fn new(grades: BTreeMap<Grade, Vec<Lesson>>) -> Result<Self, CurriculumError> {
        if grades.is_empty() {
            return Err(CurriculumError::Empty);
        }

        let mut seen: HashSet<&LessonId> = HashSet::new();
        for (grade, lessons) in &grades {
            if lessons.is_empty() {
                return Err(CurriculumError::EmptyGrade(*grade));
            }
            for lesson in lessons {
                validate_lesson(*grade, lesson)?;
                if !seen.insert(&lesson.id) {
                    return Err(CurriculumError::DuplicateLesson(lesson.id.clone()));
                }
            }
        }

        Ok(Self { grades })
    }

    /// Grades in ascending order.
    pub fn grades(&self) -> impl Iterator<Item = Grade> + '_ {
        self.grades.keys().copied()
    }

    #[must_use]
    pub fn contains_grade(&self, grade: Grade) -> bool {
        self.grades.contains_key(&grade)
    }

    /// Lessons of a grade in catalog order, or `None` for an unknown grade.
    #[must_use]
    pub fn lessons(&self, grade: Grade) -> Option<&[Lesson]> {
        self.grades.get(&grade).map(Vec::as_slice)
    }

    #[must_use]
    pub fn lesson(&self, id: &LessonId) -> Option<&Lesson> {
        self.grades
            .values()
            .flat_map(|lessons| lessons.iter())
            .find(|lesson| &lesson.id == id)
    }

    /// Distinct topic labels of a grade, in first-seen order.
    #[must_use]
    pub fn topics(&self, grade: Grade) -> Option<Vec<&str>> {
        let lessons = self.lessons(grade)?;
        let mut seen = HashSet::new();
        Some(
            lessons
                .iter()
                .map(|lesson| lesson.topic.as_str())
                .filter(|topic| seen.insert(*topic))
                .collect(),
        )
    }

    /// Lessons of a grade whose topic equals `topic`, in catalog order.
    #[must_use]
    pub fn lessons_in_topic(&self, grade: Grade, topic: &str) -> Option<Vec<&Lesson>> {
        let lessons = self.lessons(grade)?;
        Some(
            lessons
                .iter()
                .filter(|lesson| lesson.topic == topic)
                .collect(),
        )
    }

    /// `round(100 * completed / total)` for a grade, rounding halves up.
    #[must_use]
    pub fn completion_percentage(
        &self,
        grade: Grade,
        completed: &BTreeSet<LessonId>,
    ) -> Option<u8> {
        let lessons = self.lessons(grade)?;
        let total = lessons.len();
        let done = lessons
            .iter()
            .filter(|lesson| completed.contains(&lesson.id))
            .count();
        // total > 0 is guaranteed by `new`.
        let percent = (200 * done + total) / (2 * total);
        Some(u8::try_from(percent).unwrap_or(100))
    }

    #[must_use]
    pub fn lesson_count(&self) -> usize {
        self.grades.values().map(Vec::len).sum()
    }
}

impl TryFrom<BTreeMap<Grade, Vec<Lesson>>> for Curriculum {
    type Error = CurriculumError;

    fn try_from(grades: BTreeMap<Grade, Vec<Lesson>>) -> Result<Self, Self::Error> {
        Self::new(grades)
    }
}

impl From<Curriculum> for BTreeMap<Grade, Vec<Lesson>> {
    fn from(curriculum: Curriculum) -> Self {
        curriculum.grades
    }
}

fn validate_lesson(filed_under: Grade, lesson: &Lesson) -> Result<(), CurriculumError> {
    if lesson.id.is_blank() {
        return Err(CurriculumError::BlankLessonId { grade: filed_under });
    }
    if lesson.grade != filed_under {
        return Err(CurriculumError::GradeMismatch {
            lesson: lesson.id.clone(),
            declared: lesson.grade,
            filed_under,
        });
    }
    for (idx, question) in lesson.questions.iter().enumerate() {
        if question.options.len() < 2 {
            return Err(CurriculumError::TooFewOptions {
                lesson: lesson.id.clone(),
                question: idx,
            });
        }
        if question.correct_answer >= question.options.len() {
            return Err(CurriculumError::CorrectAnswerOutOfRange {
                lesson: lesson.id.clone(),
                question: idx,
                index: question.correct_answer,
                options: question.options.len(),
            });
        }
    }
    Ok(())
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::lesson::Question;

    fn lesson(id: &str, grade: u8, topic: &str) -> Lesson {
        Lesson {
            id: LessonId::new(id),
            title: format!("Lesson {id}"),
            topic: topic.to_string(),
            summary: String::new(),
            key_points: Vec::new(),
            grade: Grade::new(grade),
            questions: Vec::new(),
        }
    }

    fn sample() -> Curriculum {
        let mut grades = BTreeMap::new();
        grades.insert(
            Grade::new(11),
            vec![
                lesson("11-1", 11, "OS"),
                lesson("11-4", 11, "Hardware"),
                lesson("11-5", 11, "OS"),
                lesson("11-9", 11, "Safety"),
            ],
        );
        grades.insert(Grade::new(12), vec![lesson("12-A1", 12, "AI")]);
        Curriculum::new(grades).unwrap()
    }

    #[test]
    fn topics_are_distinct_in_first_seen_order() {
        let curriculum = sample();
        let topics = curriculum.topics(Grade::new(11)).unwrap();
        assert_eq!(topics, vec!["OS", "Hardware", "Safety"]);
    }

    #[test]
    fn lessons_in_topic_preserve_order() {
        let curriculum = sample();
        let ids: Vec<&str> = curriculum
            .lessons_in_topic(Grade::new(11), "OS")
            .unwrap()
            .into_iter()
            .map(|l| l.id.as_str())
            .collect();
        assert_eq!(ids, vec!["11-1", "11-5"]);
    }

    #[test]
    fn unknown_grade_is_not_an_empty_list() {
        let curriculum = sample();
        assert!(curriculum.topics(Grade::new(10)).is_none());
        assert!(curriculum.lessons_in_topic(Grade::new(10), "OS").is_none());
        assert!(
            curriculum
                .completion_percentage(Grade::new(10), &BTreeSet::new())
                .is_none()
        );
    }

    #[test]
    fn completion_percentage_rounds() {
        let curriculum = sample();
        let mut done = BTreeSet::new();
        assert_eq!(curriculum.completion_percentage(Grade::new(11), &done), Some(0));

        done.insert(LessonId::new("11-1"));
        assert_eq!(curriculum.completion_percentage(Grade::new(11), &done), Some(25));

        // Lessons of other grades do not count.
        done.insert(LessonId::new("12-A1"));
        assert_eq!(curriculum.completion_percentage(Grade::new(11), &done), Some(25));
        assert_eq!(curriculum.completion_percentage(Grade::new(12), &done), Some(100));

        done.insert(LessonId::new("11-4"));
        done.insert(LessonId::new("11-5"));
        done.insert(LessonId::new("11-9"));
        assert_eq!(curriculum.completion_percentage(Grade::new(11), &done), Some(100));
    }

    #[test]
    fn completion_percentage_rounds_half_up() {
        let mut grades = BTreeMap::new();
        grades.insert(
            Grade::new(11),
            vec![
                lesson("a", 11, "T"),
                lesson("b", 11, "T"),
                lesson("c", 11, "T"),
                lesson("d", 11, "T"),
                lesson("e", 11, "T"),
                lesson("f", 11, "T"),
                lesson("g", 11, "T"),
                lesson("h", 11, "T"),
            ],
        );
        let curriculum = Curriculum::new(grades).unwrap();
        // 1/8 = 12.5%
        let done = BTreeSet::from([LessonId::new("a")]);
        assert_eq!(curriculum.completion_percentage(Grade::new(11), &done), Some(13));
        // 3/8 = 37.5%
        let done = BTreeSet::from([LessonId::new("a"), LessonId::new("b"), LessonId::new("c")]);
        assert_eq!(curriculum.completion_percentage(Grade::new(11), &done), Some(38));
    }

    #[test]
    fn rejects_empty_grade() {
        let mut grades = BTreeMap::new();
        grades.insert(Grade::new(11), Vec::new());
        assert_eq!(
            Curriculum::new(grades).unwrap_err(),
            CurriculumError::EmptyGrade(Grade::new(11))
        );
    }

    #[test]
    fn rejects_duplicate_ids_across_grades() {
        let mut grades = BTreeMap::new();
        grades.insert(Grade::new(11), vec![lesson("x", 11, "T")]);
        grades.insert(Grade::new(12), vec![lesson("x", 12, "T")]);
        assert_eq!(
            Curriculum::new(grades).unwrap_err(),
            CurriculumError::DuplicateLesson(LessonId::new("x"))
        );
    }

    #[test]
    fn rejects_grade_mismatch() {
        let mut grades = BTreeMap::new();
        grades.insert(Grade::new(11), vec![lesson("x", 12, "T")]);
        assert!(matches!(
            Curriculum::new(grades).unwrap_err(),
            CurriculumError::GradeMismatch { .. }
        ));
    }

    #[test]
    fn rejects_bad_questions() {
        let mut bad = lesson("x", 11, "T");
        bad.questions.push(Question {
            prompt: "Q".into(),
            options: vec!["only".into()],
            correct_answer: 0,
            explanation: None,
        });
        let mut grades = BTreeMap::new();
        grades.insert(Grade::new(11), vec![bad.clone()]);
        assert!(matches!(
            Curriculum::new(grades).unwrap_err(),
            CurriculumError::TooFewOptions { question: 0, .. }
        ));

        bad.questions[0].options.push("two".into());
        bad.questions[0].correct_answer = 2;
        let mut grades = BTreeMap::new();
        grades.insert(Grade::new(11), vec![bad]);
        assert!(matches!(
            Curriculum::new(grades).unwrap_err(),
            CurriculumError::CorrectAnswerOutOfRange { index: 2, options: 2, .. }
        ));
    }

    #[test]
    fn deserializes_grade_keyed_object() {
        let json = r#"{
            "11": [
                { "id": "11-1", "topic": "OS", "title": "T", "summary": "S", "grade": 11 }
            ]
        }"#;
        let curriculum: Curriculum = serde_json::from_str(json).unwrap();
        assert!(curriculum.contains_grade(Grade::new(11)));
        assert_eq!(curriculum.lesson_count(), 1);
    }

    #[test]
    fn deserialization_runs_validation() {
        let json = r#"{ "11": [] }"#;
        assert!(serde_json::from_str::<Curriculum>(json).is_err());
    }
}
