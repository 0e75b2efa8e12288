use chrono::Duration;
use tinhoc_core::model::{Grade, ProgressSnapshot};

/// Share of a grade's lessons the user has opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradeCompletion {
    pub grade: Grade,
    pub percent: u8,
}

/// Dashboard figures for the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyStats {
    pub progress: ProgressSnapshot,
    pub study_time: Duration,
    pub completion: Vec<GradeCompletion>,
}

impl StudyStats {
    #[must_use]
    pub fn completion_for(&self, grade: Grade) -> Option<u8> {
        self.completion
            .iter()
            .find(|entry| entry.grade == grade)
            .map(|entry| entry.percent)
    }

    #[must_use]
    pub fn accuracy_percentage(&self) -> Option<u32> {
        self.progress.accuracy_percentage()
    }

    /// Study time as `H:MM:SS`.
    #[must_use]
    pub fn study_time_display(&self) -> String {
        let total = self.study_time.num_seconds().max(0);
        format!(
            "{}:{:02}:{:02}",
            total / 3600,
            (total % 3600) / 60,
            total % 60
        )
    }
}
