mod curriculum;
mod ids;
mod lesson;
mod progress;

pub use curriculum::{Curriculum, CurriculumError};
pub use ids::{Grade, LessonId, ParseIdError};
pub use lesson::{Lesson, Question};
pub use progress::{POINTS_PER_CORRECT, ProgressSnapshot, QuizResult};
