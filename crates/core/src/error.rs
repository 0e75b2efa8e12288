use thiserror::Error;

use crate::model::CurriculumError;
use crate::navigation::NavigationError;
use crate::quiz::QuizError;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Curriculum(#[from] CurriculumError),
    #[error(transparent)]
    Navigation(#[from] NavigationError),
    #[error(transparent)]
    Quiz(#[from] QuizError),
}
