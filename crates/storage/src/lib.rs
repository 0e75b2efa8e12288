#![forbid(unsafe_code)]

pub mod curriculum;
pub mod repository;

pub use curriculum::{BuiltinCurriculum, CurriculumLoadError, CurriculumProvider, JsonFileCurriculum};
pub use repository::{InMemoryProgressStore, ProgressStore, StorageError};
