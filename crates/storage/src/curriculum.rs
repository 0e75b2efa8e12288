//! Curriculum sources. The catalog is read once at startup and never written
//! back.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tinhoc_core::model::Curriculum;

/// Grade 11 and 12 informatics catalog shipped with the app.
const BUILTIN_CURRICULUM: &str = include_str!("../assets/curriculum.json");

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CurriculumLoadError {
    #[error("failed to read curriculum {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed JSON or a catalog rejected by `Curriculum::new`.
    #[error("invalid curriculum: {0}")]
    Invalid(#[from] serde_json::Error),
}

/// Source of the immutable lesson catalog.
pub trait CurriculumProvider {
    /// Load the full curriculum.
    ///
    /// # Errors
    ///
    /// Returns `CurriculumLoadError` if the source cannot be read or parsed.
    fn load(&self) -> Result<Curriculum, CurriculumLoadError>;
}

/// The embedded catalog.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinCurriculum;

impl CurriculumProvider for BuiltinCurriculum {
    fn load(&self) -> Result<Curriculum, CurriculumLoadError> {
        let curriculum = parse(BUILTIN_CURRICULUM)?;
        tracing::debug!(
            lessons = curriculum.lesson_count(),
            "loaded built-in curriculum"
        );
        Ok(curriculum)
    }
}

/// A catalog in the same JSON shape as the embedded one, read from disk.
#[derive(Debug, Clone)]
pub struct JsonFileCurriculum {
    path: PathBuf,
}

impl JsonFileCurriculum {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CurriculumProvider for JsonFileCurriculum {
    fn load(&self) -> Result<Curriculum, CurriculumLoadError> {
        let raw = std::fs::read_to_string(&self.path).map_err(|source| CurriculumLoadError::Io {
            path: self.path.clone(),
            source,
        })?;
        let curriculum = parse(&raw)?;
        tracing::info!(
            path = %self.path.display(),
            lessons = curriculum.lesson_count(),
            "loaded curriculum file"
        );
        Ok(curriculum)
    }
}

/// Parse a grade-keyed JSON catalog (`{"11": [lesson, ...], ...}`).
///
/// # Errors
///
/// Returns `CurriculumLoadError::Invalid` for malformed or inconsistent input.
pub fn parse(raw: &str) -> Result<Curriculum, CurriculumLoadError> {
    Ok(serde_json::from_str(raw)?)
}
