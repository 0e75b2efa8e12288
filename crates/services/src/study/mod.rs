mod service;
mod stats;

pub use service::StudyService;
pub use stats::{GradeCompletion, StudyStats};
