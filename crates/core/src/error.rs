use thiserror::Error;

use crate::model::{CourseError, IdError, ScoreError};

/// Umbrella error for the domain layer.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Id(#[from] IdError),
    #[error(transparent)]
    Course(#[from] CourseError),
    #[error(transparent)]
    Score(#[from] ScoreError),
}
