//! Shared error types for the services crate.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use learnpath_core::model::{CourseId, LessonId, StudentId};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

use crate::quiz::QuizPhase;

/// Caller-facing error category. Transports map this to status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    NotFound,
    Validation,
    ScoringUnavailable,
    InconsistentState,
    Locked,
    Storage,
}

impl ErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "notFound",
            Self::Validation => "validation",
            Self::ScoringUnavailable => "scoringUnavailable",
            Self::InconsistentState => "inconsistentState",
            Self::Locked => "locked",
            Self::Storage => "storage",
        }
    }
}

fn storage_kind(err: &StorageError) -> ErrorKind {
    match err {
        StorageError::NotFound => ErrorKind::NotFound,
        _ => ErrorKind::Storage,
    }
}

/// Errors emitted by `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("course {0} not found")]
    CourseNotFound(CourseId),
    #[error("no progress recorded for student {student} in course {course}")]
    ProgressNotFound { student: StudentId, course: CourseId },
    #[error("lesson {lesson} is not part of course {course}")]
    LessonNotInCourse { lesson: LessonId, course: CourseId },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ProgressError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CourseNotFound(_) | Self::ProgressNotFound { .. } => ErrorKind::NotFound,
            Self::LessonNotInCourse { .. } => ErrorKind::Validation,
            Self::Storage(err) => storage_kind(err),
        }
    }
}

/// Errors emitted by `ResumeService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ResumeError {
    #[error("course {0} not found")]
    CourseNotFound(CourseId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ResumeError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CourseNotFound(_) => ErrorKind::NotFound,
            Self::Storage(err) => storage_kind(err),
        }
    }
}

/// Errors emitted by quiz scorers.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ScorerError {
    #[error("scorer request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("scorer reported an error: {0}")]
    Rejected(String),
    #[error("scorer did not answer within {0:?}")]
    Timeout(Duration),
    #[error("scorer is unavailable: {0}")]
    Unavailable(String),
}

/// Errors emitted by `QuizService` and `QuizSession`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizError {
    #[error("course {0} not found")]
    CourseNotFound(CourseId),
    #[error("lesson {lesson} is not part of course {course}")]
    LessonNotInCourse { lesson: LessonId, course: CourseId },
    #[error("no quiz for lesson {0}")]
    NoQuiz(LessonId),
    #[error("quiz for lesson {0} is locked until the lesson is completed")]
    Locked(LessonId),
    #[error("quiz for lesson {0} has no questions")]
    EmptyQuiz(LessonId),
    #[error("cannot {action} while the quiz is {phase:?}")]
    InvalidPhase { action: &'static str, phase: QuizPhase },
    #[error("question {index} is out of range for a quiz of {len}")]
    QuestionOutOfRange { index: usize, len: usize },
    #[error("questions {0:?} have no answer")]
    Unanswered(Vec<usize>),
    #[error("{answers} answers submitted for {questions} questions")]
    AnswerCountMismatch { answers: usize, questions: usize },
    #[error("scorer returned {feedback} verdicts for {questions} questions")]
    FeedbackMismatch { feedback: usize, questions: usize },
    #[error("no graded attempt is waiting to be saved")]
    NothingPending,
    #[error(transparent)]
    Scoring(#[from] ScorerError),
    #[error("graded attempt could not be saved: {0}")]
    Persist(StorageError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl QuizError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CourseNotFound(_) | Self::NoQuiz(_) => ErrorKind::NotFound,
            Self::LessonNotInCourse { .. }
            | Self::InvalidPhase { .. }
            | Self::QuestionOutOfRange { .. }
            | Self::Unanswered(_)
            | Self::NothingPending => ErrorKind::Validation,
            Self::Locked(_) => ErrorKind::Locked,
            Self::EmptyQuiz(_)
            | Self::AnswerCountMismatch { .. }
            | Self::FeedbackMismatch { .. } => ErrorKind::InconsistentState,
            Self::Scoring(_) => ErrorKind::ScoringUnavailable,
            Self::Persist(_) => ErrorKind::Storage,
            Self::Storage(err) => storage_kind(err),
        }
    }
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
