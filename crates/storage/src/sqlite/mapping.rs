use learnpath_core::model::{CourseId, Feedback, LessonId, QuizAttempt, Score, StudentId};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::Row;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(crate) fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, StorageError> {
    serde_json::to_string(value).map_err(ser)
}

pub(crate) fn from_json<T: DeserializeOwned>(field: &'static str, raw: &str) -> Result<T, StorageError> {
    serde_json::from_str(raw)
        .map_err(|e| StorageError::Serialization(format!("invalid {field} document: {e}")))
}

pub(crate) fn lesson_id_from_str(raw: String) -> Result<LessonId, StorageError> {
    LessonId::new(raw).map_err(ser)
}

pub(crate) fn student_id_from_str(raw: String) -> Result<StudentId, StorageError> {
    StudentId::new(raw).map_err(ser)
}

pub(crate) fn course_id_from_str(raw: String) -> Result<CourseId, StorageError> {
    CourseId::new(raw).map_err(ser)
}

pub(crate) fn bool_to_i64(value: bool) -> i64 {
    i64::from(value)
}

pub(crate) fn bool_from_i64(field: &'static str, value: i64) -> Result<bool, StorageError> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(StorageError::Serialization(format!(
            "invalid {field}: {other}"
        ))),
    }
}

/// Maps a `quiz_attempts` row back into a domain attempt.
///
/// The stored `passed` flag must agree with the score; a mismatch means the row
/// was written outside this crate and is rejected.
pub(crate) fn map_attempt_row(row: &sqlx::sqlite::SqliteRow) -> Result<QuizAttempt, StorageError> {
    let lesson_id = lesson_id_from_str(row.try_get::<String, _>("lesson_id").map_err(ser)?)?;
    let answers: Vec<String> =
        from_json("answers", &row.try_get::<String, _>("answers").map_err(ser)?)?;
    let feedback: Vec<Feedback> =
        from_json("feedback", &row.try_get::<String, _>("feedback").map_err(ser)?)?;
    let score = Score::new(row.try_get::<i64, _>("score").map_err(ser)?).map_err(ser)?;
    let passed = bool_from_i64("passed", row.try_get::<i64, _>("passed").map_err(ser)?)?;
    let submitted_at = row.try_get("submitted_at").map_err(ser)?;

    let attempt = QuizAttempt::new(lesson_id, answers, feedback, score, submitted_at);
    if attempt.passed != passed {
        return Err(StorageError::Serialization(format!(
            "passed flag disagrees with score {} for lesson {}",
            score.value(),
            attempt.lesson_id
        )));
    }
    Ok(attempt)
}
