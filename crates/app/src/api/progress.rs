use axum::Json;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use learnpath_core::model::{CourseId, LessonId, StudentId};
use services::ProgressSnapshot;

use super::ApiError;
use crate::AppState;

/// Body of the mark/unmark endpoints. Ids are validated by the handler.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonRequest {
    pub student_id: String,
    pub course_id: String,
    pub lesson_id: String,
}

impl LessonRequest {
    fn ids(self) -> Result<(StudentId, CourseId, LessonId), ApiError> {
        Ok((
            StudentId::new(self.student_id)?,
            CourseId::new(self.course_id)?,
            LessonId::new(self.lesson_id)?,
        ))
    }
}

/// GET /api/progress/:student/:course
pub async fn get_progress(
    State(state): State<AppState>,
    Path((student, course)): Path<(String, String)>,
) -> Result<Json<ProgressSnapshot>, ApiError> {
    let student = StudentId::new(student)?;
    let course = CourseId::new(course)?;
    let snapshot = state.services.progress().snapshot(&student, &course).await?;
    Ok(Json(snapshot))
}

/// POST /api/progress/complete
pub async fn mark_complete(
    State(state): State<AppState>,
    Json(body): Json<LessonRequest>,
) -> Result<Json<Value>, ApiError> {
    let (student, course, lesson) = body.ids()?;
    let completed = state
        .services
        .progress()
        .mark_complete(&student, &course, &lesson)
        .await?;
    Ok(Json(json!({ "completedLessons": completed })))
}

/// POST /api/progress/uncomplete
pub async fn mark_incomplete(
    State(state): State<AppState>,
    Json(body): Json<LessonRequest>,
) -> Result<Json<Value>, ApiError> {
    let (student, course, lesson) = body.ids()?;
    let completed = state
        .services
        .progress()
        .mark_incomplete(&student, &course, &lesson)
        .await?;
    Ok(Json(json!({ "completedLessons": completed })))
}
