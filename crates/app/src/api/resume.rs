use axum::Json;
use axum::extract::{Path, State};

use learnpath_core::ResumeState;
use learnpath_core::model::{CourseId, StudentId};

use super::ApiError;
use crate::AppState;

/// GET /api/resume/:student/:course
pub async fn get_resume(
    State(state): State<AppState>,
    Path((student, course)): Path<(String, String)>,
) -> Result<Json<ResumeState>, ApiError> {
    let student = StudentId::new(student)?;
    let course = CourseId::new(course)?;
    let resume = state.services.resume().resume(&student, &course).await?;
    Ok(Json(resume))
}
