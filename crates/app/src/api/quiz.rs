use axum::Json;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};

use learnpath_core::model::{
    CourseId, Feedback, GuidanceBand, LessonId, Quiz, QuizAttempt, StudentId,
};

use super::ApiError;
use crate::AppState;

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitQuizRequest {
    pub student_id: String,
    pub course_id: String,
    pub lesson_id: String,
    #[serde(default)]
    pub answers: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitQuizResponse {
    pub score: u8,
    pub passed: bool,
    pub feedback: Vec<Feedback>,
    pub guidance: GuidanceBand,
    pub message: &'static str,
}

impl From<QuizAttempt> for SubmitQuizResponse {
    fn from(attempt: QuizAttempt) -> Self {
        let guidance = attempt.guidance();
        Self {
            score: attempt.score.value(),
            passed: attempt.passed,
            feedback: attempt.feedback,
            guidance,
            message: guidance.message(),
        }
    }
}

/// POST /api/progress/submit-quiz
///
/// Grades through the scorer, then stores the result as the lesson's attempt.
pub async fn submit_quiz(
    State(state): State<AppState>,
    Json(body): Json<SubmitQuizRequest>,
) -> Result<Json<SubmitQuizResponse>, ApiError> {
    let student = StudentId::new(body.student_id)?;
    let course = CourseId::new(body.course_id)?;
    let lesson = LessonId::new(body.lesson_id)?;
    let attempt = state
        .services
        .quiz()
        .submit_answers(&student, &course, &lesson, body.answers)
        .await?;
    Ok(Json(attempt.into()))
}

/// GET /api/quiz/:lesson
pub async fn get_quiz(
    State(state): State<AppState>,
    Path(lesson): Path<String>,
) -> Result<Json<Quiz>, ApiError> {
    let lesson = LessonId::new(lesson)?;
    let quiz = state.services.quiz().quiz_for_lesson(&lesson).await?;
    Ok(Json(quiz))
}
