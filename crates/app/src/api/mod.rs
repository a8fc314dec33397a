mod error;
mod health;
mod progress;
mod quiz;
mod resume;

pub use error::ApiError;
pub use health::{HealthResponse, health_check, health_routes};
pub use progress::{LessonRequest, get_progress, mark_complete, mark_incomplete};
pub use quiz::{SubmitQuizRequest, SubmitQuizResponse, get_quiz, submit_quiz};
pub use resume::get_resume;
