use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use learnpath_core::model::IdError;
use services::{ErrorKind, ProgressError, QuizError, ResumeError};

/// Error returned by every handler: a taxonomy kind plus a readable message.
#[derive(Debug)]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ApiError {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self.kind {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::ScoringUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::InconsistentState => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::Locked => StatusCode::FORBIDDEN,
            ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<IdError> for ApiError {
    fn from(err: IdError) -> Self {
        Self::new(ErrorKind::Validation, err.to_string())
    }
}

impl From<ProgressError> for ApiError {
    fn from(err: ProgressError) -> Self {
        Self::new(err.kind(), err.to_string())
    }
}

impl From<ResumeError> for ApiError {
    fn from(err: ResumeError) -> Self {
        Self::new(err.kind(), err.to_string())
    }
}

impl From<QuizError> for ApiError {
    fn from(err: QuizError) -> Self {
        Self::new(err.kind(), err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(kind = self.kind.as_str(), message = %self.message, "request failed");
        }
        let body = Json(json!({
            "error": self.kind.as_str(),
            "message": self.message,
        }));
        (status, body).into_response()
    }
}
