#![forbid(unsafe_code)]

//! HTTP surface for progress tracking, resume and quiz submission.

use axum::Router;
use tower_http::trace::TraceLayer;

use services::AppServices;

pub mod api;
pub mod config;

/// Application state shared across HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub services: AppServices,
}

impl AppState {
    #[must_use]
    pub fn new(services: AppServices) -> Self {
        Self { services }
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    let api = Router::new()
        .route("/api/progress/complete", post(api::mark_complete))
        .route("/api/progress/uncomplete", post(api::mark_incomplete))
        .route("/api/progress/submit-quiz", post(api::submit_quiz))
        .route("/api/progress/:student/:course", get(api::get_progress))
        .route("/api/resume/:student/:course", get(api::get_resume))
        .route("/api/quiz/:lesson", get(api::get_quiz));

    Router::new()
        .merge(api)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
