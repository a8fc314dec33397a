#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod progress_service;
pub mod quiz;
pub mod resume_service;
pub mod scorer;

pub use learnpath_core::Clock;

pub use app_services::AppServices;
pub use error::{AppServicesError, ErrorKind, ProgressError, QuizError, ResumeError, ScorerError};
pub use progress_service::{ProgressService, ProgressSnapshot};
pub use quiz::{
    GradedQuestion, QuizContext, QuizPhase, QuizRun, QuizService, QuizSession, SubmitTrigger,
    TickOutcome,
};
pub use resume_service::ResumeService;
pub use scorer::{HttpScorer, QuizScorer, ScoreRequest, ScoreResponse, ScorerConfig};
