//! Timed, gated quiz visits.
//!
//! `QuizSession` is the pure state machine, `QuizService` does the I/O around it and
//! `QuizRun` drives the countdown.

mod runner;
mod service;
mod session;

pub use runner::QuizRun;
pub use service::QuizService;
pub use session::{
    GradedQuestion, QuizContext, QuizPhase, QuizSession, SubmitTrigger, TickOutcome,
};
