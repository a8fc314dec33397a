#![forbid(unsafe_code)]

//! Pure domain layer for curriculum progress tracking and quiz gating.
//!
//! Nothing in this crate performs I/O. Storage and services build on top of it.

pub mod curriculum;
pub mod error;
pub mod gating;
pub mod model;
pub mod resume;
pub mod time;

pub use curriculum::{CurriculumIndex, LessonRef};
pub use error::Error;
pub use gating::{GatingPolicy, NextStep};
pub use resume::{ResumeLabel, ResumeResolver, ResumeState};
pub use time::Clock;
