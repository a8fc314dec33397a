mod course;
mod ids;
mod progress;
mod quiz;

pub use ids::{CourseId, IdError, LessonId, MAX_ID_LEN, StudentId};

pub use course::{Course, CourseError, Lesson, Module, Week};
pub use progress::{CompletedSet, Progress};
pub use quiz::{
    Feedback, GuidanceBand, PASS_THRESHOLD, Question, QuestionKind, Quiz, QuizAttempt,
    REWATCH_THRESHOLD, SECONDS_PER_QUESTION, Score, ScoreError,
};
