use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::LessonId;

/// Minimum score (inclusive) that counts as a pass.
pub const PASS_THRESHOLD: u8 = 60;

/// Scores below this are steered towards re-watching the lesson.
pub const REWATCH_THRESHOLD: u8 = 30;

/// Seconds granted per question by the quiz countdown.
pub const SECONDS_PER_QUESTION: u32 = 60;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ScoreError {
    #[error("score must be between 0 and 100, got {0}")]
    OutOfRange(i64),
}

//
// ─── QUIZ DEFINITION ───────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    Mcq,
    Fill,
    Text,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub question: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default, alias = "correctAnswer")]
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// Quiz attached to a single lesson. Owned by authoring; read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub lesson_id: LessonId,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub generated: bool,
}

impl Quiz {
    #[must_use]
    pub fn new(lesson_id: LessonId, questions: Vec<Question>) -> Self {
        Self {
            lesson_id,
            questions,
            generated: false,
        }
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// A quiz without questions is treated as "no quiz for this lesson".
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Countdown length for a fresh attempt.
    #[must_use]
    pub fn time_limit_secs(&self) -> u32 {
        let count = u32::try_from(self.questions.len()).unwrap_or(u32::MAX);
        count.saturating_mul(SECONDS_PER_QUESTION)
    }
}

//
// ─── SCORING ───────────────────────────────────────────────────────────────────
//

/// Percentage score in `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Score(u8);

impl Score {
    /// # Errors
    ///
    /// Returns `ScoreError::OutOfRange` outside `0..=100`.
    pub fn new(value: i64) -> Result<Self, ScoreError> {
        u8::try_from(value)
            .ok()
            .filter(|v| *v <= 100)
            .map(Self)
            .ok_or(ScoreError::OutOfRange(value))
    }

    /// Rounds and clamps an arbitrary scorer value into range.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn clamped(value: f64) -> Self {
        if !value.is_finite() {
            return Self(0);
        }
        Self(value.round().clamp(0.0, 100.0) as u8)
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn passed(self) -> bool {
        self.0 >= PASS_THRESHOLD
    }
}

impl TryFrom<i64> for Score {
    type Error = ScoreError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Score> for u8 {
    fn from(score: Score) -> Self {
        score.0
    }
}

/// Per-question verdict returned by the scorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Feedback {
    Correct,
    Wrong,
}

impl Feedback {
    /// Anything other than an exact "Correct" label counts as wrong.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        if label == "Correct" {
            Self::Correct
        } else {
            Self::Wrong
        }
    }

    #[must_use]
    pub fn is_correct(self) -> bool {
        matches!(self, Self::Correct)
    }
}

/// Guidance shown with a graded result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GuidanceBand {
    /// Passed: offer the next lesson.
    Pass,
    /// Close to passing: suggest reviewing the lesson.
    Review,
    /// Far from passing: strongly recommend re-watching.
    Rewatch,
}

impl GuidanceBand {
    #[must_use]
    pub fn for_score(score: Score) -> Self {
        if score.passed() {
            Self::Pass
        } else if score.value() < REWATCH_THRESHOLD {
            Self::Rewatch
        } else {
            Self::Review
        }
    }

    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::Pass => "Great job! You've passed the quiz. Proceed to the next lesson.",
            Self::Review => "You're close! Consider revisiting the lesson and try the quiz again.",
            Self::Rewatch => {
                "We strongly recommend watching the lesson again to improve understanding before retaking the quiz."
            }
        }
    }
}

//
// ─── ATTEMPT ───────────────────────────────────────────────────────────────────
//

/// The authoritative graded attempt for one student and lesson.
///
/// `answers` and `feedback` are index-aligned with the quiz questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizAttempt {
    pub lesson_id: LessonId,
    pub answers: Vec<String>,
    pub feedback: Vec<Feedback>,
    pub score: Score,
    pub passed: bool,
    pub submitted_at: DateTime<Utc>,
}

impl QuizAttempt {
    /// Build an attempt; `passed` is always derived from the score.
    #[must_use]
    pub fn new(
        lesson_id: LessonId,
        answers: Vec<String>,
        feedback: Vec<Feedback>,
        score: Score,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            lesson_id,
            answers,
            feedback,
            score,
            passed: score.passed(),
            submitted_at,
        }
    }

    #[must_use]
    pub fn guidance(&self) -> GuidanceBand {
        GuidanceBand::for_score(self.score)
    }

    #[must_use]
    pub fn correct_count(&self) -> usize {
        self.feedback.iter().filter(|f| f.is_correct()).count()
    }
}
