use serde::Serialize;

use learnpath_core::GatingPolicy;
use learnpath_core::curriculum::{CurriculumIndex, percent, ratio};
use learnpath_core::gating::NextStep;
use learnpath_core::model::{
    CourseId, Feedback, GuidanceBand, LessonId, Question, Quiz, QuizAttempt, StudentId,
};
use learnpath_core::time::format_countdown;

use crate::error::QuizError;

//
// ─── CONTEXT ───────────────────────────────────────────────────────────────────
//

/// Identity of one quiz visit. Passed explicitly to every quiz operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuizContext {
    pub student_id: StudentId,
    pub course_id: CourseId,
    pub lesson_id: LessonId,
}

impl QuizContext {
    #[must_use]
    pub fn new(student_id: StudentId, course_id: CourseId, lesson_id: LessonId) -> Self {
        Self {
            student_id,
            course_id,
            lesson_id,
        }
    }
}

//
// ─── PHASES ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum QuizPhase {
    /// Gating denied access; nothing was fetched.
    Locked,
    /// The lesson has no quiz or the quiz has no questions.
    NoQuiz,
    Unattempted,
    InProgress,
    /// Answers are with the scorer, or a graded attempt is waiting to be saved.
    Submitting,
    /// Graded during this visit.
    Graded,
    /// A prior attempt was found on load.
    AlreadyGraded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitTrigger {
    /// Student pressed submit. Every answer must be filled in unless time ran out.
    Manual,
    /// Countdown reached zero. Blank answers are submitted as-is.
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Running(u32),
    Expired,
    /// The session is not in progress; the countdown has nothing to do.
    Idle,
}

/// One row of the read-only results view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradedQuestion {
    pub question: String,
    pub your_answer: String,
    pub correct_answer: String,
    pub explanation: Option<String>,
    pub feedback: Feedback,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// State machine for a single quiz visit.
///
/// Pure: the service performs all I/O and drives the transitions.
#[derive(Debug, Clone)]
pub struct QuizSession {
    ctx: QuizContext,
    phase: QuizPhase,
    quiz: Option<Quiz>,
    answers: Vec<String>,
    cursor: usize,
    remaining_secs: u32,
    attempt: Option<QuizAttempt>,
    pending: Option<QuizAttempt>,
}

impl QuizSession {
    fn with_phase(ctx: QuizContext, phase: QuizPhase) -> Self {
        Self {
            ctx,
            phase,
            quiz: None,
            answers: Vec::new(),
            cursor: 0,
            remaining_secs: 0,
            attempt: None,
            pending: None,
        }
    }

    #[must_use]
    pub fn locked(ctx: QuizContext) -> Self {
        Self::with_phase(ctx, QuizPhase::Locked)
    }

    #[must_use]
    pub fn no_quiz(ctx: QuizContext) -> Self {
        Self::with_phase(ctx, QuizPhase::NoQuiz)
    }

    /// Session for a fetched quiz. A prior attempt opens the read-only view.
    #[must_use]
    pub fn loaded(ctx: QuizContext, quiz: Quiz, prior: Option<QuizAttempt>) -> Self {
        if quiz.is_empty() {
            return Self::no_quiz(ctx);
        }
        let phase = if prior.is_some() {
            QuizPhase::AlreadyGraded
        } else {
            QuizPhase::Unattempted
        };
        let remaining_secs = quiz.time_limit_secs();
        Self {
            ctx,
            phase,
            quiz: Some(quiz),
            answers: Vec::new(),
            cursor: 0,
            remaining_secs,
            attempt: prior,
            pending: None,
        }
    }

    fn expect_phase(&self, action: &'static str, allowed: &[QuizPhase]) -> Result<(), QuizError> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(QuizError::InvalidPhase {
                action,
                phase: self.phase,
            })
        }
    }

    fn questions(&self) -> &[Question] {
        self.quiz.as_ref().map_or(&[], |quiz| quiz.questions.as_slice())
    }

    #[must_use]
    pub fn context(&self) -> &QuizContext {
        &self.ctx
    }

    #[must_use]
    pub fn phase(&self) -> QuizPhase {
        self.phase
    }

    #[must_use]
    pub fn quiz(&self) -> Option<&Quiz> {
        self.quiz.as_ref()
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions().len()
    }

    #[must_use]
    pub fn answers(&self) -> &[String] {
        &self.answers
    }

    #[must_use]
    pub fn answer(&self, index: usize) -> Option<&str> {
        self.answers.get(index).map(String::as_str)
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.questions().get(self.cursor)
    }

    #[must_use]
    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    /// The authoritative attempt: the one found on load or the last one saved.
    #[must_use]
    pub fn attempt(&self) -> Option<&QuizAttempt> {
        self.attempt.as_ref()
    }

    #[must_use]
    pub fn pending_attempt(&self) -> Option<&QuizAttempt> {
        self.pending.as_ref()
    }

    /// Start answering. Sizes the countdown and clears any answers.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::InvalidPhase` unless the session is `Unattempted`.
    pub fn begin(&mut self) -> Result<(), QuizError> {
        self.expect_phase("begin", &[QuizPhase::Unattempted])?;
        let count = self.question_count();
        self.answers = vec![String::new(); count];
        self.cursor = 0;
        self.remaining_secs = self.quiz.as_ref().map_or(0, Quiz::time_limit_secs);
        self.phase = QuizPhase::InProgress;
        Ok(())
    }

    /// Record the answer for the question under the cursor.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::InvalidPhase` unless the session is in progress.
    pub fn answer_current(&mut self, value: impl Into<String>) -> Result<(), QuizError> {
        self.set_answer(self.cursor, value)
    }

    /// # Errors
    ///
    /// Returns `QuizError::InvalidPhase` unless the session is in progress, or
    /// `QuizError::QuestionOutOfRange` for a bad index.
    pub fn set_answer(&mut self, index: usize, value: impl Into<String>) -> Result<(), QuizError> {
        self.expect_phase("answer", &[QuizPhase::InProgress])?;
        let len = self.answers.len();
        let slot = self
            .answers
            .get_mut(index)
            .ok_or(QuizError::QuestionOutOfRange { index, len })?;
        *slot = value.into();
        Ok(())
    }

    /// Move to the next question. Returns whether the cursor moved.
    pub fn next(&mut self) -> bool {
        if self.phase != QuizPhase::InProgress || self.cursor + 1 >= self.question_count() {
            return false;
        }
        self.cursor += 1;
        true
    }

    /// Move to the previous question. Returns whether the cursor moved.
    pub fn previous(&mut self) -> bool {
        if self.phase != QuizPhase::InProgress || self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        true
    }

    /// Advance the countdown by one second.
    pub fn tick(&mut self) -> TickOutcome {
        if self.phase != QuizPhase::InProgress {
            return TickOutcome::Idle;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            TickOutcome::Expired
        } else {
            TickOutcome::Running(self.remaining_secs)
        }
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.phase == QuizPhase::InProgress && self.remaining_secs == 0
    }

    /// Indices of questions with a blank answer.
    #[must_use]
    pub fn unanswered(&self) -> Vec<usize> {
        self.answers
            .iter()
            .enumerate()
            .filter(|(_, answer)| answer.trim().is_empty())
            .map(|(index, _)| index)
            .collect()
    }

    #[must_use]
    pub fn can_submit(&self) -> bool {
        self.phase == QuizPhase::InProgress && (self.is_expired() || self.unanswered().is_empty())
    }

    /// Move to `Submitting` after checking the answers can be graded.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::InvalidPhase` unless in progress, `QuizError::Unanswered`
    /// for a manual submit with blanks before time runs out, and
    /// `QuizError::AnswerCountMismatch` if answers and questions disagree.
    pub fn begin_submit(&mut self, trigger: SubmitTrigger) -> Result<(), QuizError> {
        self.expect_phase("submit", &[QuizPhase::InProgress])?;
        let questions = self.question_count();
        if questions == 0 {
            return Err(QuizError::EmptyQuiz(self.ctx.lesson_id.clone()));
        }
        if self.answers.len() != questions {
            return Err(QuizError::AnswerCountMismatch {
                answers: self.answers.len(),
                questions,
            });
        }
        if trigger == SubmitTrigger::Manual && !self.is_expired() {
            let missing = self.unanswered();
            if !missing.is_empty() {
                return Err(QuizError::Unanswered(missing));
            }
        }
        self.phase = QuizPhase::Submitting;
        Ok(())
    }

    /// Scoring failed; back to `InProgress` with answers intact.
    pub fn fail_submit(&mut self) {
        if self.phase == QuizPhase::Submitting && self.pending.is_none() {
            self.phase = QuizPhase::InProgress;
        }
    }

    /// Hold a graded attempt until it is saved.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::InvalidPhase` unless the session is `Submitting`.
    pub fn hold_pending(&mut self, attempt: QuizAttempt) -> Result<(), QuizError> {
        self.expect_phase("grade", &[QuizPhase::Submitting])?;
        self.pending = Some(attempt);
        Ok(())
    }

    /// The pending attempt was saved; it becomes authoritative.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NothingPending` if no graded attempt is held.
    pub fn complete_submit(&mut self) -> Result<&QuizAttempt, QuizError> {
        let attempt = self.pending.take().ok_or(QuizError::NothingPending)?;
        self.phase = QuizPhase::Graded;
        Ok(self.attempt.insert(attempt))
    }

    /// Re-enter `Unattempted` with a fresh timer and cleared answers.
    ///
    /// The previous attempt stays authoritative until a new one is saved.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::InvalidPhase` unless a result is being shown.
    pub fn retake(&mut self) -> Result<(), QuizError> {
        self.expect_phase("retake", &[QuizPhase::Graded, QuizPhase::AlreadyGraded])?;
        self.answers.clear();
        self.cursor = 0;
        self.remaining_secs = self.quiz.as_ref().map_or(0, Quiz::time_limit_secs);
        self.phase = QuizPhase::Unattempted;
        Ok(())
    }

    /// Guidance for the result on screen.
    #[must_use]
    pub fn guidance(&self) -> Option<GuidanceBand> {
        match self.phase {
            QuizPhase::Graded | QuizPhase::AlreadyGraded => {
                self.attempt.as_ref().map(QuizAttempt::guidance)
            }
            _ => None,
        }
    }

    /// Whether the "next lesson" action is offered.
    #[must_use]
    pub fn can_advance(&self) -> bool {
        GatingPolicy::can_advance(self.attempt.as_ref())
    }

    #[must_use]
    pub fn next_step(&self, index: &CurriculumIndex) -> NextStep {
        GatingPolicy::next_step(index, &self.ctx.lesson_id, self.attempt.as_ref())
    }

    /// Position within the quiz as a whole percentage.
    #[must_use]
    pub fn question_progress_percent(&self) -> u8 {
        let count = self.question_count();
        if count == 0 {
            return 0;
        }
        percent(ratio(self.cursor + 1, count))
    }

    #[must_use]
    pub fn countdown_display(&self) -> String {
        format_countdown(self.remaining_secs)
    }

    /// Per-question breakdown of the authoritative attempt.
    #[must_use]
    pub fn graded_view(&self) -> Option<Vec<GradedQuestion>> {
        let attempt = self.attempt.as_ref()?;
        let rows = self
            .questions()
            .iter()
            .enumerate()
            .map(|(index, question)| GradedQuestion {
                question: question.question.clone(),
                your_answer: attempt.answers.get(index).cloned().unwrap_or_default(),
                correct_answer: question.answer.clone(),
                explanation: question.explanation.clone(),
                feedback: attempt
                    .feedback
                    .get(index)
                    .copied()
                    .unwrap_or(Feedback::Wrong),
            })
            .collect();
        Some(rows)
    }
}
