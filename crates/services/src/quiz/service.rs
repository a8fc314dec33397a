use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use learnpath_core::GatingPolicy;
use learnpath_core::model::{
    CompletedSet, Course, CourseId, Feedback, LessonId, Progress, Question, Quiz, QuizAttempt,
    Score, StudentId,
};
use storage::repository::{CourseRepository, ProgressRepository, QuizRepository, Storage};

use super::session::{QuizContext, QuizPhase, QuizSession, SubmitTrigger};
use crate::Clock;
use crate::error::{QuizError, ScorerError};
use crate::scorer::{DEFAULT_SCORER_TIMEOUT, QuizScorer, ScoreRequest, ScoreResponse};

/// Loads quiz visits, grades submissions and persists the authoritative attempt.
#[derive(Clone)]
pub struct QuizService {
    clock: Clock,
    courses: Arc<dyn CourseRepository>,
    quizzes: Arc<dyn QuizRepository>,
    progress: Arc<dyn ProgressRepository>,
    scorer: Arc<dyn QuizScorer>,
    scorer_timeout: Duration,
}

impl QuizService {
    #[must_use]
    pub fn new(
        clock: Clock,
        courses: Arc<dyn CourseRepository>,
        quizzes: Arc<dyn QuizRepository>,
        progress: Arc<dyn ProgressRepository>,
        scorer: Arc<dyn QuizScorer>,
    ) -> Self {
        Self {
            clock,
            courses,
            quizzes,
            progress,
            scorer,
            scorer_timeout: DEFAULT_SCORER_TIMEOUT,
        }
    }

    #[must_use]
    pub fn from_storage(clock: Clock, storage: &Storage, scorer: Arc<dyn QuizScorer>) -> Self {
        Self::new(
            clock,
            Arc::clone(&storage.courses),
            Arc::clone(&storage.quizzes),
            Arc::clone(&storage.progress),
            scorer,
        )
    }

    #[must_use]
    pub fn with_scorer_timeout(mut self, timeout: Duration) -> Self {
        self.scorer_timeout = timeout;
        self
    }

    async fn require_course(&self, course_id: &CourseId) -> Result<Course, QuizError> {
        self.courses
            .get_course(course_id)
            .await?
            .ok_or_else(|| QuizError::CourseNotFound(course_id.clone()))
    }

    //
    // ─── LOADING ───────────────────────────────────────────────────────────────
    //

    /// Quiz definition for a lesson. An empty quiz counts as missing.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NoQuiz` when there is nothing to show.
    pub async fn quiz_for_lesson(&self, lesson_id: &LessonId) -> Result<Quiz, QuizError> {
        self.quizzes
            .get_quiz(lesson_id)
            .await?
            .filter(|quiz| !quiz.is_empty())
            .ok_or_else(|| QuizError::NoQuiz(lesson_id.clone()))
    }

    /// Open a quiz visit, reading the completed set from storage.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::CourseNotFound`, `QuizError::LessonNotInCourse`, or a
    /// storage error. A locked or missing quiz is a session phase, not an error.
    pub async fn load(&self, ctx: QuizContext) -> Result<QuizSession, QuizError> {
        let course = self.require_course(&ctx.course_id).await?;
        let completed = self
            .progress
            .get_progress(&ctx.student_id, &ctx.course_id)
            .await?
            .map(|p| p.completed_lessons().clone())
            .unwrap_or_default();
        self.load_with_completed(ctx, &course, &completed).await
    }

    /// Open a quiz visit for a caller that already holds the course and completed set.
    ///
    /// Gating runs first; a locked quiz performs no fetch. Otherwise the quiz and the
    /// progress record are fetched concurrently and both awaited.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::LessonNotInCourse` or a storage error.
    pub async fn load_with_completed(
        &self,
        ctx: QuizContext,
        course: &Course,
        completed: &CompletedSet,
    ) -> Result<QuizSession, QuizError> {
        if !course.contains_lesson(&ctx.lesson_id) {
            return Err(QuizError::LessonNotInCourse {
                lesson: ctx.lesson_id.clone(),
                course: course.id.clone(),
            });
        }
        if !GatingPolicy::is_quiz_unlocked(&ctx.lesson_id, course, completed) {
            info!(student = %ctx.student_id, lesson = %ctx.lesson_id, "quiz locked");
            return Ok(QuizSession::locked(ctx));
        }

        let (quiz, progress) = tokio::join!(
            self.quizzes.get_quiz(&ctx.lesson_id),
            self.progress.get_progress(&ctx.student_id, &ctx.course_id)
        );
        let quiz = quiz?;
        let prior = progress?.and_then(|p| p.attempt_for(&ctx.lesson_id).cloned());

        let session = match quiz {
            Some(quiz) => QuizSession::loaded(ctx, quiz, prior),
            None => QuizSession::no_quiz(ctx),
        };
        info!(
            student = %session.context().student_id,
            lesson = %session.context().lesson_id,
            phase = ?session.phase(),
            "quiz loaded"
        );
        Ok(session)
    }

    //
    // ─── SUBMISSION ────────────────────────────────────────────────────────────
    //

    /// Grade the session's answers and save the result.
    ///
    /// On a scoring failure the session returns to `InProgress` with its answers.
    /// If grading succeeds but saving fails, the attempt stays pending on the session
    /// and [`QuizService::finalize_attempt`] retries the save.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Scoring` when the scorer fails or times out,
    /// `QuizError::FeedbackMismatch` for a malformed grade, `QuizError::Persist` if
    /// the graded attempt cannot be saved, or the validation errors of
    /// [`QuizSession::begin_submit`].
    pub async fn submit(
        &self,
        session: &mut QuizSession,
        trigger: SubmitTrigger,
    ) -> Result<QuizAttempt, QuizError> {
        session.begin_submit(trigger)?;
        let ctx = session.context().clone();
        let questions = session
            .quiz()
            .map(|quiz| quiz.questions.clone())
            .unwrap_or_default();
        info!(
            student = %ctx.student_id,
            lesson = %ctx.lesson_id,
            ?trigger,
            "submitting quiz"
        );

        let graded = self
            .grade(&ctx, session.answers().to_vec(), questions)
            .await;
        let attempt = match graded {
            Ok(attempt) => attempt,
            Err(err) => {
                warn!(lesson = %ctx.lesson_id, error = %err, "quiz submission failed");
                session.fail_submit();
                return Err(err);
            }
        };

        session.hold_pending(attempt)?;
        self.finalize_attempt(session).await
    }

    /// Save the session's pending graded attempt.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NothingPending` if nothing is waiting, or
    /// `QuizError::Persist` if the save fails again.
    pub async fn finalize_attempt(&self, session: &mut QuizSession) -> Result<QuizAttempt, QuizError> {
        if session.phase() != QuizPhase::Submitting {
            return Err(QuizError::NothingPending);
        }
        let attempt = session
            .pending_attempt()
            .cloned()
            .ok_or(QuizError::NothingPending)?;
        let ctx = session.context().clone();
        self.persist(&ctx.student_id, &ctx.course_id, attempt).await?;
        Ok(session.complete_submit()?.clone())
    }

    /// Grade and save answers without a live session.
    ///
    /// Blank answers are accepted and graded as submitted.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Locked` if the lesson is not completed,
    /// `QuizError::NoQuiz`/`QuizError::EmptyQuiz` when there is nothing to grade,
    /// `QuizError::AnswerCountMismatch` for misaligned answers, and the scoring and
    /// persistence errors of [`QuizService::submit`].
    pub async fn submit_answers(
        &self,
        student_id: &StudentId,
        course_id: &CourseId,
        lesson_id: &LessonId,
        answers: Vec<String>,
    ) -> Result<QuizAttempt, QuizError> {
        let course = self.require_course(course_id).await?;
        if !course.contains_lesson(lesson_id) {
            return Err(QuizError::LessonNotInCourse {
                lesson: lesson_id.clone(),
                course: course_id.clone(),
            });
        }

        let completed = self
            .progress
            .get_progress(student_id, course_id)
            .await?
            .map(|p| p.completed_lessons().clone())
            .unwrap_or_default();
        if !GatingPolicy::is_quiz_unlocked(lesson_id, &course, &completed) {
            return Err(QuizError::Locked(lesson_id.clone()));
        }
        let quiz: Quiz = self
            .quizzes
            .get_quiz(lesson_id)
            .await?
            .ok_or_else(|| QuizError::NoQuiz(lesson_id.clone()))?;
        if quiz.is_empty() {
            return Err(QuizError::EmptyQuiz(lesson_id.clone()));
        }
        if answers.len() != quiz.question_count() {
            return Err(QuizError::AnswerCountMismatch {
                answers: answers.len(),
                questions: quiz.question_count(),
            });
        }

        let ctx = QuizContext::new(student_id.clone(), course_id.clone(), lesson_id.clone());
        let attempt = self.grade(&ctx, answers, quiz.questions).await?;
        self.persist(student_id, course_id, attempt.clone()).await?;
        Ok(attempt)
    }

    async fn grade(
        &self,
        ctx: &QuizContext,
        answers: Vec<String>,
        questions: Vec<Question>,
    ) -> Result<QuizAttempt, QuizError> {
        let question_count = questions.len();
        let request = ScoreRequest {
            answers,
            original_questions: questions,
            student_id: ctx.student_id.clone(),
            lesson_id: ctx.lesson_id.clone(),
        };

        let response: ScoreResponse =
            match tokio::time::timeout(self.scorer_timeout, self.scorer.score(&request)).await {
                Ok(result) => result?,
                Err(_) => {
                    warn!(lesson = %ctx.lesson_id, timeout = ?self.scorer_timeout, "scorer timed out");
                    return Err(ScorerError::Timeout(self.scorer_timeout).into());
                }
            };
        if let Some(message) = response.error {
            return Err(ScorerError::Rejected(message).into());
        }
        let Some(total_score) = response.total_score else {
            warn!(lesson = %ctx.lesson_id, "scorer reply carried no totalScore");
            return Err(ScorerError::Rejected("missing totalScore".into()).into());
        };
        if response.feedback.len() != question_count {
            return Err(QuizError::FeedbackMismatch {
                feedback: response.feedback.len(),
                questions: question_count,
            });
        }

        let feedback = response
            .feedback
            .iter()
            .map(|label| Feedback::from_label(label))
            .collect();
        Ok(QuizAttempt::new(
            request.lesson_id,
            request.answers,
            feedback,
            Score::clamped(total_score),
            self.clock.now(),
        ))
    }

    async fn persist(
        &self,
        student_id: &StudentId,
        course_id: &CourseId,
        attempt: QuizAttempt,
    ) -> Result<(), QuizError> {
        let now = self.clock.now();
        let lesson_id = attempt.lesson_id.clone();
        let score = attempt.score.value();
        let passed = attempt.passed;

        let existing = self
            .progress
            .get_progress(student_id, course_id)
            .await
            .map_err(QuizError::Persist)?;
        let mut progress =
            existing.unwrap_or_else(|| Progress::new(student_id.clone(), course_id.clone(), now));
        let replaced = progress.record_attempt(attempt, now);

        if let Err(err) = self.progress.save_progress(&progress).await {
            warn!(student = %student_id, lesson = %lesson_id, error = %err, "failed to save quiz attempt");
            return Err(QuizError::Persist(err));
        }
        info!(
            student = %student_id,
            lesson = %lesson_id,
            score,
            passed,
            replaced = replaced.is_some(),
            "quiz attempt saved"
        );
        Ok(())
    }
}
