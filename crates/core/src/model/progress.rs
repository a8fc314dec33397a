use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::model::ids::{CourseId, LessonId, StudentId};
use crate::model::quiz::QuizAttempt;

/// Set of completed lesson ids. Ordered only for stable serialization.
pub type CompletedSet = BTreeSet<LessonId>;

/// Per-student, per-course progress document.
///
/// Created lazily on the first completion or quiz submission; never deleted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    student_id: StudentId,
    course_id: CourseId,
    completed_lessons: CompletedSet,
    quiz_results: BTreeMap<LessonId, QuizAttempt>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Progress {
    #[must_use]
    pub fn new(student_id: StudentId, course_id: CourseId, now: DateTime<Utc>) -> Self {
        Self {
            student_id,
            course_id,
            completed_lessons: CompletedSet::new(),
            quiz_results: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Rehydrate a stored record.
    #[must_use]
    pub fn from_persisted(
        student_id: StudentId,
        course_id: CourseId,
        completed_lessons: CompletedSet,
        attempts: Vec<QuizAttempt>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        let quiz_results = attempts
            .into_iter()
            .map(|attempt| (attempt.lesson_id.clone(), attempt))
            .collect();
        Self {
            student_id,
            course_id,
            completed_lessons,
            quiz_results,
            created_at,
            updated_at,
        }
    }

    #[must_use]
    pub fn student_id(&self) -> &StudentId {
        &self.student_id
    }

    #[must_use]
    pub fn course_id(&self) -> &CourseId {
        &self.course_id
    }

    #[must_use]
    pub fn completed_lessons(&self) -> &CompletedSet {
        &self.completed_lessons
    }

    #[must_use]
    pub fn is_completed(&self, lesson_id: &LessonId) -> bool {
        self.completed_lessons.contains(lesson_id)
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Adds the lesson to the completed set.
    ///
    /// Returns `false` (and leaves `updated_at` untouched) if it was already there.
    pub fn mark_complete(&mut self, lesson_id: LessonId, now: DateTime<Utc>) -> bool {
        let inserted = self.completed_lessons.insert(lesson_id);
        if inserted {
            self.updated_at = now;
        }
        inserted
    }

    /// Removes the lesson from the completed set. Returns whether it was present.
    pub fn mark_incomplete(&mut self, lesson_id: &LessonId, now: DateTime<Utc>) -> bool {
        let removed = self.completed_lessons.remove(lesson_id);
        if removed {
            self.updated_at = now;
        }
        removed
    }

    /// Stores `attempt` as the authoritative result for its lesson, replacing any prior one.
    ///
    /// A passing attempt also marks the lesson complete. Returns the replaced attempt.
    pub fn record_attempt(&mut self, attempt: QuizAttempt, now: DateTime<Utc>) -> Option<QuizAttempt> {
        if attempt.passed {
            self.completed_lessons.insert(attempt.lesson_id.clone());
        }
        self.updated_at = now;
        self.quiz_results.insert(attempt.lesson_id.clone(), attempt)
    }

    #[must_use]
    pub fn attempt_for(&self, lesson_id: &LessonId) -> Option<&QuizAttempt> {
        self.quiz_results.get(lesson_id)
    }

    /// All attempts, ordered by lesson id.
    pub fn attempts(&self) -> impl Iterator<Item = &QuizAttempt> {
        self.quiz_results.values()
    }
}
