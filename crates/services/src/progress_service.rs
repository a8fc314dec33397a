use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use learnpath_core::GatingPolicy;
use learnpath_core::model::{
    CompletedSet, Course, CourseId, LessonId, Progress, QuizAttempt, StudentId,
};
use storage::repository::{CourseRepository, ProgressRepository};

use crate::Clock;
use crate::error::ProgressError;

/// Read view of a progress record. An absent record reads as empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub student_id: StudentId,
    pub course_id: CourseId,
    pub completed_lessons: Vec<LessonId>,
    pub quiz_results: BTreeMap<LessonId, QuizAttempt>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProgressSnapshot {
    fn empty(student_id: StudentId, course_id: CourseId) -> Self {
        Self {
            student_id,
            course_id,
            completed_lessons: Vec::new(),
            quiz_results: BTreeMap::new(),
            updated_at: None,
        }
    }

    fn from_progress(progress: &Progress) -> Self {
        Self {
            student_id: progress.student_id().clone(),
            course_id: progress.course_id().clone(),
            completed_lessons: progress.completed_lessons().iter().cloned().collect(),
            quiz_results: progress
                .attempts()
                .map(|attempt| (attempt.lesson_id.clone(), attempt.clone()))
                .collect(),
            updated_at: Some(progress.updated_at()),
        }
    }
}

/// Tracks which lessons a student has completed in a course.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    courses: Arc<dyn CourseRepository>,
    progress: Arc<dyn ProgressRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        clock: Clock,
        courses: Arc<dyn CourseRepository>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            clock,
            courses,
            progress,
        }
    }

    async fn require_course(&self, course_id: &CourseId) -> Result<Course, ProgressError> {
        self.courses
            .get_course(course_id)
            .await?
            .ok_or_else(|| ProgressError::CourseNotFound(course_id.clone()))
    }

    fn require_lesson(course: &Course, lesson_id: &LessonId) -> Result<(), ProgressError> {
        if course.contains_lesson(lesson_id) {
            Ok(())
        } else {
            Err(ProgressError::LessonNotInCourse {
                lesson: lesson_id.clone(),
                course: course.id.clone(),
            })
        }
    }

    /// Mark a lesson complete, creating the progress record on first use.
    ///
    /// Marking an already completed lesson writes nothing.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::CourseNotFound` for an unknown course,
    /// `ProgressError::LessonNotInCourse` for a lesson the course does not contain,
    /// or `ProgressError::Storage` if the record cannot be read or written.
    pub async fn mark_complete(
        &self,
        student_id: &StudentId,
        course_id: &CourseId,
        lesson_id: &LessonId,
    ) -> Result<CompletedSet, ProgressError> {
        let course = self.require_course(course_id).await?;
        Self::require_lesson(&course, lesson_id)?;

        let now = self.clock.now();
        let existing = self.progress.get_progress(student_id, course_id).await?;
        let created = existing.is_none();
        let mut progress = existing
            .unwrap_or_else(|| Progress::new(student_id.clone(), course_id.clone(), now));

        let changed = progress.mark_complete(lesson_id.clone(), now);
        if changed || created {
            self.progress.save_progress(&progress).await?;
        }
        info!(
            student = %student_id,
            course = %course_id,
            lesson = %lesson_id,
            changed,
            created,
            "lesson marked complete"
        );
        Ok(progress.completed_lessons().clone())
    }

    /// Remove a lesson from the completed set.
    ///
    /// A lesson that is in the course but not completed is a successful no-op.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::ProgressNotFound` when the student has no record for
    /// the course (nothing is created), plus the same course/lesson validation errors
    /// as [`ProgressService::mark_complete`].
    pub async fn mark_incomplete(
        &self,
        student_id: &StudentId,
        course_id: &CourseId,
        lesson_id: &LessonId,
    ) -> Result<CompletedSet, ProgressError> {
        let course = self.require_course(course_id).await?;
        Self::require_lesson(&course, lesson_id)?;

        let mut progress = self
            .progress
            .get_progress(student_id, course_id)
            .await?
            .ok_or_else(|| ProgressError::ProgressNotFound {
                student: student_id.clone(),
                course: course_id.clone(),
            })?;

        let changed = progress.mark_incomplete(lesson_id, self.clock.now());
        if changed {
            self.progress.save_progress(&progress).await?;
        }
        info!(
            student = %student_id,
            course = %course_id,
            lesson = %lesson_id,
            changed,
            "lesson marked incomplete"
        );
        Ok(progress.completed_lessons().clone())
    }

    /// Completed lessons for the pair. No record yet means an empty set.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` on backend failures.
    pub async fn get_completed(
        &self,
        student_id: &StudentId,
        course_id: &CourseId,
    ) -> Result<CompletedSet, ProgressError> {
        let completed = self
            .progress
            .get_progress(student_id, course_id)
            .await?
            .map(|progress| progress.completed_lessons().clone())
            .unwrap_or_default();
        debug!(student = %student_id, course = %course_id, count = completed.len(), "completed lessons read");
        Ok(completed)
    }

    /// Completed lessons plus stored quiz results.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` on backend failures.
    pub async fn snapshot(
        &self,
        student_id: &StudentId,
        course_id: &CourseId,
    ) -> Result<ProgressSnapshot, ProgressError> {
        let snapshot = match self.progress.get_progress(student_id, course_id).await? {
            Some(progress) => ProgressSnapshot::from_progress(&progress),
            None => ProgressSnapshot::empty(student_id.clone(), course_id.clone()),
        };
        Ok(snapshot)
    }

    /// Whether the student may open the quiz attached to `lesson_id`.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::CourseNotFound` for an unknown course or
    /// `ProgressError::Storage` on backend failures.
    pub async fn is_quiz_unlocked(
        &self,
        student_id: &StudentId,
        course_id: &CourseId,
        lesson_id: &LessonId,
    ) -> Result<bool, ProgressError> {
        let course = self.require_course(course_id).await?;
        let completed = self.get_completed(student_id, course_id).await?;
        Ok(GatingPolicy::is_quiz_unlocked(lesson_id, &course, &completed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use learnpath_core::model::{Lesson, Module, Week};
    use learnpath_core::time::fixed_now;
    use storage::repository::InMemoryRepository;

    fn lid(id: &str) -> LessonId {
        LessonId::new(id).unwrap()
    }

    async fn service() -> (ProgressService, InMemoryRepository) {
        let repo = InMemoryRepository::new();
        let course = Course::new(
            CourseId::new("c1").unwrap(),
            "Course",
            vec![Week::new(
                1,
                vec![Module::new(
                    "m",
                    vec![
                        Lesson::new(lid("a"), "A"),
                        Lesson::new(lid("b"), "B"),
                        Lesson::new(lid("c"), "C"),
                    ],
                )],
            )],
        );
        repo.upsert_course(&course).await.unwrap();
        let svc = ProgressService::new(
            Clock::fixed(fixed_now()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        );
        (svc, repo)
    }

    fn ids() -> (StudentId, CourseId) {
        (StudentId::new("s1").unwrap(), CourseId::new("c1").unwrap())
    }

    #[tokio::test]
    async fn mark_complete_twice_matches_once() {
        let (svc, repo) = service().await;
        let (student, course) = ids();
        let once = svc.mark_complete(&student, &course, &lid("a")).await.unwrap();
        let twice = svc.mark_complete(&student, &course, &lid("a")).await.unwrap();
        assert_eq!(once, twice);
        assert_eq!(repo.progress_len().unwrap(), 1);
    }

    #[tokio::test]
    async fn mark_incomplete_without_record_creates_nothing() {
        let (svc, repo) = service().await;
        let (student, course) = ids();
        let err = svc
            .mark_incomplete(&student, &course, &lid("a"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProgressError::ProgressNotFound { .. }));
        assert_eq!(repo.progress_len().unwrap(), 0);
    }

    #[tokio::test]
    async fn mark_incomplete_of_uncompleted_lesson_is_noop() {
        let (svc, _repo) = service().await;
        let (student, course) = ids();
        svc.mark_complete(&student, &course, &lid("a")).await.unwrap();
        let after = svc
            .mark_incomplete(&student, &course, &lid("b"))
            .await
            .unwrap();
        assert_eq!(after.len(), 1);
    }

    #[tokio::test]
    async fn unknown_lesson_is_rejected_before_write() {
        let (svc, repo) = service().await;
        let (student, course) = ids();
        let err = svc
            .mark_complete(&student, &course, &lid("zzz"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProgressError::LessonNotInCourse { .. }));
        assert_eq!(repo.progress_len().unwrap(), 0);

        let missing = CourseId::new("nope").unwrap();
        let err = svc
            .mark_complete(&student, &missing, &lid("a"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProgressError::CourseNotFound(_)));
    }

    #[tokio::test]
    async fn get_completed_without_record_is_empty() {
        let (svc, _repo) = service().await;
        let (student, course) = ids();
        assert!(svc.get_completed(&student, &course).await.unwrap().is_empty());
        let snapshot = svc.snapshot(&student, &course).await.unwrap();
        assert!(snapshot.completed_lessons.is_empty());
        assert!(snapshot.updated_at.is_none());
    }

    #[tokio::test]
    async fn quiz_unlocks_right_after_lesson_completion() {
        let (svc, _repo) = service().await;
        let (student, course) = ids();
        assert!(!svc.is_quiz_unlocked(&student, &course, &lid("b")).await.unwrap());
        svc.mark_complete(&student, &course, &lid("b")).await.unwrap();
        assert!(svc.is_quiz_unlocked(&student, &course, &lid("b")).await.unwrap());
    }
}
