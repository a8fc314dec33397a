use std::sync::Arc;

use tracing::debug;

use learnpath_core::model::{CourseId, StudentId};
use learnpath_core::{ResumeResolver, ResumeState};
use storage::repository::{CourseRepository, ProgressRepository};

use crate::error::ResumeError;

/// Resolves where a student should continue a course.
#[derive(Clone)]
pub struct ResumeService {
    courses: Arc<dyn CourseRepository>,
    progress: Arc<dyn ProgressRepository>,
}

impl ResumeService {
    #[must_use]
    pub fn new(courses: Arc<dyn CourseRepository>, progress: Arc<dyn ProgressRepository>) -> Self {
        Self { courses, progress }
    }

    /// # Errors
    ///
    /// Returns `ResumeError::CourseNotFound` for an unknown course or
    /// `ResumeError::Storage` on backend failures.
    pub async fn resume(
        &self,
        student_id: &StudentId,
        course_id: &CourseId,
    ) -> Result<ResumeState, ResumeError> {
        let (course, progress) = tokio::join!(
            self.courses.get_course(course_id),
            self.progress.get_progress(student_id, course_id)
        );
        let course = course?.ok_or_else(|| ResumeError::CourseNotFound(course_id.clone()))?;
        let completed = progress?
            .map(|p| p.completed_lessons().clone())
            .unwrap_or_default();

        let state = ResumeResolver::resolve(&course, &completed);
        debug!(
            student = %student_id,
            course = %course_id,
            next = ?state.next_flat_index,
            percent = state.course_percent,
            "resume resolved"
        );
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use learnpath_core::ResumeLabel;
    use learnpath_core::model::{Course, LessonId, Lesson, Module, Progress, Week};
    use learnpath_core::time::fixed_now;
    use storage::repository::InMemoryRepository;

    fn lid(id: &str) -> LessonId {
        LessonId::new(id).unwrap()
    }

    #[tokio::test]
    async fn resume_reads_stored_progress() {
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
        let student = StudentId::new("s1").unwrap();
        let mut progress = Progress::new(student.clone(), course.id.clone(), fixed_now());
        progress.mark_complete(lid("a"), fixed_now());
        repo.save_progress(&progress).await.unwrap();

        let svc = ResumeService::new(Arc::new(repo.clone()), Arc::new(repo));
        let state = svc.resume(&student, &course.id).await.unwrap();
        assert_eq!(state.next_flat_index, Some(1));
        assert_eq!(state.label, Some(ResumeLabel::Resume));

        let fresh = StudentId::new("s2").unwrap();
        let state = svc.resume(&fresh, &course.id).await.unwrap();
        assert_eq!(state.next_flat_index, Some(0));
        assert_eq!(state.label, Some(ResumeLabel::GetStarted));
    }

    #[tokio::test]
    async fn unknown_course_is_not_found() {
        let repo = InMemoryRepository::new();
        let svc = ResumeService::new(Arc::new(repo.clone()), Arc::new(repo));
        let err = svc
            .resume(&StudentId::new("s").unwrap(), &CourseId::new("nope").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ResumeError::CourseNotFound(_)));
    }
}
