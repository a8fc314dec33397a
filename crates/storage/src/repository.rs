use async_trait::async_trait;
use learnpath_core::model::{Course, CourseId, LessonId, Progress, Quiz, StudentId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Read access to published course documents.
#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// Fetch a course by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures. A missing course is `Ok(None)`.
    async fn get_course(&self, id: &CourseId) -> Result<Option<Course>, StorageError>;

    /// Insert or replace a course document (authoring/seeding only).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the course cannot be stored.
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError>;
}

/// Read access to quiz definitions, one per lesson.
#[async_trait]
pub trait QuizRepository: Send + Sync {
    /// Fetch the quiz for a lesson.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures. A missing quiz is `Ok(None)`.
    async fn get_quiz(&self, lesson_id: &LessonId) -> Result<Option<Quiz>, StorageError>;

    /// Insert or replace the quiz for its lesson.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the quiz cannot be stored.
    async fn upsert_quiz(&self, quiz: &Quiz) -> Result<(), StorageError>;
}

/// Per-(student, course) progress documents, including quiz attempts.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Fetch the progress record, if one was ever created.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_progress(
        &self,
        student_id: &StudentId,
        course_id: &CourseId,
    ) -> Result<Option<Progress>, StorageError>;

    /// Whole-document upsert. Last write wins.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be written.
    async fn save_progress(&self, progress: &Progress) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    courses: Arc<Mutex<HashMap<CourseId, Course>>>,
    quizzes: Arc<Mutex<HashMap<LessonId, Quiz>>>,
    progress: Arc<Mutex<HashMap<(StudentId, CourseId), Progress>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored progress records. Handy for asserting lazy creation.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn progress_len(&self) -> Result<usize, StorageError> {
        let guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.len())
    }
}

#[async_trait]
impl CourseRepository for InMemoryRepository {
    async fn get_course(&self, id: &CourseId) -> Result<Option<Course>, StorageError> {
        let guard = self
            .courses
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(id).cloned())
    }

    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        let mut guard = self
            .courses
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(course.id.clone(), course.clone());
        Ok(())
    }
}

#[async_trait]
impl QuizRepository for InMemoryRepository {
    async fn get_quiz(&self, lesson_id: &LessonId) -> Result<Option<Quiz>, StorageError> {
        let guard = self
            .quizzes
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(lesson_id).cloned())
    }

    async fn upsert_quiz(&self, quiz: &Quiz) -> Result<(), StorageError> {
        let mut guard = self
            .quizzes
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(quiz.lesson_id.clone(), quiz.clone());
        Ok(())
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn get_progress(
        &self,
        student_id: &StudentId,
        course_id: &CourseId,
    ) -> Result<Option<Progress>, StorageError> {
        let guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .get(&(student_id.clone(), course_id.clone()))
            .cloned())
    }

    async fn save_progress(&self, progress: &Progress) -> Result<(), StorageError> {
        let mut guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(
            (progress.student_id().clone(), progress.course_id().clone()),
            progress.clone(),
        );
        Ok(())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub courses: Arc<dyn CourseRepository>,
    pub quizzes: Arc<dyn QuizRepository>,
    pub progress: Arc<dyn ProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_in_memory(InMemoryRepository::new())
    }

    /// Wrap an existing in-memory repository (tests keep a handle for inspection).
    #[must_use]
    pub fn from_in_memory(repo: InMemoryRepository) -> Self {
        let courses: Arc<dyn CourseRepository> = Arc::new(repo.clone());
        let quizzes: Arc<dyn QuizRepository> = Arc::new(repo.clone());
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo);
        Self {
            courses,
            quizzes,
            progress,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use learnpath_core::model::{Feedback, QuizAttempt, Score};
    use learnpath_core::time::fixed_now;

    fn ids() -> (StudentId, CourseId, LessonId) {
        (
            StudentId::new("s1").unwrap(),
            CourseId::new("c1").unwrap(),
            LessonId::new("l1").unwrap(),
        )
    }

    #[tokio::test]
    async fn missing_progress_is_none() {
        let repo = InMemoryRepository::new();
        let (student, course, _) = ids();
        assert!(repo.get_progress(&student, &course).await.unwrap().is_none());
        assert_eq!(repo.progress_len().unwrap(), 0);
    }

    #[tokio::test]
    async fn save_progress_replaces_whole_document() {
        let repo = InMemoryRepository::new();
        let (student, course, lesson) = ids();
        let mut progress = Progress::new(student.clone(), course.clone(), fixed_now());
        progress.mark_complete(lesson.clone(), fixed_now());
        progress.record_attempt(
            QuizAttempt::new(
                lesson.clone(),
                vec!["x".into()],
                vec![Feedback::Correct],
                Score::new(100).unwrap(),
                fixed_now(),
            ),
            fixed_now(),
        );
        repo.save_progress(&progress).await.unwrap();

        progress.mark_incomplete(&lesson, fixed_now());
        repo.save_progress(&progress).await.unwrap();

        let stored = repo.get_progress(&student, &course).await.unwrap().unwrap();
        assert!(stored.completed_lessons().is_empty());
        assert_eq!(stored.attempts().count(), 1);
        assert_eq!(repo.progress_len().unwrap(), 1);
    }
}
