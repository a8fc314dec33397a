use std::sync::Arc;
use std::time::Duration;

use storage::repository::Storage;

use crate::Clock;
use crate::error::AppServicesError;
use crate::progress_service::ProgressService;
use crate::quiz::QuizService;
use crate::resume_service::ResumeService;
use crate::scorer::QuizScorer;

/// Assembles the services shared by every request handler.
#[derive(Clone)]
pub struct AppServices {
    progress: Arc<ProgressService>,
    resume: Arc<ResumeService>,
    quiz: Arc<QuizService>,
}

impl AppServices {
    #[must_use]
    pub fn new(
        storage: &Storage,
        clock: Clock,
        scorer: Arc<dyn QuizScorer>,
        scorer_timeout: Duration,
    ) -> Self {
        let progress = Arc::new(ProgressService::new(
            clock,
            Arc::clone(&storage.courses),
            Arc::clone(&storage.progress),
        ));
        let resume = Arc::new(ResumeService::new(
            Arc::clone(&storage.courses),
            Arc::clone(&storage.progress),
        ));
        let quiz = Arc::new(
            QuizService::from_storage(clock, storage, scorer).with_scorer_timeout(scorer_timeout),
        );
        Self {
            progress,
            resume,
            quiz,
        }
    }

    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the database cannot be opened or migrated.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        scorer: Arc<dyn QuizScorer>,
        scorer_timeout: Duration,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::new(&storage, clock, scorer, scorer_timeout))
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn resume(&self) -> Arc<ResumeService> {
        Arc::clone(&self.resume)
    }

    #[must_use]
    pub fn quiz(&self) -> Arc<QuizService> {
        Arc::clone(&self.quiz)
    }
}
