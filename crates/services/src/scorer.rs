use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use learnpath_core::model::{LessonId, Question, StudentId};

use crate::error::ScorerError;

pub const DEFAULT_SCORER_URL: &str = "http://localhost:5001/score-quiz";
pub const DEFAULT_SCORER_TIMEOUT: Duration = Duration::from_secs(30);

/// Body sent to the external scorer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRequest {
    #[serde(rename = "studentAnswers")]
    pub answers: Vec<String>,
    pub original_questions: Vec<Question>,
    pub student_id: StudentId,
    pub lesson_id: LessonId,
}

/// Raw scorer reply. Labels are normalized by the quiz service.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResponse {
    /// Required on success. A reply without it cannot be graded.
    #[serde(default)]
    pub total_score: Option<f64>,
    #[serde(default)]
    pub feedback: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Grades a submission. Implementations must not persist anything.
#[async_trait]
pub trait QuizScorer: Send + Sync {
    /// # Errors
    ///
    /// Returns `ScorerError` when the scorer cannot produce a grade.
    async fn score(&self, request: &ScoreRequest) -> Result<ScoreResponse, ScorerError>;
}

#[derive(Clone, Debug)]
pub struct ScorerConfig {
    pub url: String,
    pub timeout: Duration,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SCORER_URL.into(),
            timeout: DEFAULT_SCORER_TIMEOUT,
        }
    }
}

impl ScorerConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let url = env::var("LEARNPATH_SCORER_URL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SCORER_URL.into());
        let timeout = env::var("LEARNPATH_SCORER_TIMEOUT_SECS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map_or(DEFAULT_SCORER_TIMEOUT, Duration::from_secs);
        Self { url, timeout }
    }
}

/// Scorer reached over HTTP with a JSON POST.
#[derive(Clone)]
pub struct HttpScorer {
    client: Client,
    config: ScorerConfig,
}

impl HttpScorer {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(ScorerConfig::from_env())
    }

    #[must_use]
    pub fn new(config: ScorerConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ScorerConfig {
        &self.config
    }
}

#[async_trait]
impl QuizScorer for HttpScorer {
    async fn score(&self, request: &ScoreRequest) -> Result<ScoreResponse, ScorerError> {
        let response = self
            .client
            .post(&self.config.url)
            .timeout(self.config.timeout)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ScorerError::HttpStatus(response.status()));
        }

        let body: ScoreResponse = response.json().await?;
        if let Some(message) = body.error.as_deref() {
            return Err(ScorerError::Rejected(message.to_string()));
        }
        Ok(body)
    }
}
