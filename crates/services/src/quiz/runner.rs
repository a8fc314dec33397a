use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use learnpath_core::model::QuizAttempt;

use super::service::QuizService;
use super::session::{QuizSession, SubmitTrigger, TickOutcome};
use crate::error::QuizError;

const TICK: Duration = Duration::from_secs(1);

/// A running quiz: the shared session plus its once-per-second countdown.
///
/// The countdown task is aborted when the run is dropped, so leaving a quiz never
/// leaves a timer behind.
pub struct QuizRun {
    service: QuizService,
    session: Arc<Mutex<QuizSession>>,
    ticker: Option<JoinHandle<()>>,
}

impl QuizRun {
    /// Begin the session and start its countdown on the current runtime.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::InvalidPhase` unless the session is `Unattempted`.
    pub fn start(service: QuizService, mut session: QuizSession) -> Result<Self, QuizError> {
        session.begin()?;
        let session = Arc::new(Mutex::new(session));
        let ticker = tokio::spawn(countdown(service.clone(), Arc::clone(&session)));
        Ok(Self {
            service,
            session,
            ticker: Some(ticker),
        })
    }

    #[must_use]
    pub fn session(&self) -> Arc<Mutex<QuizSession>> {
        Arc::clone(&self.session)
    }

    /// Submit on the student's request. A successful submit stops the countdown.
    ///
    /// # Errors
    ///
    /// Propagates the errors of [`QuizService::submit`]; the countdown keeps running
    /// if the submission did not go through.
    pub async fn submit(&mut self) -> Result<QuizAttempt, QuizError> {
        let mut session = self.session.lock().await;
        let attempt = self.service.submit(&mut session, SubmitTrigger::Manual).await?;
        drop(session);
        self.cancel();
        Ok(attempt)
    }

    /// Stop the countdown without submitting.
    pub fn cancel(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }

    #[must_use]
    pub fn is_ticking(&self) -> bool {
        self.ticker.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for QuizRun {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn countdown(service: QuizService, session: Arc<Mutex<QuizSession>>) {
    let mut interval = time::interval_at(Instant::now() + TICK, TICK);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        let mut guard = session.lock().await;
        match guard.tick() {
            TickOutcome::Running(remaining) => {
                debug!(lesson = %guard.context().lesson_id, remaining, "quiz tick");
            }
            TickOutcome::Expired => {
                info!(lesson = %guard.context().lesson_id, "quiz time expired, submitting");
                if let Err(err) = service.submit(&mut guard, SubmitTrigger::Expired).await {
                    warn!(lesson = %guard.context().lesson_id, error = %err, "automatic submission failed");
                }
                return;
            }
            TickOutcome::Idle => return,
        }
    }
}
