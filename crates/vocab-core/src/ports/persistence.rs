//! The typed persistence port. Any backing store satisfies this contract;
//! the engine never depends on a concrete database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{CatSession, LearningSession, Response, TerminationReason};
use crate::error::EngineResult;

/// A user record as read back by the history endpoint.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: String,
    pub nickname: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
}

/// Summary of one archived CAT session, as returned by `/user/{id}/history`.
#[derive(Debug, Clone)]
pub struct SessionHistoryEntry {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub final_theta: Option<f64>,
    pub final_se: Option<f64>,
    pub termination_reason: Option<TerminationReason>,
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PersistencePort: Send + Sync {
    /// Ensures a user row exists, returning its id (creating one on first use).
    async fn upsert_user<'a>(&self, user_id: &str, nickname: Option<&'a str>) -> EngineResult<()>;

    /// Writes the terminal state of a CAT session on termination.
    async fn archive_session(&self, session: &CatSession) -> EngineResult<()>;

    /// Appends one response row, strictly ordered per session.
    async fn append_response(&self, session_id: &str, response: &Response) -> EngineResult<()>;

    /// All prior responses for a session, in submission order — used to
    /// replay and reconstruct a session's posterior.
    async fn load_responses(&self, session_id: &str) -> EngineResult<Vec<Response>>;

    /// Prior CAT sessions for a learner, as returned by the history lookup.
    async fn load_history(&self, user_id: &str) -> EngineResult<Vec<SessionHistoryEntry>>;

    /// Persists or updates a learning session's durable state.
    async fn save_learning_session(&self, session: &LearningSession) -> EngineResult<()>;

    async fn load_learning_session(
        &self,
        session_id: &str,
    ) -> EngineResult<Option<LearningSession>>;
}
