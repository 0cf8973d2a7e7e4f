//! Process-wide registry of active CAT sessions. A sharded concurrent
//! map so handlers for different sessions never contend on a global lock;
//! each session's own state is additionally guarded by a per-session mutex so
//! it progresses strictly sequentially, which posterior updates require.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::config::SessionManagerConfig;
use crate::domain::CatSession;
use crate::error::{EngineError, EngineResult};

pub type SharedSession = Arc<Mutex<CatSession>>;

pub struct SessionManager {
    sessions: DashMap<String, SharedSession>,
    config: SessionManagerConfig,
}

impl SessionManager {
    pub fn new(config: SessionManagerConfig) -> Self {
        Self {
            sessions: DashMap::new(),
            config,
        }
    }

    pub fn insert(&self, session: CatSession) -> SharedSession {
        let id = session.id.clone();
        let shared = Arc::new(Mutex::new(session));
        self.sessions.insert(id, shared.clone());
        shared
    }

    pub fn get(&self, session_id: &str) -> EngineResult<SharedSession> {
        self.sessions
            .get(session_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| EngineError::SessionNotFound {
                session_id: session_id.to_string(),
            })
    }

    /// Removes the session from the live registry (archive is the caller's
    /// responsibility, via the persistence port, before or after this call).
    pub fn remove(&self, session_id: &str) {
        self.sessions.remove(session_id);
    }

    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }

    /// Sweeps all shards for sessions idle past the configured TTL, removing
    /// them from the registry and returning their shared handles — still
    /// locked and readable — so the caller can archive each before it's gone
    /// for good.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> Vec<SharedSession> {
        // Collect owned (id, handle) pairs before awaiting anything, so no
        // dashmap shard guard is held across an `.await` point.
        let snapshot: Vec<(String, SharedSession)> = self
            .sessions
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        let mut expired_ids = Vec::new();
        let mut expired = Vec::new();
        for (id, shared) in snapshot {
            let idle = {
                let session = shared.lock().await;
                now.signed_duration_since(session.last_activity_at)
                    > chrono::Duration::from_std(self.config.session_ttl).unwrap_or_default()
            };
            if idle {
                expired_ids.push(id);
                expired.push(shared);
            }
        }
        for id in &expired_ids {
            self.sessions.remove(id);
        }
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ExamExperience, Grade, LearnerProfile, SelfAssessment};

    fn sample_session(id: &str) -> CatSession {
        let profile = LearnerProfile {
            grade: Grade::Middle,
            self_assessment: SelfAssessment::Intermediate,
            exam_experience: ExamExperience::None,
            preferred_question_type: None,
        };
        CatSession::new(id.to_string(), "learner".to_string(), profile, 1, Utc::now())
    }

    #[test]
    fn get_on_unknown_session_returns_not_found() {
        let manager = SessionManager::new(SessionManagerConfig::default());
        let result = manager.get("missing");
        assert!(matches!(result, Err(EngineError::SessionNotFound { .. })));
    }

    #[tokio::test]
    async fn inserted_session_is_retrievable() {
        let manager = SessionManager::new(SessionManagerConfig::default());
        manager.insert(sample_session("s1"));
        let shared = manager.get("s1").unwrap();
        assert_eq!(shared.lock().await.id, "s1");
    }

    #[tokio::test]
    async fn sweep_evicts_sessions_idle_past_ttl() {
        let mut config = SessionManagerConfig::default();
        config.session_ttl = std::time::Duration::from_secs(60);
        let manager = SessionManager::new(config);
        let mut stale = sample_session("stale");
        stale.last_activity_at = Utc::now() - chrono::Duration::hours(3);
        manager.insert(stale);
        manager.insert(sample_session("fresh"));

        let evicted = manager.sweep_expired(Utc::now()).await;
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].lock().await.id, "stale");
        assert!(manager.get("fresh").is_ok());
        assert!(manager.get("stale").is_err());
    }
}
