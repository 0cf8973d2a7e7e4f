//! The CAT session service: orchestrates start/respond/terminate over
//! the selector, stopping rules, exposure controller, and persistence port.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::bank::ItemBank;
use crate::config::EngineConfig;
use crate::domain::{CatSession, LearnerProfile, Response, SessionState};
use crate::error::{EngineError, EngineResult};
use crate::exposure::ExposureController;
use crate::ports::PersistencePort;
use crate::selector::{select_next_item, SelectorOutcome};
use crate::session_manager::{SessionManager, SharedSession};
use crate::stopping;

use super::reporter::{build_report, Report};

/// What `start_session` hands back to the caller: the new session id and its
/// first rendered item (never `None` — an empty bank is a startup error, not
/// a per-session one).
pub struct StartOutcome {
    pub session_id: String,
    pub rendered: crate::domain::RenderedItem,
}

/// What `submit_response` hands back: either the next item to render, or the
/// terminal report if the session just ended.
pub enum RespondOutcome {
    Continue {
        rendered: crate::domain::RenderedItem,
    },
    Terminated {
        report: Box<Report>,
    },
}

pub struct CatSessionService {
    sessions: SessionManager,
    exposure: Arc<ExposureController>,
    persistence: Arc<dyn PersistencePort>,
    config: EngineConfig,
}

impl CatSessionService {
    pub fn new(
        exposure: Arc<ExposureController>,
        persistence: Arc<dyn PersistencePort>,
        config: EngineConfig,
    ) -> Self {
        Self {
            sessions: SessionManager::new(config.session_manager),
            exposure,
            persistence,
            config,
        }
    }

    pub fn active_session_count(&self) -> usize {
        self.sessions.active_count()
    }

    /// Starts a new session for `learner_id`: initial selection puts it
    /// straight into `InProgress`.
    #[instrument(skip(self, bank))]
    pub async fn start_session(
        &self,
        session_id: String,
        learner_id: String,
        profile: LearnerProfile,
        selection_seed: u64,
        bank: &ItemBank,
    ) -> EngineResult<StartOutcome> {
        self.persistence.upsert_user(&learner_id, None).await?;

        let now = Utc::now();
        let mut session = CatSession::new(session_id.clone(), learner_id, profile, selection_seed, now);

        self.exposure.record_session_started();
        let outcome = select_next_item(&session, bank, &self.exposure, &self.config.selector);
        let (item_id, question_type) = match outcome {
            SelectorOutcome::Selected { item_id, question_type } => (item_id, question_type),
            SelectorOutcome::NoEligibleItem => {
                return Err(EngineError::InvariantViolation(
                    "item bank has no renderable items for a fresh session".to_string(),
                ))
            }
        };

        let rendered = bank
            .render(item_id, question_type, &session.id, selection_seed)
            .ok_or_else(|| {
                EngineError::InvariantViolation(format!("item {item_id} selected but not renderable"))
            })?;

        session.state = SessionState::InProgress;
        session.pending_item = Some(rendered.clone());
        self.sessions.insert(session);

        Ok(StartOutcome { session_id, rendered })
    }

    /// Records one answer, advances the posterior, and either selects the next
    /// item or terminates the session.
    #[instrument(skip(self, bank))]
    pub async fn submit_response(
        &self,
        session_id: &str,
        item_id: i64,
        is_correct: bool,
        is_dont_know: bool,
        response_time_ms: u32,
        bank: &ItemBank,
    ) -> EngineResult<RespondOutcome> {
        let shared: SharedSession = self.sessions.get(session_id)?;
        let mut session = shared.lock().await;

        if session.is_terminal() {
            return Err(EngineError::Gone {
                session_id: session_id.to_string(),
            });
        }

        let pending = session.pending_item.clone().ok_or_else(|| {
            EngineError::InvariantViolation(format!("session {session_id} has no pending item"))
        })?;

        if pending.item_id != item_id {
            return Err(EngineError::Conflict {
                session_id: session_id.to_string(),
                item_id,
            });
        }
        if session.already_administered(item_id) {
            return Err(EngineError::Conflict {
                session_id: session_id.to_string(),
                item_id,
            });
        }

        let now = Utc::now();
        let scored_correct = is_correct && !is_dont_know;
        let item = bank.get(item_id).ok_or_else(|| {
            EngineError::InvariantViolation(format!("pending item {item_id} missing from bank"))
        })?;
        let irt = crate::domain::IrtParams {
            a: item.irt.a,
            b: item.effective_b(pending.question_type),
            c: item.irt.c,
        };
        session.posterior.update(irt, scored_correct);
        let theta_after = session.posterior.theta_hat();
        let se_after = session.posterior.standard_error();
        session.theta_history.push(theta_after);

        session.administered.push(item_id);
        session.exposure_consumed.insert(item_id);
        session.counters.record(
            &item.topic,
            item.pos,
            pending.question_type.dimension(),
            scored_correct,
        );
        self.exposure.record_administered(item_id, now);

        let sequence_idx = session.items_administered() - 1;
        let response = Response {
            item_id,
            is_correct,
            is_dont_know,
            response_time_ms,
            question_type: pending.question_type,
            rendered_options: pending.options.clone(),
            timestamp: now,
            theta_after,
            se_after,
            sequence_idx,
        };
        if let Err(err) = self.persistence.append_response(session_id, &response).await {
            warn!(%session_id, error = %err, "failed to persist response");
        }
        session.responses.push(response);
        session.last_activity_at = now;
        session.pending_item = None;

        if let Some(reason) = stopping::evaluate(&session, &self.config.stopping) {
            session.state = SessionState::Terminated;
            session.termination_reason = Some(reason);
            let report = build_report(&session, bank, self.config.knowledge_matrix_sample_size);
            if let Err(err) = self.persistence.archive_session(&session).await {
                warn!(%session_id, error = %err, "failed to archive terminated session");
            }
            drop(session);
            self.sessions.remove(session_id);
            info!(%session_id, ?reason, "session terminated");
            return Ok(RespondOutcome::Terminated {
                report: Box::new(report),
            });
        }

        match select_next_item(&session, bank, &self.exposure, &self.config.selector) {
            SelectorOutcome::Selected { item_id, question_type } => {
                let rendered = bank
                    .render(item_id, question_type, &session.id, session.selection_seed)
                    .ok_or_else(|| {
                        EngineError::InvariantViolation(format!(
                            "item {item_id} selected but not renderable"
                        ))
                    })?;
                session.pending_item = Some(rendered.clone());
                Ok(RespondOutcome::Continue { rendered })
            }
            SelectorOutcome::NoEligibleItem => {
                session.state = SessionState::Terminated;
                session.termination_reason = Some(crate::domain::TerminationReason::PoolExhausted);
                let report = build_report(&session, bank, self.config.knowledge_matrix_sample_size);
                if let Err(err) = self.persistence.archive_session(&session).await {
                    warn!(%session_id, error = %err, "failed to archive pool-exhausted session");
                }
                drop(session);
                self.sessions.remove(session_id);
                Ok(RespondOutcome::Terminated {
                    report: Box::new(report),
                })
            }
        }
    }

    /// Evicts sessions idle past the configured TTL, archiving each as
    /// `Expired` before removal and returning the partial report built for
    /// it (flagged `insufficient_data` if fewer than 5 items were
    /// administered), since there's no request-handler caller left to hand
    /// it to synchronously.
    #[instrument(skip(self, bank))]
    pub async fn sweep_expired(&self, bank: &ItemBank) -> Vec<Box<Report>> {
        let now = Utc::now();
        let expired = self.sessions.sweep_expired(now).await;
        let mut reports = Vec::with_capacity(expired.len());
        for shared in expired {
            let mut session = shared.lock().await;
            session.state = SessionState::Terminated;
            session.termination_reason = Some(crate::domain::TerminationReason::Expired);
            let report = build_report(&session, bank, self.config.knowledge_matrix_sample_size);
            let session_id = session.id.clone();
            if let Err(err) = self.persistence.archive_session(&session).await {
                warn!(%session_id, error = %err, "failed to archive expired session");
            }
            reports.push(Box::new(report));
        }
        reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::test_support::sample_bank;
    use crate::domain::{ExamExperience, Grade, SelfAssessment};
    use crate::ports::MockPersistencePort;

    fn sample_profile() -> LearnerProfile {
        LearnerProfile {
            grade: Grade::Middle,
            self_assessment: SelfAssessment::Intermediate,
            exam_experience: ExamExperience::None,
            preferred_question_type: None,
        }
    }

    fn permissive_mock() -> MockPersistencePort {
        let mut mock = MockPersistencePort::new();
        mock.expect_upsert_user().returning(|_, _| Ok(()));
        mock.expect_append_response().returning(|_, _| Ok(()));
        mock.expect_archive_session().returning(|_| Ok(()));
        mock
    }

    #[tokio::test]
    async fn start_session_renders_a_first_item_in_progress() {
        let bank = sample_bank();
        let service = CatSessionService::new(
            Arc::new(ExposureController::new()),
            Arc::new(permissive_mock()),
            EngineConfig::default(),
        );
        let outcome = service
            .start_session("s1".into(), "learner-1".into(), sample_profile(), 7, &bank)
            .await
            .unwrap();
        assert_eq!(outcome.session_id, "s1");
        assert!(bank.get(outcome.rendered.item_id).is_some());
        assert_eq!(service.active_session_count(), 1);
    }

    #[tokio::test]
    async fn submitting_a_response_for_the_wrong_item_is_a_conflict() {
        let bank = sample_bank();
        let service = CatSessionService::new(
            Arc::new(ExposureController::new()),
            Arc::new(permissive_mock()),
            EngineConfig::default(),
        );
        service
            .start_session("s1".into(), "learner-1".into(), sample_profile(), 7, &bank)
            .await
            .unwrap();

        let result = service
            .submit_response("s1", 99999, true, false, 1200, &bank)
            .await;
        assert!(matches!(result, Err(EngineError::Conflict { .. })));
    }

    #[tokio::test]
    async fn session_runs_until_max_items_and_terminates() {
        let bank = sample_bank();
        let mut config = EngineConfig::default();
        config.stopping.min_items = 3;
        config.stopping.max_items = 3;
        config.stopping.se_threshold_min_items = 1000;
        config.stopping.convergence_min_items = 1000;

        let service = CatSessionService::new(
            Arc::new(ExposureController::new()),
            Arc::new(permissive_mock()),
            config,
        );
        let start = service
            .start_session("s1".into(), "learner-1".into(), sample_profile(), 7, &bank)
            .await
            .unwrap();

        let mut item_id = start.rendered.item_id;
        for _ in 0..2 {
            match service
                .submit_response("s1", item_id, true, false, 1000, &bank)
                .await
                .unwrap()
            {
                RespondOutcome::Continue { rendered } => item_id = rendered.item_id,
                RespondOutcome::Terminated { .. } => panic!("terminated too early"),
            }
        }

        match service
            .submit_response("s1", item_id, true, false, 1000, &bank)
            .await
            .unwrap()
        {
            RespondOutcome::Terminated { report } => {
                assert_eq!(report.knowledge_matrix.len().min(1), report.knowledge_matrix.len());
            }
            RespondOutcome::Continue { .. } => panic!("expected termination at max_items"),
        }
        assert_eq!(service.active_session_count(), 0);
    }

    #[tokio::test]
    async fn sweeping_expired_sessions_archives_and_returns_a_report() {
        let bank = sample_bank();
        let mut config = EngineConfig::default();
        config.session_manager.session_ttl = std::time::Duration::from_secs(0);

        let mut mock = MockPersistencePort::new();
        mock.expect_upsert_user().returning(|_, _| Ok(()));
        mock.expect_archive_session().times(1).returning(|_| Ok(()));

        let service = CatSessionService::new(Arc::new(ExposureController::new()), Arc::new(mock), config);
        service
            .start_session("s1".into(), "learner-1".into(), sample_profile(), 7, &bank)
            .await
            .unwrap();

        let reports = service.sweep_expired(&bank).await;
        assert_eq!(reports.len(), 1);
        assert!(reports[0].insufficient_data);
        assert_eq!(service.active_session_count(), 0);
    }
}
