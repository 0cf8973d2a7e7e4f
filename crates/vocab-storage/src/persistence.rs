//! `PersistencePort` over the `users` / `test_sessions` / `responses` /
//! `goal_learning_sessions` / `learned_words` tables, using plain
//! `sqlx::query` + `.bind()`/`.get()` rather than the compile-time-checked
//! query macros, since this schema has no fixture database for
//! `cargo sqlx prepare` to check against yet.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use vocab_core::domain::{CatSession, LearnedWord, LearningSession, Response, TerminationReason};
use vocab_core::error::{EngineError, EngineResult};
use vocab_core::ports::{PersistencePort, SessionHistoryEntry, UserRecord};

use crate::error::StorageError;

pub struct SqlitePersistencePort {
    pool: SqlitePool,
}

impl SqlitePersistencePort {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn load_user(&self, user_id: &str) -> EngineResult<Option<UserRecord>> {
        let row = sqlx::query("SELECT id, nickname, created_at, last_active_at FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::Database)?;

        Ok(row.map(|r| UserRecord {
            id: r.get("id"),
            nickname: r.get("nickname"),
            created_at: parse_ts(r.get("created_at")),
            last_active_at: parse_ts(r.get("last_active_at")),
        }))
    }
}

fn parse_ts(raw: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn termination_reason_to_str(reason: TerminationReason) -> &'static str {
    match reason {
        TerminationReason::MaxItems => "max_items",
        TerminationReason::SeThreshold => "se_threshold",
        TerminationReason::Convergence => "convergence",
        TerminationReason::PoolExhausted => "pool_exhausted",
        TerminationReason::Expired => "expired",
    }
}

fn termination_reason_from_str(raw: &str) -> Option<TerminationReason> {
    match raw {
        "max_items" => Some(TerminationReason::MaxItems),
        "se_threshold" => Some(TerminationReason::SeThreshold),
        "convergence" => Some(TerminationReason::Convergence),
        "pool_exhausted" => Some(TerminationReason::PoolExhausted),
        "expired" => Some(TerminationReason::Expired),
        _ => None,
    }
}

fn json_err(column: &'static str) -> impl Fn(serde_json::Error) -> EngineError {
    move |source| EngineError::from(StorageError::MalformedJson { column, source })
}

#[async_trait]
impl PersistencePort for SqlitePersistencePort {
    async fn upsert_user<'a>(&self, user_id: &str, nickname: Option<&'a str>) -> EngineResult<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO users (id, nickname, created_at, last_active_at) VALUES (?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET last_active_at = excluded.last_active_at,
                nickname = COALESCE(excluded.nickname, users.nickname)",
        )
        .bind(user_id)
        .bind(nickname)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(StorageError::Database)?;
        Ok(())
    }

    async fn archive_session(&self, session: &CatSession) -> EngineResult<()> {
        let profile_json = serde_json::to_string(&session.profile).map_err(json_err("profile_json"))?;
        let termination = session.termination_reason.map(termination_reason_to_str);

        sqlx::query(
            "INSERT INTO test_sessions
                (id, user_id, started_at, last_activity_at, completed_at, final_theta, final_se, termination_reason, profile_json)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                last_activity_at = excluded.last_activity_at,
                completed_at = excluded.completed_at,
                final_theta = excluded.final_theta,
                final_se = excluded.final_se,
                termination_reason = excluded.termination_reason",
        )
        .bind(&session.id)
        .bind(&session.learner_id)
        .bind(session.started_at.to_rfc3339())
        .bind(session.last_activity_at.to_rfc3339())
        .bind(Utc::now().to_rfc3339())
        .bind(session.posterior.theta_hat())
        .bind(session.posterior.standard_error())
        .bind(termination)
        .bind(profile_json)
        .execute(&self.pool)
        .await
        .map_err(StorageError::Database)?;
        Ok(())
    }

    async fn append_response(&self, session_id: &str, response: &Response) -> EngineResult<()> {
        let options_json =
            serde_json::to_string(&response.rendered_options).map_err(json_err("rendered_options_json"))?;

        sqlx::query(
            "INSERT INTO responses
                (session_id, item_id, question_type, is_correct, is_dont_know, response_time_ms,
                 rendered_options_json, theta_after, se_after, sequence_idx, timestamp)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(session_id, item_id) DO NOTHING",
        )
        .bind(session_id)
        .bind(response.item_id)
        .bind(response.question_type as i64)
        .bind(response.is_correct)
        .bind(response.is_dont_know)
        .bind(response.response_time_ms as i64)
        .bind(options_json)
        .bind(response.theta_after)
        .bind(response.se_after)
        .bind(response.sequence_idx as i64)
        .bind(response.timestamp.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(StorageError::Database)?;
        Ok(())
    }

    async fn load_responses(&self, session_id: &str) -> EngineResult<Vec<Response>> {
        let rows = sqlx::query(
            "SELECT item_id, question_type, is_correct, is_dont_know, response_time_ms,
                    rendered_options_json, theta_after, se_after, sequence_idx, timestamp
             FROM responses WHERE session_id = ? ORDER BY sequence_idx ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::Database)?;

        rows.into_iter()
            .map(|row| {
                let question_type_raw: i64 = row.get("question_type");
                let question_type = vocab_core::domain::QuestionType::try_from(question_type_raw as u8)
                    .map_err(EngineError::InvariantViolation)?;
                let options_json: String = row.get("rendered_options_json");
                let rendered_options: Vec<String> =
                    serde_json::from_str(&options_json).map_err(json_err("rendered_options_json"))?;

                Ok(Response {
                    item_id: row.get("item_id"),
                    is_correct: row.get("is_correct"),
                    is_dont_know: row.get("is_dont_know"),
                    response_time_ms: row.get::<i64, _>("response_time_ms") as u32,
                    question_type,
                    rendered_options,
                    timestamp: parse_ts(row.get("timestamp")),
                    theta_after: row.get("theta_after"),
                    se_after: row.get("se_after"),
                    sequence_idx: row.get::<i64, _>("sequence_idx") as u32,
                })
            })
            .collect()
    }

    async fn load_history(&self, user_id: &str) -> EngineResult<Vec<SessionHistoryEntry>> {
        let rows = sqlx::query(
            "SELECT id, started_at, completed_at, final_theta, final_se, termination_reason
             FROM test_sessions WHERE user_id = ? ORDER BY started_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::Database)?;

        Ok(rows
            .into_iter()
            .map(|row| SessionHistoryEntry {
                session_id: row.get("id"),
                started_at: parse_ts(row.get("started_at")),
                completed_at: row.get::<Option<String>, _>("completed_at").map(parse_ts),
                final_theta: row.get("final_theta"),
                final_se: row.get("final_se"),
                termination_reason: row
                    .get::<Option<String>, _>("termination_reason")
                    .as_deref()
                    .and_then(termination_reason_from_str),
            })
            .collect())
    }

    async fn save_learning_session(&self, session: &LearningSession) -> EngineResult<()> {
        let queue_json = serde_json::to_string(&session.study_queue).map_err(json_err("study_queue_json"))?;

        let mut tx = self.pool.begin().await.map_err(StorageError::Database)?;

        sqlx::query(
            "INSERT INTO goal_learning_sessions
                (id, user_id, goal_id, target_word_count, words_studied, words_mastered, total_reviews,
                 study_queue_json, selection_seed, started_at, last_activity_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                words_studied = excluded.words_studied,
                words_mastered = excluded.words_mastered,
                total_reviews = excluded.total_reviews,
                study_queue_json = excluded.study_queue_json,
                last_activity_at = excluded.last_activity_at",
        )
        .bind(&session.id)
        .bind(&session.learner_id)
        .bind(format!("{:?}", session.goal))
        .bind(session.target_word_count as i64)
        .bind(session.words_studied as i64)
        .bind(session.words_mastered as i64)
        .bind(session.total_reviews as i64)
        .bind(queue_json)
        .bind(session.selection_seed as i64)
        .bind(session.started_at.to_rfc3339())
        .bind(session.last_activity_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(StorageError::Database)?;

        for word in session.learned_words.values() {
            let history_json =
                serde_json::to_string(&word.assessment_history).map_err(json_err("assessment_history_json"))?;
            sqlx::query(
                "INSERT INTO learned_words
                    (session_id, word_id, review_count, correct_count, next_review_at, ease_factor,
                     interval_days, is_mastered, mastered_at, last_reviewed_at, has_graduated,
                     assessment_history_json)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(session_id, word_id) DO UPDATE SET
                    review_count = excluded.review_count,
                    correct_count = excluded.correct_count,
                    next_review_at = excluded.next_review_at,
                    ease_factor = excluded.ease_factor,
                    interval_days = excluded.interval_days,
                    is_mastered = excluded.is_mastered,
                    mastered_at = excluded.mastered_at,
                    last_reviewed_at = excluded.last_reviewed_at,
                    has_graduated = excluded.has_graduated,
                    assessment_history_json = excluded.assessment_history_json",
            )
            .bind(&session.id)
            .bind(word.word_id)
            .bind(word.review_count as i64)
            .bind(word.correct_count as i64)
            .bind(word.next_review_at.to_rfc3339())
            .bind(word.ease_factor)
            .bind(word.interval_days as i64)
            .bind(word.is_mastered)
            .bind(word.mastered_at.map(|t| t.to_rfc3339()))
            .bind(word.last_reviewed_at.map(|t| t.to_rfc3339()))
            .bind(word.has_graduated)
            .bind(history_json)
            .execute(&mut *tx)
            .await
            .map_err(StorageError::Database)?;
        }

        tx.commit().await.map_err(StorageError::Database)?;
        Ok(())
    }

    async fn load_learning_session(&self, session_id: &str) -> EngineResult<Option<LearningSession>> {
        let row = sqlx::query(
            "SELECT user_id, goal_id, target_word_count, words_studied, words_mastered, total_reviews,
                    study_queue_json, selection_seed, started_at, last_activity_at
             FROM goal_learning_sessions WHERE id = ?",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::Database)?;

        let Some(row) = row else { return Ok(None) };

        let goal_id: String = row.get("goal_id");
        let goal = parse_goal(&goal_id).ok_or_else(|| {
            EngineError::InvariantViolation(format!("unknown persisted goal: {goal_id}"))
        })?;
        let study_queue_json: String = row.get("study_queue_json");
        let study_queue: Vec<i64> = serde_json::from_str(&study_queue_json).map_err(json_err("study_queue_json"))?;

        let mut session = LearningSession::new(
            session_id.to_string(),
            row.get("user_id"),
            goal,
            row.get::<i64, _>("target_word_count") as u32,
            study_queue,
            row.get::<i64, _>("selection_seed") as u64,
            parse_ts(row.get("started_at")),
        );
        session.last_activity_at = parse_ts(row.get("last_activity_at"));
        session.words_studied = row.get::<i64, _>("words_studied") as u32;
        session.words_mastered = row.get::<i64, _>("words_mastered") as u32;
        session.total_reviews = row.get::<i64, _>("total_reviews") as u32;

        let word_rows = sqlx::query(
            "SELECT word_id, review_count, correct_count, next_review_at, ease_factor, interval_days,
                    is_mastered, mastered_at, last_reviewed_at, has_graduated, assessment_history_json
             FROM learned_words WHERE session_id = ?",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::Database)?;

        for row in word_rows {
            let history_json: String = row.get("assessment_history_json");
            let word = LearnedWord {
                word_id: row.get("word_id"),
                interval_days: row.get::<i64, _>("interval_days") as u32,
                ease_factor: row.get("ease_factor"),
                review_count: row.get::<i64, _>("review_count") as u32,
                correct_count: row.get::<i64, _>("correct_count") as u32,
                next_review_at: parse_ts(row.get("next_review_at")),
                is_mastered: row.get("is_mastered"),
                mastered_at: row.get::<Option<String>, _>("mastered_at").map(parse_ts),
                assessment_history: serde_json::from_str(&history_json)
                    .map_err(json_err("assessment_history_json"))?,
                last_reviewed_at: row.get::<Option<String>, _>("last_reviewed_at").map(parse_ts),
                has_graduated: row.get("has_graduated"),
            };
            session.learned_words.insert(word.word_id, word);
        }

        Ok(Some(session))
    }
}

fn parse_goal(raw: &str) -> Option<vocab_core::domain::Goal> {
    use vocab_core::domain::Goal;
    match raw {
        "Elementary" => Some(Goal::Elementary),
        "Middle" => Some(Goal::Middle),
        "High" => Some(Goal::High),
        "Csat" => Some(Goal::Csat),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vocab_core::domain::{ExamExperience, Goal, Grade, LearnerProfile, SelfAssessment};

    fn sample_profile() -> LearnerProfile {
        LearnerProfile {
            grade: Grade::Middle,
            self_assessment: SelfAssessment::Intermediate,
            exam_experience: ExamExperience::None,
            preferred_question_type: None,
        }
    }

    #[tokio::test]
    async fn upsert_user_is_idempotent() {
        let pool = crate::schema::init_in_memory_db().await.unwrap();
        let port = SqlitePersistencePort::new(pool);
        port.upsert_user("u1", Some("alice")).await.unwrap();
        port.upsert_user("u1", None).await.unwrap();
        let user = port.load_user("u1").await.unwrap().unwrap();
        assert_eq!(user.nickname.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn archived_session_round_trips_through_history() {
        let pool = crate::schema::init_in_memory_db().await.unwrap();
        let port = SqlitePersistencePort::new(pool);
        port.upsert_user("u1", None).await.unwrap();

        let mut session =
            CatSession::new("s1".into(), "u1".into(), sample_profile(), 1, Utc::now());
        session.termination_reason = Some(TerminationReason::SeThreshold);
        port.archive_session(&session).await.unwrap();

        let history = port.load_history("u1").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].termination_reason, Some(TerminationReason::SeThreshold));
    }

    #[tokio::test]
    async fn duplicate_response_insert_is_ignored() {
        let pool = crate::schema::init_in_memory_db().await.unwrap();
        let port = SqlitePersistencePort::new(pool);
        port.upsert_user("u1", None).await.unwrap();
        let session = CatSession::new("s1".into(), "u1".into(), sample_profile(), 1, Utc::now());
        port.archive_session(&session).await.unwrap();

        let response = Response {
            item_id: 42,
            is_correct: true,
            is_dont_know: false,
            response_time_ms: 1000,
            question_type: vocab_core::domain::QuestionType::KoreanMeaning,
            rendered_options: vec!["a".into(), "b".into()],
            timestamp: Utc::now(),
            theta_after: 0.1,
            se_after: 0.9,
            sequence_idx: 0,
        };
        port.append_response("s1", &response).await.unwrap();
        port.append_response("s1", &response).await.unwrap();

        let loaded = port.load_responses("s1").await.unwrap();
        assert_eq!(loaded.len(), 1);
    }

    #[tokio::test]
    async fn goal_session_round_trips_with_its_learned_words() {
        let pool = crate::schema::init_in_memory_db().await.unwrap();
        let port = SqlitePersistencePort::new(pool);
        port.upsert_user("u1", None).await.unwrap();

        let mut session =
            LearningSession::new("gs1".into(), "u1".into(), Goal::Middle, 10, vec![1, 2, 3], 7, Utc::now());
        session.learned_words.insert(1, LearnedWord::new(1, Utc::now()));
        port.save_learning_session(&session).await.unwrap();

        let loaded = port.load_learning_session("gs1").await.unwrap().unwrap();
        assert_eq!(loaded.goal, Goal::Middle);
        assert!(loaded.learned_words.contains_key(&1));
        assert_eq!(loaded.study_queue, vec![1, 2, 3]);
    }
}
