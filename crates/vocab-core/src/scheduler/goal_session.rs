//! The learning-goal session service: next-word choice, question-type
//! assignment, and SM-2 submission, wired the same way the CAT session wires
//! the selector and stopping rules.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use rand::prelude::*;
use rand::rngs::StdRng;
use tokio::sync::Mutex;

use crate::bank::ItemBank;
use crate::domain::{Goal, LearnedWord, LearningSession, QuestionType};
use crate::error::{EngineError, EngineResult};
use crate::ports::PersistencePort;

use super::distributions::sample_question_type;
use super::sm2::apply_rating;

/// The next card to present: the word and the question type chosen for it.
pub struct NextCard {
    pub word_id: i64,
    pub question_type: QuestionType,
}

fn pool_for_goal(bank: &ItemBank, goal: Goal) -> Vec<i64> {
    let curriculum = goal.curriculum_band();
    bank.all_items()
        .filter(|item| item.curriculum == curriculum)
        .map(|item| item.id)
        .collect()
}

fn study_queue_rng(session_id: &str, seed: u64) -> StdRng {
    let mut hasher = DefaultHasher::new();
    session_id.hash(&mut hasher);
    seed.hash(&mut hasher);
    StdRng::seed_from_u64(hasher.finish())
}

/// Builds a fresh learning session with its study queue shuffled once up
/// front, so "pick uniformly at random" becomes "pop the next
/// entry from a pre-shuffled queue" — deterministic given the seed.
pub fn new_learning_session(
    id: String,
    learner_id: String,
    goal: Goal,
    target_word_count: u32,
    selection_seed: u64,
    bank: &ItemBank,
) -> LearningSession {
    let mut queue = pool_for_goal(bank, goal);
    let mut rng = study_queue_rng(&id, selection_seed);
    queue.shuffle(&mut rng);
    LearningSession::new(id, learner_id, goal, target_word_count, queue, selection_seed, Utc::now())
}

/// The next-word choice algorithm.
pub fn choose_next_word(session: &mut LearningSession) -> Option<i64> {
    let now = Utc::now();

    let due = session
        .learned_words
        .values()
        .filter(|word| !word.is_mastered && word.next_review_at <= now)
        .min_by(|a, b| {
            a.next_review_at
                .cmp(&b.next_review_at)
                .then(a.ease_factor.partial_cmp(&b.ease_factor).unwrap_or(std::cmp::Ordering::Equal))
        })
        .map(|word| word.word_id);
    if due.is_some() {
        return due;
    }

    if let Some(word_id) = session.study_queue.pop() {
        return Some(word_id);
    }

    session
        .learned_words
        .values()
        .filter(|word| !word.is_mastered)
        .min_by_key(|word| word.last_reviewed_at.unwrap_or(word.next_review_at))
        .map(|word| word.word_id)
}

/// Produces the next card for the session, or `None` if the goal is complete.
pub fn next_card(session: &mut LearningSession, bank: &ItemBank) -> Option<NextCard> {
    let word_id = choose_next_word(session)?;
    let item = bank.get(word_id)?;
    let review_count = session
        .learned_words
        .get(&word_id)
        .map(|word| word.review_count)
        .unwrap_or(0);
    let stage = crate::domain::LearningStage::from_review_count(review_count);
    let question_type = sample_question_type(
        session.goal,
        stage,
        item,
        &session.id,
        session.selection_seed,
        review_count,
    )?;
    Some(NextCard { word_id, question_type })
}

fn ensure_word<'a>(session: &'a mut LearningSession, word_id: i64) -> &'a mut LearnedWord {
    let now = Utc::now();
    if !session.learned_words.contains_key(&word_id) {
        session.words_studied += 1;
        session.learned_words.insert(word_id, LearnedWord::new(word_id, now));
    }
    session.learned_words.get_mut(&word_id).unwrap()
}

/// Submits a self-rating for a card, running the SM-2 update and rolling the
/// result into the session's aggregate counters.
pub fn submit_rating(
    session: &mut LearningSession,
    word_id: i64,
    self_rating: u8,
    is_correct: bool,
) -> EngineResult<()> {
    if self_rating > 3 {
        return Err(EngineError::BadRequest(format!(
            "self_rating must be 0-3, got {self_rating}"
        )));
    }

    let was_mastered_before = session
        .learned_words
        .get(&word_id)
        .map(|word| word.is_mastered)
        .unwrap_or(false);

    let now = Utc::now();
    let word = ensure_word(session, word_id);
    apply_rating(word, self_rating, is_correct, now);
    let became_mastered = word.is_mastered && !was_mastered_before;

    session.total_reviews += 1;
    session.last_activity_at = now;
    if became_mastered {
        session.words_mastered += 1;
    }
    Ok(())
}

/// Process-wide registry of active learning sessions, mirroring the CAT
/// session manager's sharded-map-plus-per-session-lock shape.
pub struct GoalSessionService {
    persistence: Arc<dyn PersistencePort>,
    sessions: DashMap<String, Arc<Mutex<LearningSession>>>,
}

impl GoalSessionService {
    pub fn new(persistence: Arc<dyn PersistencePort>) -> Self {
        Self {
            persistence,
            sessions: DashMap::new(),
        }
    }

    pub async fn start(
        &self,
        session_id: String,
        learner_id: String,
        goal: Goal,
        target_word_count: u32,
        selection_seed: u64,
        bank: &ItemBank,
    ) -> EngineResult<(LearningSession, Option<NextCard>)> {
        self.persistence.upsert_user(&learner_id, None).await?;
        let mut session =
            new_learning_session(session_id.clone(), learner_id, goal, target_word_count, selection_seed, bank);
        let card = next_card(&mut session, bank);
        self.persistence.save_learning_session(&session).await?;
        self.sessions.insert(session_id, Arc::new(Mutex::new(session.clone())));
        Ok((session, card))
    }

    pub async fn submit(
        &self,
        session_id: &str,
        word_id: i64,
        self_rating: u8,
        is_correct: bool,
        bank: &ItemBank,
    ) -> EngineResult<(LearningSession, Option<NextCard>)> {
        let shared = self
            .sessions
            .get(session_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| EngineError::SessionNotFound {
                session_id: session_id.to_string(),
            })?;
        let mut session = shared.lock().await;
        submit_rating(&mut session, word_id, self_rating, is_correct)?;
        let card = next_card(&mut session, bank);
        self.persistence.save_learning_session(&session).await?;
        Ok((session.clone(), card))
    }

    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }
}
