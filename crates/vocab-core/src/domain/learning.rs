use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::profile::Goal;

/// The learner's stage with a given word, which drives question-type sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningStage {
    FirstExposure,
    Review,
    MasteryCheck,
}

impl LearningStage {
    pub fn from_review_count(review_count: u32) -> Self {
        if review_count == 0 {
            LearningStage::FirstExposure
        } else if review_count >= 5 {
            LearningStage::MasteryCheck
        } else {
            LearningStage::Review
        }
    }
}

/// One self-rated review event, append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentEvent {
    pub timestamp: DateTime<Utc>,
    pub self_rating: u8,
    pub is_correct: bool,
}

/// Identity: (learning_session_id, word_id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnedWord {
    pub word_id: i64,
    pub interval_days: u32,
    pub ease_factor: f64,
    pub review_count: u32,
    pub correct_count: u32,
    pub next_review_at: DateTime<Utc>,
    pub is_mastered: bool,
    pub mastered_at: Option<DateTime<Utc>>,
    pub assessment_history: Vec<AssessmentEvent>,
    pub last_reviewed_at: Option<DateTime<Utc>>,
    /// Set on the first passing (s≥2) rating. Distinguishes "first passing
    /// review" from `review_count == 0`, which a prior s=0/s=1 rating would
    /// already have advanced past.
    pub has_graduated: bool,
}

impl LearnedWord {
    pub fn new(word_id: i64, now: DateTime<Utc>) -> Self {
        Self {
            word_id,
            interval_days: 0,
            ease_factor: 2.5,
            review_count: 0,
            correct_count: 0,
            next_review_at: now,
            is_mastered: false,
            mastered_at: None,
            assessment_history: Vec::new(),
            last_reviewed_at: None,
            has_graduated: false,
        }
    }

    pub fn stage(&self) -> LearningStage {
        LearningStage::from_review_count(self.review_count)
    }

    pub fn accuracy(&self) -> f64 {
        if self.review_count == 0 {
            0.0
        } else {
            self.correct_count as f64 / self.review_count as f64
        }
    }
}

/// Identity: opaque id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningSession {
    pub id: String,
    pub learner_id: String,
    pub goal: Goal,
    pub target_word_count: u32,
    pub learned_words: HashMap<i64, LearnedWord>,
    /// Unstudied words in the goal pool not yet assigned a `LearnedWord`,
    /// in the fixed order the pool was built (random draws index into this).
    pub study_queue: Vec<i64>,
    pub selection_seed: u64,
    pub started_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub words_studied: u32,
    pub words_mastered: u32,
    pub total_reviews: u32,
}

impl LearningSession {
    pub fn new(
        id: String,
        learner_id: String,
        goal: Goal,
        target_word_count: u32,
        study_queue: Vec<i64>,
        selection_seed: u64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            learner_id,
            goal,
            target_word_count,
            learned_words: HashMap::new(),
            study_queue,
            selection_seed,
            started_at: now,
            last_activity_at: now,
            words_studied: 0,
            words_mastered: 0,
            total_reviews: 0,
        }
    }

    pub fn completion_percentage(&self) -> f64 {
        if self.target_word_count == 0 {
            return 100.0;
        }
        (self.words_mastered as f64 / self.target_word_count as f64 * 100.0).min(100.0)
    }
}
