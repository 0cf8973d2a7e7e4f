use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::math::eap::Posterior;

use super::item::{Dimension, PartOfSpeech, QuestionType, RenderedItem};
use super::profile::LearnerProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Initialized,
    InProgress,
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    MaxItems,
    SeThreshold,
    Convergence,
    PoolExhausted,
    Expired,
}

/// One recorded answer. `is_dont_know=true` counts as incorrect for θ
/// but is reported separately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub item_id: i64,
    pub is_correct: bool,
    pub is_dont_know: bool,
    pub response_time_ms: u32,
    pub question_type: QuestionType,
    pub rendered_options: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub theta_after: f64,
    pub se_after: f64,
    pub sequence_idx: u32,
}

impl Response {
    /// Whether this response counts as a correct answer for θ estimation.
    pub fn scored_correct(&self) -> bool {
        self.is_correct && !self.is_dont_know
    }
}

/// The running counters the selector's content constraints
/// consult without re-scanning the full response history each time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentCounters {
    pub topic_counts: HashMap<String, u32>,
    /// (correct, total) per topic, used by the reporter's strengths/weaknesses.
    pub topic_stats: HashMap<String, (u32, u32)>,
    pub pos_counts: HashMap<PartOfSpeech, u32>,
    pub dimension_counts: HashMap<Dimension, (u32, u32)>,
}

impl ContentCounters {
    pub fn record(&mut self, topic: &str, pos: PartOfSpeech, dimension: Dimension, correct: bool) {
        *self.topic_counts.entry(topic.to_string()).or_insert(0) += 1;
        let topic_entry = self.topic_stats.entry(topic.to_string()).or_insert((0, 0));
        topic_entry.1 += 1;
        if correct {
            topic_entry.0 += 1;
        }
        *self.pos_counts.entry(pos).or_insert(0) += 1;
        let entry = self.dimension_counts.entry(dimension).or_insert((0, 0));
        entry.1 += 1;
        if correct {
            entry.0 += 1;
        }
    }

    pub fn total_administered(&self) -> u32 {
        self.topic_counts.values().sum()
    }
}

/// State: learner id, profile, posterior, history, counters, exposure-consumed
/// set, selection seed, timestamps, termination status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatSession {
    pub id: String,
    pub learner_id: String,
    pub profile: LearnerProfile,
    pub posterior: Posterior,
    pub administered: Vec<i64>,
    pub responses: Vec<Response>,
    pub counters: ContentCounters,
    pub exposure_consumed: std::collections::HashSet<i64>,
    pub selection_seed: u64,
    pub started_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub state: SessionState,
    pub termination_reason: Option<TerminationReason>,
    /// The item/type most recently handed to the learner but not yet answered.
    pub pending_item: Option<RenderedItem>,
    /// θ̂ after each response, oldest first; used by the convergence rule.
    pub theta_history: Vec<f64>,
}

impl CatSession {
    pub fn new(
        id: String,
        learner_id: String,
        profile: LearnerProfile,
        selection_seed: u64,
        now: DateTime<Utc>,
    ) -> Self {
        let initial_bias = profile.initial_theta_bias();
        Self {
            id,
            learner_id,
            profile,
            posterior: Posterior::with_prior_mean(initial_bias),
            administered: Vec::new(),
            responses: Vec::new(),
            counters: ContentCounters::default(),
            exposure_consumed: std::collections::HashSet::new(),
            selection_seed,
            started_at: now,
            last_activity_at: now,
            state: SessionState::Initialized,
            termination_reason: None,
            pending_item: None,
            theta_history: Vec::new(),
        }
    }

    pub fn items_administered(&self) -> u32 {
        self.administered.len() as u32
    }

    pub fn already_administered(&self, item_id: i64) -> bool {
        self.administered.contains(&item_id)
    }

    pub fn is_terminal(&self) -> bool {
        self.state == SessionState::Terminated
    }

    /// Last five Δθ̂ values, oldest first, for the convergence check.
    pub fn recent_theta_deltas(&self, window: usize) -> Vec<f64> {
        if self.theta_history.len() < window + 1 {
            return Vec::new();
        }
        let start = self.theta_history.len() - window - 1;
        self.theta_history[start..]
            .windows(2)
            .map(|pair| pair[1] - pair[0])
            .collect()
    }
}
