//! Chooses the next item under content-balance, exposure, and information
//! constraints.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::prelude::*;
use rand::rngs::StdRng;

use crate::bank::ItemBank;
use crate::config::SelectorConfig;
use crate::domain::{CatSession, PartOfSpeech, QuestionType};
use crate::exposure::ExposureController;

#[derive(Debug, Clone, PartialEq)]
pub enum SelectorOutcome {
    Selected { item_id: i64, question_type: QuestionType },
    NoEligibleItem,
}

/// POS ratio balancing only kicks in once there is enough history to judge a
/// ratio against; with zero or one prior items almost any single pick would
/// look like a 100% skew. Not specified numerically in the source; a
/// deliberate implementation choice, recorded in DESIGN.md.
const POS_BALANCE_MIN_ADMINISTERED: u32 = 5;

fn target_pos_ratio() -> f64 {
    1.0 / 5.0
}

fn passes_pos_ratio(session: &CatSession, pos: PartOfSpeech, tolerance: f64) -> bool {
    let total = session.counters.total_administered();
    if total < POS_BALANCE_MIN_ADMINISTERED {
        return true;
    }
    let current = *session.counters.pos_counts.get(&pos).unwrap_or(&0);
    let hypothetical_ratio = (current + 1) as f64 / (total + 1) as f64;
    let target = target_pos_ratio();
    (hypothetical_ratio - target).abs() <= tolerance
}

fn content_constraints(
    session: &CatSession,
    bank: &ItemBank,
    config: &SelectorConfig,
) -> Vec<i64> {
    bank.all_items()
        .filter(|item| {
            !session.already_administered(item.id)
                && *session.counters.topic_counts.get(&item.topic).unwrap_or(&0)
                    < config.max_per_topic
                && passes_pos_ratio(session, item.pos, config.pos_ratio_tolerance)
                && match session.profile.preferred_question_type {
                    Some(qtype) => item.supports(qtype) && bank.is_renderable(item.id, qtype),
                    None => QuestionType::ALL
                        .iter()
                        .any(|&qtype| item.supports(qtype) && bank.is_renderable(item.id, qtype)),
                }
        })
        .map(|item| item.id)
        .collect()
}

/// Sympson-Hetter exposure gate: drop over-exposed items, relax by one step
/// if that empties the set, and otherwise proceed ungated.
fn exposure_gate(
    candidates: &[i64],
    exposure: &ExposureController,
    config: &SelectorConfig,
) -> Vec<i64> {
    let gated: Vec<i64> = candidates
        .iter()
        .copied()
        .filter(|&id| exposure.exposure_rate(id) < config.max_exposure_rate)
        .collect();
    if !gated.is_empty() {
        return gated;
    }

    let relaxed_rate = config.max_exposure_rate + config.exposure_relaxation_step;
    let relaxed: Vec<i64> = candidates
        .iter()
        .copied()
        .filter(|&id| exposure.exposure_rate(id) < relaxed_rate)
        .collect();
    if !relaxed.is_empty() {
        return relaxed;
    }

    candidates.to_vec()
}

fn selection_rng(session: &CatSession) -> StdRng {
    let mut hasher = DefaultHasher::new();
    session.id.hash(&mut hasher);
    session.selection_seed.hash(&mut hasher);
    session.items_administered().hash(&mut hasher);
    StdRng::seed_from_u64(hasher.finish())
}

/// Picks the supported type the learner prefers if possible, else the
/// supported type whose effective difficulty is closest to θ̂.
fn assign_question_type(session: &CatSession, bank: &ItemBank, item_id: i64) -> Option<QuestionType> {
    let item = bank.get(item_id)?;
    let theta_hat = session.posterior.theta_hat();

    if let Some(preferred) = session.profile.preferred_question_type {
        if item.supports(preferred) && bank.is_renderable(item_id, preferred) {
            return Some(preferred);
        }
    }

    QuestionType::ALL
        .iter()
        .filter(|&&qtype| item.supports(qtype) && bank.is_renderable(item_id, qtype))
        .min_by(|&&a, &&b| {
            let da = (item.effective_b(a) - theta_hat).abs();
            let db = (item.effective_b(b) - theta_hat).abs();
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        })
        .copied()
}

pub fn select_next_item(
    session: &CatSession,
    bank: &ItemBank,
    exposure: &ExposureController,
    config: &SelectorConfig,
) -> SelectorOutcome {
    let constrained = content_constraints(session, bank, config);
    if constrained.is_empty() {
        return SelectorOutcome::NoEligibleItem;
    }

    let gated = exposure_gate(&constrained, exposure, config);
    if gated.is_empty() {
        return SelectorOutcome::NoEligibleItem;
    }

    let theta_hat = session.posterior.theta_hat();
    let ranked = bank.ranked_by_information(theta_hat, &gated, config.top_k);
    if ranked.is_empty() {
        return SelectorOutcome::NoEligibleItem;
    }

    let mut rng = selection_rng(session);
    let chosen_index = rng.gen_range(0..ranked.len());
    let item_id = ranked[chosen_index];

    match assign_question_type(session, bank, item_id) {
        Some(question_type) => SelectorOutcome::Selected { item_id, question_type },
        None => SelectorOutcome::NoEligibleItem,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::test_support::sample_bank;
    use crate::domain::{ExamExperience, Grade, LearnerProfile, SelfAssessment};
    use chrono::Utc;

    fn fresh_session() -> CatSession {
        let profile = LearnerProfile {
            grade: Grade::Middle,
            self_assessment: SelfAssessment::Intermediate,
            exam_experience: ExamExperience::None,
            preferred_question_type: None,
        };
        CatSession::new("s1".to_string(), "learner-1".to_string(), profile, 42, Utc::now())
    }

    #[test]
    fn selects_an_eligible_item_from_a_fresh_session() {
        let bank = sample_bank();
        let exposure = ExposureController::new();
        exposure.record_session_started();
        let session = fresh_session();
        let config = SelectorConfig::default();
        match select_next_item(&session, &bank, &exposure, &config) {
            SelectorOutcome::Selected { item_id, .. } => assert!(bank.get(item_id).is_some()),
            SelectorOutcome::NoEligibleItem => panic!("expected a selection"),
        }
    }

    #[test]
    fn never_reselects_an_already_administered_item() {
        let bank = sample_bank();
        let exposure = ExposureController::new();
        exposure.record_session_started();
        let mut session = fresh_session();
        for id in 1..=9 {
            session.administered.push(id);
        }
        let config = SelectorConfig::default();
        match select_next_item(&session, &bank, &exposure, &config) {
            SelectorOutcome::Selected { item_id, .. } => assert!(!session.already_administered(item_id)),
            SelectorOutcome::NoEligibleItem => {}
        }
    }

    #[test]
    fn exhausted_pool_reports_no_eligible_item() {
        let bank = sample_bank();
        let exposure = ExposureController::new();
        exposure.record_session_started();
        let mut session = fresh_session();
        for item in bank.all_items() {
            session.administered.push(item.id);
        }
        let config = SelectorConfig::default();
        assert_eq!(
            select_next_item(&session, &bank, &exposure, &config),
            SelectorOutcome::NoEligibleItem
        );
    }

    #[test]
    fn heavily_exposed_items_are_dropped_when_alternatives_exist() {
        let bank = sample_bank();
        let exposure = ExposureController::new();
        for _ in 0..10 {
            exposure.record_session_started();
        }
        for _ in 0..9 {
            exposure.record_administered(1, Utc::now());
        }
        let session = fresh_session();
        let config = SelectorConfig::default();
        if let SelectorOutcome::Selected { item_id, .. } =
            select_next_item(&session, &bank, &exposure, &config)
        {
            assert_ne!(item_id, 1);
        }
    }

    #[test]
    fn same_seed_and_history_selects_the_same_item() {
        let bank = sample_bank();
        let exposure = ExposureController::new();
        exposure.record_session_started();
        let session = fresh_session();
        let config = SelectorConfig::default();
        let first = select_next_item(&session, &bank, &exposure, &config);
        let second = select_next_item(&session, &bank, &exposure, &config);
        assert_eq!(first, second);
    }
}
