//! Per-goal, per-stage question-type distributions, expressed as typed
//! configuration rather than dynamic parameter dicts.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::prelude::*;
use rand::rngs::StdRng;

use crate::domain::{Goal, Item, LearningStage, QuestionType};

/// A fixed 6-slot probability table, one entry per `QuestionType`, indexed by
/// `QuestionType as usize - 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TypeDistribution([f64; 6]);

impl TypeDistribution {
    const fn new(weights: [f64; 6]) -> Self {
        Self(weights)
    }

    pub fn weight(&self, qtype: QuestionType) -> f64 {
        self.0[qtype as usize - 1]
    }

    /// Types ordered by descending probability, ties broken by ascending
    /// `QuestionType` id for determinism.
    fn ranked_types(&self) -> Vec<QuestionType> {
        let mut types = QuestionType::ALL.to_vec();
        types.sort_by(|&a, &b| {
            self.weight(b)
                .partial_cmp(&self.weight(a))
                .unwrap_or(std::cmp::Ordering::Equal)
                .then((a as u8).cmp(&(b as u8)))
        });
        types
    }
}

macro_rules! dist {
    ($a:expr, $b:expr, $c:expr, $d:expr, $e:expr, $f:expr) => {
        TypeDistribution::new([$a, $b, $c, $d, $e, $f])
    };
}

fn table(goal: Goal, stage: LearningStage) -> TypeDistribution {
    use LearningStage::*;
    match (goal, stage) {
        (Goal::Elementary, FirstExposure) => dist!(0.60, 0.0, 0.20, 0.0, 0.20, 0.0),
        (Goal::Elementary, Review) => dist!(0.40, 0.0, 0.30, 0.20, 0.10, 0.0),
        (Goal::Elementary, MasteryCheck) => dist!(0.0, 0.0, 0.40, 0.30, 0.30, 0.0),
        (Goal::Middle, FirstExposure) => dist!(0.40, 0.0, 0.30, 0.0, 0.20, 0.10),
        (Goal::Middle, Review) => dist!(0.30, 0.0, 0.25, 0.20, 0.15, 0.10),
        (Goal::Middle, MasteryCheck) => dist!(0.0, 0.20, 0.20, 0.20, 0.20, 0.20),
        (Goal::High, FirstExposure) => dist!(0.30, 0.0, 0.30, 0.0, 0.30, 0.10),
        (Goal::High, Review) => dist!(0.20, 0.20, 0.20, 0.20, 0.20, 0.0),
        (Goal::High, MasteryCheck) => dist!(0.0, 0.25, 0.15, 0.15, 0.25, 0.20),
        (Goal::Csat, FirstExposure) => dist!(0.30, 0.10, 0.20, 0.0, 0.30, 0.10),
        (Goal::Csat, Review) => dist!(0.20, 0.20, 0.20, 0.20, 0.20, 0.0),
        (Goal::Csat, MasteryCheck) => dist!(0.0, 0.30, 0.10, 0.10, 0.30, 0.20),
    }
}

fn sampling_rng(session_id: &str, seed: u64, word_id: i64, review_count: u32) -> StdRng {
    let mut hasher = DefaultHasher::new();
    session_id.hash(&mut hasher);
    seed.hash(&mut hasher);
    word_id.hash(&mut hasher);
    review_count.hash(&mut hasher);
    StdRng::seed_from_u64(hasher.finish())
}

/// Samples a question type from the goal/stage distribution, falling back to
/// the next-highest-probability type the item actually supports when the
/// sampled type is unsupported.
pub fn sample_question_type(
    goal: Goal,
    stage: LearningStage,
    item: &Item,
    session_id: &str,
    seed: u64,
    review_count: u32,
) -> Option<QuestionType> {
    let distribution = table(goal, stage);
    let mut rng = sampling_rng(session_id, seed, item.id, review_count);
    let roll: f64 = rng.gen_range(0.0..1.0);

    let mut cumulative = 0.0;
    let mut sampled = None;
    for &qtype in QuestionType::ALL.iter() {
        cumulative += distribution.weight(qtype);
        if roll < cumulative {
            sampled = Some(qtype);
            break;
        }
    }
    let sampled = sampled.or_else(|| QuestionType::ALL.last().copied())?;

    if item.supports(sampled) {
        return Some(sampled);
    }

    distribution
        .ranked_types()
        .into_iter()
        .find(|&qtype| item.supports(qtype))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CefrBand, CurriculumBand, IrtParams, ItemRelations, PartOfSpeech};
    use std::collections::HashMap;

    fn item_supporting(types: &[QuestionType]) -> Item {
        Item {
            id: 1,
            lemma: "finish".to_string(),
            pos: PartOfSpeech::Verb,
            topic: "school".to_string(),
            cefr: CefrBand::A2,
            curriculum: CurriculumBand::Elementary,
            frequency_rank: 10,
            irt: IrtParams { a: 1.0, b: 0.0, c: 0.2 },
            capable_types: types.to_vec(),
            relations: ItemRelations::default(),
            attributes: HashMap::new(),
        }
    }

    #[test]
    fn every_table_entry_sums_to_one() {
        for &goal in &[Goal::Elementary, Goal::Middle, Goal::High, Goal::Csat] {
            for &stage in &[
                LearningStage::FirstExposure,
                LearningStage::Review,
                LearningStage::MasteryCheck,
            ] {
                let total: f64 = QuestionType::ALL.iter().map(|&qt| table(goal, stage).weight(qt)).sum();
                assert!((total - 1.0).abs() < 1e-9, "{goal:?}/{stage:?} sums to {total}");
            }
        }
    }

    #[test]
    fn falls_back_to_a_supported_type_when_sampled_type_is_unsupported() {
        let item = item_supporting(&[QuestionType::Cloze]);
        let qtype = sample_question_type(
            Goal::Middle,
            LearningStage::MasteryCheck,
            &item,
            "session-1",
            1,
            5,
        );
        assert_eq!(qtype, Some(QuestionType::Cloze));
    }

    #[test]
    fn sampling_is_deterministic_for_the_same_inputs() {
        let item = item_supporting(&QuestionType::ALL);
        let first = sample_question_type(Goal::High, LearningStage::Review, &item, "s", 42, 2);
        let second = sample_question_type(Goal::High, LearningStage::Review, &item, "s", 42, 2);
        assert_eq!(first, second);
    }

    #[test]
    fn no_eligible_type_returns_none() {
        let item = item_supporting(&[]);
        let qtype = sample_question_type(Goal::Csat, LearningStage::FirstExposure, &item, "s", 1, 0);
        assert_eq!(qtype, None);
    }
}
