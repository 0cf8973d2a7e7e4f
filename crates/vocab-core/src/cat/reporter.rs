//! Maps a terminal session state to the diagnostic report. Every value
//! here is a pure function of the terminal state plus the bank.

use std::collections::HashMap;

use serde::Serialize;

use crate::bank::ItemBank;
use crate::domain::{CatSession, CefrBand, Dimension, IrtParams, QuestionType};
use crate::math::probability_correct;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CurriculumLevel {
    Elementary,
    Middle,
    High,
    BeyondHigh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeState {
    NotKnown,
    Emerging,
    Developing,
    Comfortable,
    Mastered,
}

fn knowledge_state_for(probability: f64) -> KnowledgeState {
    if probability < 0.25 {
        KnowledgeState::NotKnown
    } else if probability < 0.5 {
        KnowledgeState::Emerging
    } else if probability < 0.7 {
        KnowledgeState::Developing
    } else if probability < 0.85 {
        KnowledgeState::Comfortable
    } else {
        KnowledgeState::Mastered
    }
}

/// The five CEFR bins and their centers.
const CEFR_BINS: [(CefrBand, f64, f64); 5] = [
    (CefrBand::A1, -3.0, -1.5),
    (CefrBand::A2, -1.5, -0.5),
    (CefrBand::B1, -0.5, 0.5),
    (CefrBand::B2, 0.5, 1.5),
    (CefrBand::C1, 1.5, 3.0),
];

fn bin_center(low: f64, high: f64) -> f64 {
    (low + high) / 2.0
}

pub fn cefr_band_for_theta(theta: f64) -> CefrBand {
    for &(band, low, high) in CEFR_BINS.iter() {
        if theta < high || band == CefrBand::C1 {
            if theta >= low || band == CefrBand::A1 {
                return band;
            }
        }
    }
    CefrBand::C1
}

/// Softmax over `-|θ̂ - band_center| / SE`, normalized across the five bands.
pub fn cefr_probability_vector(theta: f64, se: f64) -> HashMap<CefrBand, f64> {
    let se = se.max(1e-6);
    let scores: Vec<(CefrBand, f64)> = CEFR_BINS
        .iter()
        .map(|&(band, low, high)| {
            let center = bin_center(low, high);
            (band, -(theta - center).abs() / se)
        })
        .collect();
    let max_score = scores
        .iter()
        .map(|&(_, s)| s)
        .fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<(CefrBand, f64)> = scores
        .into_iter()
        .map(|(band, s)| (band, (s - max_score).exp()))
        .collect();
    let total: f64 = exps.iter().map(|&(_, e)| e).sum();
    exps.into_iter().map(|(band, e)| (band, e / total)).collect()
}

pub fn curriculum_level_for_theta(theta: f64) -> CurriculumLevel {
    if theta < -0.8 {
        CurriculumLevel::Elementary
    } else if theta < 0.3 {
        CurriculumLevel::Middle
    } else if theta < 1.2 {
        CurriculumLevel::High
    } else {
        CurriculumLevel::BeyondHigh
    }
}

/// Σ over all bank items of P(correct | θ̂), 2PL only (`c` ignored), rounded.
pub fn estimated_vocabulary_size(theta: f64, bank: &ItemBank) -> u32 {
    let sum: f64 = bank
        .all_items()
        .map(|item| probability_correct(theta, IrtParams { c: 0.0, ..item.irt }))
        .sum();
    sum.round().max(0.0) as u32
}

/// `correct/total*100` per dimension when `total >= 3`, else `None`.
pub fn dimension_scores(session: &CatSession) -> HashMap<Dimension, Option<f64>> {
    Dimension::ALL
        .iter()
        .map(|&dim| {
            let score = session.counters.dimension_counts.get(&dim).and_then(
                |&(correct, total)| {
                    if total >= 3 {
                        Some(correct as f64 / total as f64 * 100.0)
                    } else {
                        None
                    }
                },
            );
            (dim, score)
        })
        .collect()
}

/// Top-5 rates >= 0.75 as strengths, bottom-5 rates <= 0.50 as weaknesses,
/// among topics with total >= 3.
pub fn topic_strengths_and_weaknesses(
    session: &CatSession,
) -> (Vec<(String, f64)>, Vec<(String, f64)>) {
    let mut rates: Vec<(String, f64)> = session
        .counters
        .topic_stats
        .iter()
        .filter(|&(_, &(_, total))| total >= 3)
        .map(|(topic, &(correct, total))| (topic.clone(), correct as f64 / total as f64))
        .collect();

    rates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    let strengths: Vec<(String, f64)> = rates
        .iter()
        .filter(|&&(_, rate)| rate >= 0.75)
        .take(5)
        .cloned()
        .collect();

    rates.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    let weaknesses: Vec<(String, f64)> = rates
        .iter()
        .filter(|&&(_, rate)| rate <= 0.50)
        .take(5)
        .cloned()
        .collect();

    (strengths, weaknesses)
}

/// P(correct | θ̂) averaged over items whose CEFR is in {A1, A2, B1}.
pub fn oxford_core_coverage(theta: f64, bank: &ItemBank) -> f64 {
    let core: Vec<f64> = bank
        .all_items()
        .filter(|item| matches!(item.cefr, CefrBand::A1 | CefrBand::A2 | CefrBand::B1))
        .map(|item| probability_correct(theta, item.irt))
        .collect();
    if core.is_empty() {
        return 0.0;
    }
    core.iter().sum::<f64>() / core.len() as f64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StudyPriority {
    High,
    Medium,
    Review,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudyRecommendation {
    pub dimension: Dimension,
    pub priority: StudyPriority,
    pub exercise_item_ids: Vec<i64>,
}

fn priority_for_score(score: Option<f64>) -> Option<StudyPriority> {
    match score {
        None => Some(StudyPriority::High),
        Some(s) if s < 40.0 => Some(StudyPriority::High),
        Some(s) if s < 60.0 => Some(StudyPriority::Medium),
        Some(s) if s < 75.0 => Some(StudyPriority::Review),
        Some(_) => None,
    }
}

/// For each dimension scoring below the review band (or unscored), 3-5
/// exercises near θ̂+0.2.
pub fn study_plan(theta: f64, bank: &ItemBank, scores: &HashMap<Dimension, Option<f64>>) -> Vec<StudyRecommendation> {
    let target = theta + 0.2;
    Dimension::ALL
        .iter()
        .filter_map(|&dim| {
            let priority = priority_for_score(*scores.get(&dim)?)?;
            let mut candidates: Vec<(i64, f64)> = bank
                .all_items()
                .filter(|item| {
                    QuestionType::ALL
                        .iter()
                        .any(|&qt| qt.dimension() == dim && item.supports(qt))
                })
                .map(|item| (item.id, (item.irt.b - target).abs()))
                .collect();
            candidates.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
            let exercise_item_ids: Vec<i64> =
                candidates.into_iter().take(5).map(|(id, _)| id).collect();
            if exercise_item_ids.len() < 3 {
                return None;
            }
            Some(StudyRecommendation {
                dimension: dim,
                priority,
                exercise_item_ids,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct KnowledgeMatrixEntry {
    pub item_id: i64,
    pub current_probability: f64,
    pub projected_probability: f64,
    pub current_state: KnowledgeState,
    pub projected_state: KnowledgeState,
}

/// A uniform sample of the bank with current/projected P and knowledge state
///. Deterministic given the session's selection seed.
pub fn knowledge_matrix(
    session: &CatSession,
    bank: &ItemBank,
    sample_size: usize,
) -> Vec<KnowledgeMatrixEntry> {
    use rand::prelude::*;
    use rand::rngs::StdRng;

    let theta_hat = session.posterior.theta_hat();
    let current_band = cefr_band_for_theta(theta_hat);
    let goal_band = current_band.next().unwrap_or(current_band);
    let (low, high) = CEFR_BINS
        .iter()
        .find(|&&(band, _, _)| band == goal_band)
        .map(|&(_, low, high)| (low, high))
        .unwrap_or((theta_hat, theta_hat));
    let theta_goal = bin_center(low, high);

    let mut ids: Vec<i64> = bank.all_items().map(|item| item.id).collect();
    let mut rng = StdRng::seed_from_u64(session.selection_seed);
    ids.shuffle(&mut rng);
    ids.truncate(sample_size);
    ids.sort_unstable();

    ids.into_iter()
        .filter_map(|id| bank.get(id))
        .map(|item| {
            let current = probability_correct(theta_hat, item.irt);
            let projected = probability_correct(theta_goal, item.irt);
            KnowledgeMatrixEntry {
                item_id: item.id,
                current_probability: current,
                projected_probability: projected,
                current_state: knowledge_state_for(current),
                projected_state: knowledge_state_for(projected),
            }
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub theta_hat: f64,
    pub se: f64,
    pub reliability: f64,
    pub cefr: CefrBand,
    pub cefr_probabilities: HashMap<CefrBand, f64>,
    pub curriculum_level: CurriculumLevel,
    pub estimated_vocabulary_size: u32,
    pub dimension_scores: HashMap<Dimension, Option<f64>>,
    pub topic_strengths: Vec<(String, f64)>,
    pub topic_weaknesses: Vec<(String, f64)>,
    pub oxford_core_coverage: f64,
    pub study_plan: Vec<StudyRecommendation>,
    pub knowledge_matrix: Vec<KnowledgeMatrixEntry>,
    pub insufficient_data: bool,
}

pub fn build_report(session: &CatSession, bank: &ItemBank, knowledge_matrix_sample_size: usize) -> Report {
    let theta_hat = session.posterior.theta_hat();
    let se = session.posterior.standard_error();
    let scores = dimension_scores(session);
    let (strengths, weaknesses) = topic_strengths_and_weaknesses(session);
    let insufficient_data = session.items_administered() < 5;

    Report {
        theta_hat,
        se,
        reliability: session.posterior.reliability(),
        cefr: cefr_band_for_theta(theta_hat),
        cefr_probabilities: cefr_probability_vector(theta_hat, se),
        curriculum_level: curriculum_level_for_theta(theta_hat),
        estimated_vocabulary_size: estimated_vocabulary_size(theta_hat, bank),
        study_plan: study_plan(theta_hat, bank, &scores),
        dimension_scores: scores,
        topic_strengths: strengths,
        topic_weaknesses: weaknesses,
        oxford_core_coverage: oxford_core_coverage(theta_hat, bank),
        knowledge_matrix: knowledge_matrix(session, bank, knowledge_matrix_sample_size),
        insufficient_data,
    }
}
