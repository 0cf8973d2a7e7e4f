//! Offline item calibration: a Bayesian MAP update of `a` and `b` from
//! accumulated responses, guarded by delta bounds, publishing a new bank
//! version by swap-and-publish rather than mutating items in place.

use std::collections::HashMap;

use crate::bank::ItemBank;
use crate::config::CalibrationConfig;
use crate::domain::{IrtParams, Item};
use crate::math::probability_correct;

/// One item's accumulated evidence: the learner's θ̂ at the time of each
/// response (not the current θ̂, since that could post-date the response by
/// many items) and whether the answer was scored correct.
#[derive(Debug, Clone, Default)]
pub struct CalibrationEvidence {
    pub observations: Vec<(f64, bool)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationOutcome {
    /// Fewer than `calibration_threshold` responses; left untouched.
    InsufficientData,
    /// The MAP update landed within guard bounds and was applied.
    Updated { params: IrtParams },
    /// The MAP update exceeded a guard bound; prior parameters were kept.
    RejectedAnomalous { attempted: IrtParams },
}

fn clamp_p(p: f64) -> f64 {
    p.clamp(1e-9, 1.0 - 1e-9)
}

/// log p(a, b | observations) up to an additive constant: Gaussian prior
/// centered on the current parameters plus the 3PL log-likelihood (`c` held
/// fixed — no estimator for it is defined, per the item bank's resolved
/// open question).
fn log_posterior(a: f64, b: f64, c: f64, prior: IrtParams, observations: &[(f64, bool)]) -> f64 {
    const SIGMA_A: f64 = 0.2;
    const SIGMA_B: f64 = 0.3;
    let prior_term = -0.5 * ((a - prior.a) / SIGMA_A).powi(2) - 0.5 * ((b - prior.b) / SIGMA_B).powi(2);
    let likelihood_term: f64 = observations
        .iter()
        .map(|&(theta, correct)| {
            let p = clamp_p(probability_correct(theta, IrtParams { a, b, c }));
            if correct {
                p.ln()
            } else {
                (1.0 - p).ln()
            }
        })
        .sum();
    prior_term + likelihood_term
}

/// A coarse grid search, since the update only needs to be "simple",
/// not a full Newton-Raphson solve. The search window is wider than the
/// guard bounds it's checked against afterward (`SEARCH_MARGIN`) — if it
/// were clamped to the guard window itself, a MAP estimate that genuinely
/// wants to move further than the guard allows could never be observed, and
/// the guard would never actually reject anything.
const GRID_STEPS: i32 = 20;
const SEARCH_MARGIN: f64 = 2.0;

fn map_update(prior: IrtParams, observations: &[(f64, bool)], config: &CalibrationConfig) -> IrtParams {
    let mut best = prior;
    let mut best_score = f64::NEG_INFINITY;

    let search_a = config.max_delta_a * SEARCH_MARGIN;
    let search_b = config.max_delta_b * SEARCH_MARGIN;
    for i in -GRID_STEPS..=GRID_STEPS {
        let delta_a = search_a * i as f64 / GRID_STEPS as f64;
        for j in -GRID_STEPS..=GRID_STEPS {
            let delta_b = search_b * j as f64 / GRID_STEPS as f64;
            let candidate = IrtParams::clamped(prior.a + delta_a, prior.b + delta_b, prior.c);
            let score = log_posterior(candidate.a, candidate.b, candidate.c, prior, observations);
            if score > best_score {
                best_score = score;
                best = candidate;
            }
        }
    }
    best
}

/// Runs the MAP update for a single item if it has enough evidence, rejecting
/// the result if it falls outside the guard bounds.
pub fn calibrate_item(
    prior: IrtParams,
    evidence: &CalibrationEvidence,
    config: &CalibrationConfig,
) -> CalibrationOutcome {
    if evidence.observations.len() < config.calibration_threshold as usize {
        return CalibrationOutcome::InsufficientData;
    }

    let attempted = map_update(prior, &evidence.observations, config);
    let delta_a = (attempted.a - prior.a).abs();
    let delta_b = (attempted.b - prior.b).abs();
    if delta_a <= config.max_delta_a && delta_b <= config.max_delta_b {
        CalibrationOutcome::Updated { params: attempted }
    } else {
        CalibrationOutcome::RejectedAnomalous { attempted }
    }
}

#[derive(Debug, Clone)]
pub struct CalibrationReport {
    pub updated_item_ids: Vec<i64>,
    pub rejected_item_ids: Vec<i64>,
    /// Whether the process-wide session count has crossed the 3PL activation
    /// threshold. No `c` estimator is defined yet, so this only flags
    /// eligibility for a future calibration pass, it never changes `c` itself.
    pub three_pl_eligible: bool,
}

/// Applies calibration across every item with evidence, swapping in a freshly
/// built `ItemBank` so readers never observe a partially-updated version.
pub fn calibrate_bank(
    bank: &ItemBank,
    evidence_by_item: &HashMap<i64, CalibrationEvidence>,
    config: &CalibrationConfig,
    total_archived_sessions: u64,
) -> (ItemBank, CalibrationReport) {
    let mut updated_item_ids = Vec::new();
    let mut rejected_item_ids = Vec::new();

    let items: Vec<Item> = bank
        .all_items()
        .map(|item| {
            let mut item = item.clone();
            if let Some(evidence) = evidence_by_item.get(&item.id) {
                match calibrate_item(item.irt, evidence, config) {
                    CalibrationOutcome::Updated { params } => {
                        item.irt = params;
                        updated_item_ids.push(item.id);
                    }
                    CalibrationOutcome::RejectedAnomalous { .. } => {
                        rejected_item_ids.push(item.id);
                    }
                    CalibrationOutcome::InsufficientData => {}
                }
            }
            item
        })
        .collect();

    let report = CalibrationReport {
        updated_item_ids,
        rejected_item_ids,
        three_pl_eligible: total_archived_sessions >= config.three_pl_activation_sessions,
    };
    (ItemBank::new(items), report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::test_support::sample_bank;

    fn evidence_favoring_higher_difficulty(n: usize) -> CalibrationEvidence {
        // Learners well above the item's current b consistently answer
        // incorrectly: the only way the likelihood explains that is a harder
        // item than currently modeled, so the MAP update should pull b up.
        CalibrationEvidence {
            observations: (0..n).map(|i| (1.5 + (i % 3) as f64 * 0.1, false)).collect(),
        }
    }

    /// Evidence spanning a spread of thetas, labeled by majority vote against
    /// a known target item. Unlike evidence concentrated at one theta far in
    /// the tail, this identifies a clean MAP peak near `target`, so the
    /// update is a measured correction rather than an unbounded swing.
    fn evidence_near_target_difficulty(target: IrtParams, n: usize) -> CalibrationEvidence {
        let thetas = [-2.0, -1.5, -1.0, -0.5, 0.0, 0.5, 1.0, 1.5, 2.0];
        CalibrationEvidence {
            observations: (0..n)
                .map(|i| {
                    let theta = thetas[i % thetas.len()];
                    let correct = probability_correct(theta, target) >= 0.5;
                    (theta, correct)
                })
                .collect(),
        }
    }

    #[test]
    fn below_threshold_evidence_is_left_untouched() {
        let config = CalibrationConfig {
            calibration_threshold: 200,
            ..CalibrationConfig::default()
        };
        let evidence = evidence_favoring_higher_difficulty(10);
        let outcome = calibrate_item(IrtParams { a: 1.0, b: -1.0, c: 0.2 }, &evidence, &config);
        assert_eq!(outcome, CalibrationOutcome::InsufficientData);
    }

    #[test]
    fn sufficient_evidence_moves_b_toward_observed_difficulty() {
        let config = CalibrationConfig {
            calibration_threshold: 50,
            ..CalibrationConfig::default()
        };
        let prior = IrtParams { a: 1.0, b: -1.0, c: 0.2 };
        let target = IrtParams { a: 1.0, b: -0.8, c: 0.2 };
        let evidence = evidence_near_target_difficulty(target, 200);
        match calibrate_item(prior, &evidence, &config) {
            CalibrationOutcome::Updated { params } => {
                assert!(params.b > prior.b);
                assert!(params.b <= prior.b + config.max_delta_b);
            }
            other => panic!("expected an update, got {other:?}"),
        }
    }

    #[test]
    fn an_update_outside_guard_bounds_is_rejected() {
        let config = CalibrationConfig {
            calibration_threshold: 50,
            max_delta_b: 0.01,
            max_delta_a: 0.01,
            ..CalibrationConfig::default()
        };
        let evidence = evidence_favoring_higher_difficulty(200);
        let prior = IrtParams { a: 1.0, b: -3.5, c: 0.2 };
        match calibrate_item(prior, &evidence, &config) {
            CalibrationOutcome::RejectedAnomalous { .. } => {}
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn calibrate_bank_swaps_in_a_new_bank_leaving_unevidenced_items_untouched() {
        let bank = sample_bank();
        let item_one = bank.get(1).unwrap();
        let target = IrtParams {
            a: item_one.irt.a,
            b: item_one.irt.b + 0.2,
            c: item_one.irt.c,
        };
        let mut evidence_by_item = HashMap::new();
        evidence_by_item.insert(1, evidence_near_target_difficulty(target, 200));
        let config = CalibrationConfig {
            calibration_threshold: 50,
            ..CalibrationConfig::default()
        };
        let (new_bank, report) = calibrate_bank(&bank, &evidence_by_item, &config, 100);
        assert_eq!(report.updated_item_ids, vec![1]);
        assert!(!report.three_pl_eligible);
        assert_eq!(new_bank.get(2).unwrap().irt.b, bank.get(2).unwrap().irt.b);
        assert_ne!(new_bank.get(1).unwrap().irt.b, bank.get(1).unwrap().irt.b);
    }
}
