//! Property-style checks for the quantified invariants: posterior
//! normalization and bounds, session administered-item uniqueness and
//! termination bounds, exposure-rate caps, and SM-2 learned-word invariants.
//! Hand-picked example cases live in each module's own unit tests; this file
//! generates sequences proptest can shrink to a minimal failing case.

use std::collections::HashSet;

use chrono::Utc;
use proptest::prelude::*;

use vocab_core::config::{SelectorConfig, StoppingConfig};
use vocab_core::domain::{
    CatSession, ExamExperience, Grade, IrtParams, LearnerProfile, SelfAssessment, TerminationReason,
};
use vocab_core::exposure::ExposureController;
use vocab_core::math::Posterior;
use vocab_core::scheduler::apply_rating;
use vocab_core::selector::{select_next_item, SelectorOutcome};
use vocab_core::simulation::synthetic_bank;
use vocab_core::stopping;
use vocab_core::{domain::LearnedWord, domain::Response};

fn irt_strategy() -> impl Strategy<Value = IrtParams> {
    (0.3f64..3.0, -4.0f64..4.0, 0.0f64..0.4).prop_map(|(a, b, c)| IrtParams::clamped(a, b, c))
}

proptest! {
    /// After any sequence of responses the EAP posterior stays normalized and
    /// its mean never leaves the quadrature grid it's defined over.
    #[test]
    fn posterior_stays_normalized_and_bounded(
        updates in proptest::collection::vec((irt_strategy(), any::<bool>()), 0..50),
    ) {
        let mut posterior = Posterior::with_prior_mean(0.0);
        for (irt, correct) in updates {
            posterior.update(irt, correct);
            prop_assert!(posterior.theta_hat().abs() <= 4.0);
            prop_assert!(posterior.standard_error() > 0.0);
            prop_assert!((posterior.integral() - 1.0).abs() < 1e-6);
        }
    }

    /// A full CAT session never administers the same item twice and, absent
    /// pool exhaustion, terminates with an item count inside the configured
    /// hard bounds.
    #[test]
    fn session_never_repeats_an_item_and_respects_termination_bounds(theta_true in -4.0f64..4.0) {
        let bank = synthetic_bank(120);
        let exposure = ExposureController::new();
        let selector_config = SelectorConfig::default();
        let stopping_config = StoppingConfig::default();

        let profile = LearnerProfile {
            grade: Grade::Middle,
            self_assessment: SelfAssessment::Intermediate,
            exam_experience: ExamExperience::None,
            preferred_question_type: None,
        };
        let mut session = CatSession::new("prop-session".into(), "prop-learner".into(), profile, 11, Utc::now());
        exposure.record_session_started();

        loop {
            let outcome = select_next_item(&session, &bank, &exposure, &selector_config);
            let (item_id, question_type) = match outcome {
                SelectorOutcome::Selected { item_id, question_type } => (item_id, question_type),
                SelectorOutcome::NoEligibleItem => {
                    session.termination_reason = Some(TerminationReason::PoolExhausted);
                    break;
                }
            };

            prop_assert!(!session.administered.contains(&item_id));

            let item = bank.get(item_id).unwrap();
            let irt = IrtParams {
                a: item.irt.a,
                b: item.effective_b(question_type),
                c: item.irt.c,
            };
            let correct = vocab_core::math::probability_correct(theta_true, irt) >= 0.5;
            session.posterior.update(irt, correct);
            session.theta_history.push(session.posterior.theta_hat());
            session.administered.push(item_id);
            session.counters.record(&item.topic, item.pos, question_type.dimension(), correct);
            session.responses.push(Response {
                item_id,
                is_correct: correct,
                is_dont_know: false,
                response_time_ms: 1000,
                question_type,
                rendered_options: vec![],
                timestamp: Utc::now(),
                theta_after: session.posterior.theta_hat(),
                se_after: session.posterior.standard_error(),
                sequence_idx: session.administered.len() as u32 - 1,
            });
            exposure.record_administered(item_id, Utc::now());

            if let Some(reason) = stopping::evaluate(&session, &stopping_config) {
                session.termination_reason = Some(reason);
                break;
            }
        }

        let administered: HashSet<i64> = session.administered.iter().copied().collect();
        prop_assert_eq!(administered.len(), session.administered.len());

        if session.termination_reason != Some(TerminationReason::PoolExhausted) {
            prop_assert!(session.items_administered() >= stopping_config.min_items);
            prop_assert!(session.items_administered() <= stopping_config.max_items);
        }
    }

    /// Any sequence of self-ratings applied to a learned word keeps the SM-2
    /// invariants: ease factor never drops below the floor, correct_count
    /// never exceeds review_count, and mastery implies all three conditions.
    #[test]
    fn sm2_updates_keep_learned_word_invariants(ratings in proptest::collection::vec(0u8..4, 0..30)) {
        let mut word = LearnedWord::new(1, Utc::now());
        for rating in ratings {
            let is_correct = rating >= 2;
            apply_rating(&mut word, rating, is_correct, Utc::now());

            prop_assert!(word.ease_factor >= 1.3);
            prop_assert!(word.correct_count <= word.review_count);
            if word.is_mastered {
                prop_assert!(word.review_count >= 5);
                prop_assert!(word.accuracy() >= 0.80);
                prop_assert!(word.interval_days >= 7);
            }
        }
    }
}

/// Exposure rate across many sessions never exceeds the configured cap by
/// more than the single relaxation step the selector allows.
#[test]
fn exposure_rate_never_exceeds_the_cap_plus_one_relaxation() {
    let bank = synthetic_bank(60);
    let exposure = ExposureController::new();
    let selector_config = SelectorConfig::default();
    let stopping_config = StoppingConfig {
        max_items: 15,
        ..StoppingConfig::default()
    };

    for i in 0..300u64 {
        let profile = LearnerProfile {
            grade: Grade::Middle,
            self_assessment: SelfAssessment::Intermediate,
            exam_experience: ExamExperience::None,
            preferred_question_type: None,
        };
        let mut session = CatSession::new(format!("s{i}"), format!("l{i}"), profile, i, Utc::now());
        exposure.record_session_started();

        loop {
            let outcome = select_next_item(&session, &bank, &exposure, &selector_config);
            let (item_id, question_type) = match outcome {
                SelectorOutcome::Selected { item_id, question_type } => (item_id, question_type),
                SelectorOutcome::NoEligibleItem => break,
            };
            let item = bank.get(item_id).unwrap();
            let irt = IrtParams {
                a: item.irt.a,
                b: item.effective_b(question_type),
                c: item.irt.c,
            };
            session.posterior.update(irt, true);
            session.administered.push(item_id);
            exposure.record_administered(item_id, Utc::now());
            if stopping::evaluate(&session, &stopping_config).is_some() {
                break;
            }
        }
    }

    for item in bank.all_items() {
        assert!(
            exposure.exposure_rate(item.id) <= selector_config.max_exposure_rate + selector_config.exposure_relaxation_step,
            "item {} exceeded the exposure cap: {}",
            item.id,
            exposure.exposure_rate(item.id)
        );
    }
}
