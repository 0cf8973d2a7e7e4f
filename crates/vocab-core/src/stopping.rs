//! Termination rules, evaluated after each response.

use crate::config::StoppingConfig;
use crate::domain::{CatSession, TerminationReason};

/// `None` means "keep going"; never fires before `min_items` except on pool
/// exhaustion, which the caller signals separately via `pool_exhausted`.
pub fn evaluate(session: &CatSession, config: &StoppingConfig) -> Option<TerminationReason> {
    let administered = session.items_administered();
    let se = session.posterior.standard_error();

    if administered >= config.max_items {
        return Some(TerminationReason::MaxItems);
    }
    if administered < config.min_items {
        return None;
    }
    if administered >= config.se_threshold_min_items && se < config.se_threshold {
        return Some(TerminationReason::SeThreshold);
    }
    if administered >= config.convergence_min_items {
        let deltas = session.recent_theta_deltas(config.convergence_window);
        if deltas.len() == config.convergence_window
            && deltas.iter().all(|delta| delta.abs() < config.convergence_delta)
        {
            return Some(TerminationReason::Convergence);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ExamExperience, Grade, LearnerProfile, SelfAssessment};
    use chrono::Utc;

    fn session_with(administered: u32, theta_history: Vec<f64>) -> CatSession {
        let profile = LearnerProfile {
            grade: Grade::Middle,
            self_assessment: SelfAssessment::Intermediate,
            exam_experience: ExamExperience::None,
            preferred_question_type: None,
        };
        let mut session = CatSession::new("s".into(), "u".into(), profile, 1, Utc::now());
        session.administered = (1..=administered as i64).collect();
        session.theta_history = theta_history;
        session
    }

    #[test]
    fn never_terminates_before_min_items() {
        let session = session_with(5, vec![]);
        assert_eq!(evaluate(&session, &StoppingConfig::default()), None);
    }

    #[test]
    fn terminates_at_hard_cap_regardless_of_se() {
        let session = session_with(40, vec![]);
        assert_eq!(
            evaluate(&session, &StoppingConfig::default()),
            Some(TerminationReason::MaxItems)
        );
    }

    #[test]
    fn terminates_on_convergence_when_last_five_deltas_are_small() {
        let mut session = session_with(20, vec![]);
        session.theta_history = vec![0.5, 0.51, 0.52, 0.515, 0.518, 0.52];
        assert_eq!(
            evaluate(&session, &StoppingConfig::default()),
            Some(TerminationReason::Convergence)
        );
    }

    #[test]
    fn does_not_converge_with_fewer_than_the_convergence_window_of_history() {
        let mut session = session_with(20, vec![]);
        session.theta_history = vec![0.5, 0.51];
        assert_eq!(evaluate(&session, &StoppingConfig::default()), None);
    }
}
