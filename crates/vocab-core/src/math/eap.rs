//! Expected a-posteriori ability estimation on a fixed quadrature grid.
//!
//! EAP is the primary estimator because it stays finite under all-correct or
//! all-wrong response patterns, which MLE does not.

use serde::{Deserialize, Serialize};

use crate::domain::IrtParams;

use super::irt::probability_correct;

pub const GRID_POINTS: usize = 41;
pub const GRID_MIN: f64 = -4.0;
pub const GRID_MAX: f64 = 4.0;

fn grid() -> [f64; GRID_POINTS] {
    let step = (GRID_MAX - GRID_MIN) / (GRID_POINTS as f64 - 1.0);
    let mut points = [0.0; GRID_POINTS];
    for (j, slot) in points.iter_mut().enumerate() {
        *slot = GRID_MIN + j as f64 * step;
    }
    points
}

fn delta_theta() -> f64 {
    (GRID_MAX - GRID_MIN) / (GRID_POINTS as f64 - 1.0)
}

fn standard_normal_density(x: f64, mean: f64) -> f64 {
    let z = x - mean;
    (-0.5 * z * z).exp() / (2.0 * std::f64::consts::PI).sqrt()
}

/// Discrete posterior g(θ_j) over the 41-point grid, plus the normalized N(0,1)
/// prior mass at session start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Posterior {
    mass: Vec<f64>,
}

impl Posterior {
    /// Starts from an N(mean, 1) prior, so a nonzero initial θ bias is
    /// expressed as a shifted — not re-scaled — prior.
    pub fn with_prior_mean(mean: f64) -> Self {
        let points = grid();
        let mut mass: Vec<f64> = points
            .iter()
            .map(|&theta| standard_normal_density(theta, mean))
            .collect();
        normalize(&mut mass);
        Self { mass }
    }

    pub fn grid_points() -> [f64; GRID_POINTS] {
        grid()
    }

    /// g(θ_j) ← g(θ_j) · P_k(θ_j)^y · (1-P_k(θ_j))^(1-y); renormalize.
    pub fn update(&mut self, item_params: IrtParams, correct: bool) {
        let points = grid();
        for (j, &theta) in points.iter().enumerate() {
            let p = probability_correct(theta, item_params);
            let likelihood = if correct { p } else { 1.0 - p };
            self.mass[j] *= likelihood;
        }
        normalize(&mut self.mass);
    }

    /// θ̂ = Σ θ_j g(θ_j) Δθ.
    pub fn theta_hat(&self) -> f64 {
        let points = grid();
        let dtheta = delta_theta();
        points
            .iter()
            .zip(self.mass.iter())
            .map(|(&theta, &g)| theta * g * dtheta)
            .sum()
    }

    /// SE = sqrt(Σ (θ_j - θ̂)² g(θ_j) Δθ).
    pub fn standard_error(&self) -> f64 {
        let theta_hat = self.theta_hat();
        let points = grid();
        let dtheta = delta_theta();
        let variance: f64 = points
            .iter()
            .zip(self.mass.iter())
            .map(|(&theta, &g)| (theta - theta_hat).powi(2) * g * dtheta)
            .sum();
        variance.max(0.0).sqrt()
    }

    /// Reliability = 1 - SE², floored at 0.
    pub fn reliability(&self) -> f64 {
        let se = self.standard_error();
        (1.0 - se * se).max(0.0)
    }

    /// Σ g(θ_j) Δθ; should be 1 ± 1e-9 after every update.
    pub fn integral(&self) -> f64 {
        self.mass.iter().sum::<f64>() * delta_theta()
    }
}

fn normalize(mass: &mut [f64]) {
    let dtheta = delta_theta();
    let total: f64 = mass.iter().sum::<f64>() * dtheta;
    if total <= 0.0 {
        // Numerically collapsed posterior (e.g. an item whose guard-clamped
        // parameters made every likelihood underflow to 0): fall back to a
        // flat density rather than propagate NaN/Inf through θ̂.
        let uniform = 1.0 / (mass.len() as f64 * dtheta);
        mass.fill(uniform);
        return;
    }
    for g in mass.iter_mut() {
        *g /= total;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_has_forty_one_points_spanning_minus_four_to_four() {
        let points = grid();
        assert_eq!(points.len(), 41);
        assert!((points[0] - (-4.0)).abs() < 1e-9);
        assert!((points[40] - 4.0).abs() < 1e-9);
    }

    #[test]
    fn fresh_posterior_integrates_to_one() {
        let posterior = Posterior::with_prior_mean(0.0);
        assert!((posterior.integral() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn fresh_zero_mean_posterior_has_theta_hat_near_zero() {
        let posterior = Posterior::with_prior_mean(0.0);
        assert!(posterior.theta_hat().abs() < 1e-6);
    }

    #[test]
    fn biased_prior_shifts_initial_theta_hat_toward_the_bias() {
        let posterior = Posterior::with_prior_mean(1.0);
        assert!(posterior.theta_hat() > 0.3);
    }

    #[test]
    fn repeated_correct_answers_shift_theta_hat_upward() {
        let mut posterior = Posterior::with_prior_mean(0.0);
        let params = IrtParams::clamped(1.2, 0.0, 0.0);
        let before = posterior.theta_hat();
        for _ in 0..5 {
            posterior.update(params, true);
        }
        assert!(posterior.theta_hat() > before);
        assert!((posterior.integral() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn repeated_incorrect_answers_shift_theta_hat_downward_and_stay_finite() {
        let mut posterior = Posterior::with_prior_mean(0.0);
        let params = IrtParams::clamped(1.2, 0.0, 0.0);
        for _ in 0..30 {
            posterior.update(params, false);
        }
        let theta_hat = posterior.theta_hat();
        assert!(theta_hat.is_finite());
        assert!(theta_hat < -1.0);
        assert!(theta_hat >= -4.0);
    }

    #[test]
    fn standard_error_shrinks_as_responses_accumulate() {
        let mut posterior = Posterior::with_prior_mean(0.0);
        let params = IrtParams::clamped(1.2, 0.0, 0.0);
        let se_before = posterior.standard_error();
        for i in 0..10 {
            posterior.update(params, i % 2 == 0);
        }
        assert!(posterior.standard_error() < se_before);
    }

    #[test]
    fn reliability_is_one_minus_se_squared_and_floored_at_zero() {
        let posterior = Posterior::with_prior_mean(0.0);
        let expected = (1.0 - posterior.standard_error().powi(2)).max(0.0);
        assert!((posterior.reliability() - expected).abs() < 1e-12);
        assert!(posterior.reliability() >= 0.0);
    }
}
