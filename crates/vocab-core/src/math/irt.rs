//! IRT 2PL/3PL probability, Fisher information, and log-likelihood.

use crate::domain::IrtParams;

/// Logistic function, computed with a sign branch so the exponent never
/// overflows for large |x|.
fn logistic(x: f64) -> f64 {
    if x >= 0.0 {
        let z = (-x).exp();
        1.0 / (1.0 + z)
    } else {
        let z = x.exp();
        z / (1.0 + z)
    }
}

/// P(correct | θ) = c + (1 - c) * σ(a * (θ - b)).
pub fn probability_correct(theta: f64, params: IrtParams) -> f64 {
    let p = IrtParams::clamped(params.a, params.b, params.c);
    let exponent = p.a * (theta - p.b);
    p.c + (1.0 - p.c) * logistic(exponent)
}

/// I(θ; a, b, c) = a² (P - c)² (1 - P) / ((1 - c)² P). For 2PL (c=0) this is
/// a² P (1 - P). Undefined at P=0 is treated as 0.
pub fn fisher_information(theta: f64, params: IrtParams) -> f64 {
    let p = IrtParams::clamped(params.a, params.b, params.c);
    let prob = probability_correct(theta, p);
    if prob <= 0.0 {
        return 0.0;
    }
    if p.c == 0.0 {
        return p.a * p.a * prob * (1.0 - prob);
    }
    let numerator = p.a * p.a * (prob - p.c).powi(2) * (1.0 - prob);
    let denominator = (1.0 - p.c).powi(2) * prob;
    numerator / denominator
}

/// Σ y·log P + (1-y)·log(1-P) over a response pattern, using `ln_1p` on the
/// complement so precision doesn't collapse near P≈0 or P≈1.
pub fn log_likelihood(theta: f64, responses: &[(IrtParams, bool)]) -> f64 {
    responses
        .iter()
        .map(|&(params, correct)| {
            let p = probability_correct(theta, params).clamp(1e-12, 1.0 - 1e-12);
            if correct {
                p.ln()
            } else {
                (-p).ln_1p()
            }
        })
        .sum()
}
