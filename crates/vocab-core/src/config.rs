//! Typed configuration for the engine's tunable thresholds.
//!
//! Every constant named in the component design lives here as a field with a
//! `Default` matching that description, rather than as a scattered literal.

use std::time::Duration;

/// Configuration for the exposure-gated, information-ranked selector.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SelectorConfig {
    /// Maximum exposure rate before an item is dropped from candidates.
    pub max_exposure_rate: f64,
    /// Amount the gate relaxes by on a single retry when it empties the set.
    pub exposure_relaxation_step: f64,
    /// Width of the randomized top-K window in the information ranking stage.
    pub top_k: usize,
    /// Max sessions's running count for a single topic before it is dropped.
    pub max_per_topic: u32,
    /// Allowed deviation (percentage points, as a fraction) from the target POS ratio.
    pub pos_ratio_tolerance: f64,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            max_exposure_rate: 0.25,
            exposure_relaxation_step: 0.10,
            top_k: 5,
            max_per_topic: 3,
            pos_ratio_tolerance: 0.10,
        }
    }
}

/// Configuration for the stopping engine's termination rules.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StoppingConfig {
    pub min_items: u32,
    pub max_items: u32,
    pub se_threshold: f64,
    pub se_threshold_min_items: u32,
    pub convergence_min_items: u32,
    pub convergence_window: usize,
    pub convergence_delta: f64,
}

impl Default for StoppingConfig {
    fn default() -> Self {
        Self {
            min_items: 15,
            max_items: 40,
            se_threshold: 0.30,
            se_threshold_min_items: 15,
            convergence_min_items: 20,
            convergence_window: 5,
            convergence_delta: 0.05,
        }
    }
}

/// Configuration for the session registry and its TTL sweeper.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionManagerConfig {
    pub session_ttl: Duration,
    pub sweep_interval: Duration,
}

impl Default for SessionManagerConfig {
    fn default() -> Self {
        Self {
            session_ttl: Duration::from_secs(2 * 3600),
            sweep_interval: Duration::from_secs(5 * 60),
        }
    }
}

/// Configuration for the offline calibration job.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationConfig {
    pub calibration_threshold: u32,
    pub max_delta_b: f64,
    pub max_delta_a: f64,
    /// Total archived sessions at which 3PL `c` estimation would become eligible.
    /// No estimator is specified for it (see DESIGN.md); this only gates a flag.
    pub three_pl_activation_sessions: u64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            calibration_threshold: 200,
            max_delta_b: 0.5,
            max_delta_a: 0.3,
            three_pl_activation_sessions: 5000,
        }
    }
}

/// Top-level configuration bag threaded through the services that need it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub selector: SelectorConfig,
    pub stopping: StoppingConfig,
    pub session_manager: SessionManagerConfig,
    pub calibration: CalibrationConfig,
    pub knowledge_matrix_sample_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            selector: SelectorConfig::default(),
            stopping: StoppingConfig::default(),
            session_manager: SessionManagerConfig::default(),
            calibration: CalibrationConfig::default(),
            knowledge_matrix_sample_size: 150,
        }
    }
}
