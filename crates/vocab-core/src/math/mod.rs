pub mod eap;
pub mod irt;

pub use eap::Posterior;
pub use irt::{fisher_information, log_likelihood, probability_correct};
