pub mod bank;
pub mod calibration;
pub mod cat;
pub mod config;
pub mod domain;
pub mod error;
pub mod exposure;
pub mod math;
pub mod ports;
pub mod scheduler;
pub mod selector;
pub mod session_manager;
pub mod simulation;
pub mod stopping;

pub use bank::{initialize_params, ItemBank, ItemFilter, RawItemMetadata};
pub use cat::{build_report, CatSessionService, CurriculumLevel, KnowledgeState, Report, RespondOutcome, StartOutcome};
pub use config::EngineConfig;
pub use error::{EngineError, EngineResult, ErrorKind};
pub use exposure::ExposureController;
pub use scheduler::GoalSessionService;
pub use session_manager::SessionManager;
pub use simulation::{draw_true_thetas, simulate_learner, summarize, synthetic_bank, SimulationSummary};
