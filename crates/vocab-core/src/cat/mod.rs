pub mod reporter;
pub mod session;

pub use reporter::{build_report, CurriculumLevel, KnowledgeState, Report, StudyPriority};
pub use session::{CatSessionService, RespondOutcome, StartOutcome};
