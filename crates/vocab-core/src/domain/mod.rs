pub mod item;
pub mod learning;
pub mod profile;
pub mod session;

pub use item::{
    CefrBand, CurriculumBand, Dimension, IrtParams, Item, ItemRelations, PartOfSpeech,
    QuestionType, RenderedItem,
};
pub use learning::{AssessmentEvent, LearnedWord, LearningSession, LearningStage};
pub use profile::{ExamExperience, Goal, Grade, LearnerProfile, SelfAssessment};
pub use session::{CatSession, ContentCounters, Response, SessionState, TerminationReason};
