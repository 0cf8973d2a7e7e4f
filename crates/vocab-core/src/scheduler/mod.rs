pub mod distributions;
pub mod goal_session;
pub mod sm2;

pub use distributions::sample_question_type;
pub use goal_session::{next_card, new_learning_session, GoalSessionService, NextCard};
pub use sm2::apply_rating;
