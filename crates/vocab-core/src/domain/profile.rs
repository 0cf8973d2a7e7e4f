use serde::{Deserialize, Serialize};

use super::item::{CurriculumBand, QuestionType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
    Elementary,
    Middle,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelfAssessment {
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExamExperience {
    None,
    Csat,
}

/// A learner's declared profile at `/test/start` time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnerProfile {
    pub grade: Grade,
    pub self_assessment: SelfAssessment,
    pub exam_experience: ExamExperience,
    pub preferred_question_type: Option<QuestionType>,
}

impl LearnerProfile {
    /// Initial θ bias from grade + self-assessment, mapped into {-1.0, 0.0, +1.0}.
    /// A higher grade or more confident self-assessment biases upward;
    /// they're combined by simple addition and clamped to the three buckets.
    pub fn initial_theta_bias(&self) -> f64 {
        let grade_score: i32 = match self.grade {
            Grade::Elementary => -1,
            Grade::Middle => 0,
            Grade::High => 1,
        };
        let assessment_score: i32 = match self.self_assessment {
            SelfAssessment::Beginner => -1,
            SelfAssessment::Intermediate => 0,
            SelfAssessment::Advanced => 1,
        };
        let exam_score: i32 = match self.exam_experience {
            ExamExperience::None => 0,
            ExamExperience::Csat => 1,
        };
        let total = grade_score + assessment_score + exam_score;
        if total <= -1 {
            -1.0
        } else if total >= 2 {
            1.0
        } else {
            0.0
        }
    }
}

/// A learning-goal selector, distinct from `Grade` because CSAT targets exist
/// independently of school grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    Elementary,
    Middle,
    High,
    Csat,
}

impl Goal {
    pub fn curriculum_band(self) -> CurriculumBand {
        match self {
            Goal::Elementary => CurriculumBand::Elementary,
            Goal::Middle => CurriculumBand::Middle,
            Goal::High => CurriculumBand::High,
            Goal::Csat => CurriculumBand::Csat,
        }
    }
}
