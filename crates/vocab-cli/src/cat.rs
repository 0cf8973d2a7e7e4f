//! Interactive CAT diagnostic session, driven entirely in-process: read a
//! question from stdout, read the learner's choice from stdin, repeat until
//! the engine terminates the session and hands back a report.

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::ValueEnum;

use vocab_core::domain::{ExamExperience, Grade, LearnerProfile, RenderedItem, SelfAssessment};
use vocab_core::{CatSessionService, EngineConfig, ExposureController, RespondOutcome};
use vocab_storage::{SqlitePersistencePort, SqliteBankLoader};

use crate::bank_seed;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum GradeArg {
    Elementary,
    Middle,
    High,
}

impl From<GradeArg> for Grade {
    fn from(value: GradeArg) -> Self {
        match value {
            GradeArg::Elementary => Grade::Elementary,
            GradeArg::Middle => Grade::Middle,
            GradeArg::High => Grade::High,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SelfAssessmentArg {
    Beginner,
    Intermediate,
    Advanced,
}

impl From<SelfAssessmentArg> for SelfAssessment {
    fn from(value: SelfAssessmentArg) -> Self {
        match value {
            SelfAssessmentArg::Beginner => SelfAssessment::Beginner,
            SelfAssessmentArg::Intermediate => SelfAssessment::Intermediate,
            SelfAssessmentArg::Advanced => SelfAssessment::Advanced,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ExamExperienceArg {
    None,
    Csat,
}

impl From<ExamExperienceArg> for ExamExperience {
    fn from(value: ExamExperienceArg) -> Self {
        match value {
            ExamExperienceArg::None => ExamExperience::None,
            ExamExperienceArg::Csat => ExamExperience::Csat,
        }
    }
}

fn print_question(ordinal: usize, rendered: &RenderedItem) {
    println!();
    println!("[{ordinal}] {}", rendered.stem);
    for (i, option) in rendered.options.iter().enumerate() {
        println!("  {}) {}", i + 1, option);
    }
}

fn read_choice(max: usize) -> Result<usize> {
    loop {
        print!("your answer (1-{max}, or 0 for don't know): ");
        io::stdout().flush().ok();
        let mut line = String::new();
        io::stdin().read_line(&mut line).context("reading from stdin")?;
        match line.trim().parse::<usize>() {
            Ok(choice) if choice <= max => return Ok(choice),
            _ => println!("enter a number between 0 and {max}"),
        }
    }
}

pub async fn run(
    db_path: String,
    learner_id: String,
    grade: GradeArg,
    self_assessment: SelfAssessmentArg,
    exam_experience: ExamExperienceArg,
    seed: u64,
) -> Result<()> {
    let pool = vocab_storage::init_db(&db_path).await?;
    let loader = SqliteBankLoader::new(pool.clone());
    let bank = bank_seed::load_or_seed(&loader).await?;

    let persistence = Arc::new(SqlitePersistencePort::new(pool));
    let exposure = Arc::new(ExposureController::new());
    let service = CatSessionService::new(exposure, persistence, EngineConfig::default());

    let profile = LearnerProfile {
        grade: grade.into(),
        self_assessment: self_assessment.into(),
        exam_experience: exam_experience.into(),
        preferred_question_type: None,
    };
    let session_id = format!("cat-{}-{}", learner_id, Utc::now().timestamp());

    let start = service
        .start_session(session_id.clone(), learner_id, profile, seed, &bank)
        .await?;

    println!("started session {session_id}");
    let mut rendered = start.rendered;
    let mut ordinal = 1usize;

    loop {
        print_question(ordinal, &rendered);
        let clock = Instant::now();
        let choice = read_choice(rendered.options.len())?;
        let response_time_ms = clock.elapsed().as_millis().min(u32::MAX as u128) as u32;
        let is_dont_know = choice == 0;
        let is_correct = !is_dont_know && rendered.options[choice - 1] == rendered.correct_answer;
        let item_id = rendered.item_id;

        match service
            .submit_response(&session_id, item_id, is_correct, is_dont_know, response_time_ms, &bank)
            .await?
        {
            RespondOutcome::Continue { rendered: next } => {
                rendered = next;
                ordinal += 1;
            }
            RespondOutcome::Terminated { report } => {
                println!();
                println!("session terminated after {ordinal} items");
                println!("{}", serde_json::to_string_pretty(&serde_json::json!({
                    "theta_hat": report.theta_hat,
                    "se": report.se,
                    "reliability": report.reliability,
                    "cefr": format!("{:?}", report.cefr),
                    "curriculum_level": format!("{:?}", report.curriculum_level),
                    "estimated_vocabulary_size": report.estimated_vocabulary_size,
                    "oxford_core_coverage": report.oxford_core_coverage,
                    "insufficient_data": report.insufficient_data,
                }))?);
                break;
            }
        }
    }

    Ok(())
}
