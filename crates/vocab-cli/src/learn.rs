//! Interactive learning-goal session: presents the next due/unstudied word,
//! reads a self-rating, and runs until the target word count is reached or
//! the pool is exhausted.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::ValueEnum;

use vocab_core::domain::Goal;
use vocab_core::GoalSessionService;
use vocab_storage::{SqliteBankLoader, SqlitePersistencePort};

use crate::bank_seed;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum GoalArg {
    Elementary,
    Middle,
    High,
    Csat,
}

impl From<GoalArg> for Goal {
    fn from(value: GoalArg) -> Self {
        match value {
            GoalArg::Elementary => Goal::Elementary,
            GoalArg::Middle => Goal::Middle,
            GoalArg::High => Goal::High,
            GoalArg::Csat => Goal::Csat,
        }
    }
}

fn read_rating() -> Result<u8> {
    loop {
        print!("self-rating (0=forgot, 1=hard, 2=good, 3=easy): ");
        io::stdout().flush().ok();
        let mut line = String::new();
        io::stdin().read_line(&mut line).context("reading from stdin")?;
        match line.trim().parse::<u8>() {
            Ok(rating) if rating <= 3 => return Ok(rating),
            _ => println!("enter a number between 0 and 3"),
        }
    }
}

pub async fn run(db_path: String, learner_id: String, goal: GoalArg, target_word_count: u32, seed: u64) -> Result<()> {
    let pool = vocab_storage::init_db(&db_path).await?;
    let loader = SqliteBankLoader::new(pool.clone());
    let bank = bank_seed::load_or_seed(&loader).await?;

    let persistence = Arc::new(SqlitePersistencePort::new(pool));
    let service = GoalSessionService::new(persistence);

    let session_id = format!("goal-{}-{}", learner_id, Utc::now().timestamp());
    let (mut session, mut card) = service
        .start(session_id.clone(), learner_id, goal.into(), target_word_count, seed, &bank)
        .await?;

    println!("started learning session {session_id} (goal pool curriculum: {:?})", Goal::from(goal).curriculum_band());

    while let Some(next_card) = card {
        let word = bank
            .get(next_card.word_id)
            .context("card referenced a word not present in the bank")?;
        println!();
        println!("word: {}  ({:?}, {:?})", word.lemma, word.pos, next_card.question_type);
        if let Some(meaning) = word.attributes.get("korean_meaning") {
            println!("meaning: {meaning}");
        }

        let rating = read_rating()?;
        let is_correct = rating >= 2;
        let (updated, next) = service
            .submit(&session_id, next_card.word_id, rating, is_correct, &bank)
            .await?;
        session = updated;
        card = next;

        println!(
            "progress: {}/{} mastered, {:.1}% complete",
            session.words_mastered,
            session.target_word_count,
            session.completion_percentage()
        );

        if session.words_studied >= session.target_word_count && session.words_mastered >= session.target_word_count {
            break;
        }
    }

    println!();
    println!("learning session finished: {} words studied, {} mastered", session.words_studied, session.words_mastered);
    Ok(())
}
