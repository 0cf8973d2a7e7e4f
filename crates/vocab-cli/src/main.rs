use anyhow::Result;
use clap::{Parser, Subcommand};

mod bank_seed;
mod cat;
mod learn;
mod simulate;

/// vocab-cli - development and validation tool for the vocabulary diagnostic engine
#[derive(Parser)]
#[command(name = "vocab-cli")]
#[command(about = "Run adaptive vocabulary diagnostic and learning sessions locally", long_about = None)]
struct Cli {
    /// Path to the sqlite database (created if it does not exist)
    #[arg(long, global = true, default_value = "vocab.db")]
    db: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an interactive CAT diagnostic session for one learner
    Cat {
        /// Learner id
        #[arg(long)]
        learner_id: String,
        #[arg(long, value_enum, default_value = "middle")]
        grade: cat::GradeArg,
        #[arg(long, value_enum, default_value = "intermediate")]
        self_assessment: cat::SelfAssessmentArg,
        #[arg(long, value_enum, default_value = "none")]
        exam_experience: cat::ExamExperienceArg,
        /// Seed for deterministic item rendering/selection tie-breaks
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Run an interactive learning-goal session for one learner
    Learn {
        #[arg(long)]
        learner_id: String,
        #[arg(long, value_enum, default_value = "middle")]
        goal: learn::GoalArg,
        /// Number of words to study before the session is considered complete
        #[arg(long, default_value_t = 20)]
        target_word_count: u32,
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Validate the estimator's recovery accuracy against simulated learners
    Simulate {
        /// Number of simulated learners
        #[arg(long, default_value_t = 10_000)]
        n_learners: usize,
        /// Size of the synthetic item bank to simulate against
        #[arg(long, default_value_t = 600)]
        n_items: usize,
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(false).compact().init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Cat {
            learner_id,
            grade,
            self_assessment,
            exam_experience,
            seed,
        } => {
            cat::run(cli.db, learner_id, grade, self_assessment, exam_experience, seed).await?;
        }
        Commands::Learn {
            learner_id,
            goal,
            target_word_count,
            seed,
        } => {
            learn::run(cli.db, learner_id, goal, target_word_count, seed).await?;
        }
        Commands::Simulate { n_learners, n_items, seed } => {
            simulate::run(n_learners, n_items, seed).await?;
        }
    }

    Ok(())
}
