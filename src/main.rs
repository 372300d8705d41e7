mod answers;
mod apply;
mod config;
mod db;
mod form;
mod models;
mod records;
mod search;
mod session;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::answers::{AnswerBank, AnswerEngine};
use crate::config::Config;
use crate::db::History;
use crate::session::Bot;

#[derive(Parser)]
#[command(name = "autoapply")]
#[command(about = "Easy Apply automation - search listings, answer forms, submit applications")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and apply to every matching listing
    Run {
        /// Path to the YAML config file
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,
    },

    /// Inspect the question/answer bank
    Answers {
        #[command(subcommand)]
        command: AnswerCommands,
    },

    /// Show previously processed jobs
    History {
        /// Number of rows to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}

#[derive(Subcommand)]
enum AnswerCommands {
    /// List every stored answer, placeholder rows included
    List {
        /// Path to the YAML config file
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging()?;

    match cli.command {
        Commands::Run { config } => run(&config).await?,

        Commands::Answers { command } => match command {
            AnswerCommands::List { config } => list_answers(&config)?,
        },

        Commands::History { limit } => show_history(limit)?,
    }

    Ok(())
}

/// Console plus a timestamped plain-text file under logs/. Called once at
/// startup; nothing configures logging as a side effect of anything else.
fn init_logging() -> Result<()> {
    std::fs::create_dir_all("logs").context("Failed to create the logs directory")?;
    let stamp = chrono::Local::now().format("%m_%d_%y %H_%M_%S");
    let path = format!("logs/{} applyJobs.log", stamp);
    let file = std::fs::File::create(&path)
        .with_context(|| format!("Failed to create log file {}", path))?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_target(false))
        .with(fmt::layer().with_ansi(false).with_writer(Arc::new(file)))
        .init();
    Ok(())
}

async fn run(config_path: &Path) -> Result<()> {
    // All validation happens before the browser session opens.
    let config = Config::load(config_path)?;
    config.validate()?;

    info!("Welcome to the Easy Apply bot");
    info!("Current directory is {}", std::env::current_dir()?.display());
    if config.experience_levels.is_empty() {
        info!("Applying for all experience levels");
    } else {
        info!(
            "Applying for experience level roles: {}",
            config.experience_level_names().join(", ")
        );
    }

    let history = History::open()?;
    info!("History database at {}", history.path().display());

    let bank = AnswerBank::load(&config.answer_bank_file);
    let engine = AnswerEngine::new(bank, config.profile.clone());

    let mut bot = Bot::connect(config, engine, history).await?;
    bot.login().await?;
    bot.run().await?;
    bot.close().await?;
    Ok(())
}

fn list_answers(config_path: &Path) -> Result<()> {
    let config = Config::load(config_path)?;
    let bank = AnswerBank::load(&config.answer_bank_file);
    if bank.is_empty() {
        println!("No stored answers yet.");
        return Ok(());
    }
    println!("{:<60} {:<30}", "QUESTION", "ANSWER");
    println!("{}", "-".repeat(90));
    for (question, answer) in bank.sorted_entries() {
        println!("{:<60} {:<30}", truncate(question, 58), truncate(answer, 28));
    }
    println!("\n{} answer(s)", bank.len());
    Ok(())
}

fn show_history(limit: usize) -> Result<()> {
    let history = History::open()?;
    let rows = history.recent(limit)?;
    if rows.is_empty() {
        println!("No jobs processed yet.");
        return Ok(());
    }
    println!(
        "{:<12} {:<10} {:<30} {:<20} {:<20}",
        "JOB ID", "SUBMITTED", "TITLE", "COMPANY", "WHEN"
    );
    println!("{}", "-".repeat(96));
    for row in rows {
        println!(
            "{:<12} {:<10} {:<30} {:<20} {:<20}",
            row.job_id,
            if row.submitted { "yes" } else { "no" },
            truncate(&row.title.unwrap_or_default(), 28),
            truncate(&row.company.unwrap_or_default(), 18),
            row.applied_at
        );
    }
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        format!("{}...", &s[..max.saturating_sub(3)])
    }
}
