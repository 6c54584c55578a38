use std::path::PathBuf;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::FmtSubscriber;

mod config;
mod dataset;
mod db;
mod error;
mod features;
mod kmeans;
mod model;
mod models;
mod profiles;
mod recommend;
mod report;
mod scaler;
mod service;
mod stats;
mod store;

use config::Config;
use db::PgStore;
use model::ModelRegistry;
use models::NewStudyLog;
use service::Recommender;
use store::{MemoryStore, StudyStore};

#[derive(Parser)]
#[command(name = "study-habits")]
#[command(about = "Study session logging and cluster-based study recommendations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load demo students with a few sessions each
    Seed,
    /// Register a student
    Register {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
    },
    /// Record a study session and refresh the student's cluster
    Log {
        #[arg(long)]
        student: String,
        #[arg(long)]
        hours: f64,
        /// Session date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long, default_value = "")]
        subject: String,
        /// Morning, Afternoon, Evening or Night
        #[arg(long, default_value = "")]
        time_of_day: String,
        #[arg(long, default_value = "")]
        method: String,
        /// None, Low, Medium or High
        #[arg(long, default_value = "None")]
        distractions: String,
        #[arg(long)]
        quiz_score: Option<i32>,
    },
    /// Print a student's recommendation as JSON
    Recommend {
        #[arg(long)]
        student: String,
        /// Seed the weekly schedule for reproducible output
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Print a student's session statistics as JSON
    Stats {
        #[arg(long)]
        student: String,
    },
    /// Refit the scaler and clustering model
    Retrain {
        /// Replace the reference dataset with this CSV before training
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Validate a CSV and install it as the reference dataset
    ImportDataset {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Write a synthetic reference dataset
    GenerateDataset {
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long, default_value_t = dataset::SYNTHETIC_SAMPLES)]
        samples: usize,
        #[arg(long, default_value_t = dataset::SYNTHETIC_SEED)]
        seed: u64,
    },
    /// Print the cluster profile table and reference dataset size as JSON
    Profiles,
    /// Run the demo students through an in-memory store and print their recommendations
    Demo {
        #[arg(long, default_value_t = 7)]
        seed: u64,
    },
    /// Generate a markdown analytics report
    Report {
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

async fn connect(config: &Config) -> anyhow::Result<PgStore> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(config.database_url()?)
        .await
        .context("failed to connect to Postgres")?;
    Ok(PgStore::new(pool))
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to install tracing subscriber")?;

    let registry = ModelRegistry::new(config.model_dir.clone(), config.dataset_path.clone());

    match cli.command {
        Commands::InitDb => {
            let store = connect(&config).await?;
            db::init_db(store.pool()).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let mut service = Recommender::new(connect(&config).await?, registry);
            let mut inserted = 0usize;
            for (student_id, name, logs) in db::seed_data(today()) {
                service.register_student(student_id, name).await?;
                if !service.store().logs_for_student(student_id).await?.is_empty() {
                    continue;
                }
                for log in logs {
                    service.record_log(log).await?;
                    inserted += 1;
                }
            }
            println!("Seed data inserted ({inserted} sessions).");
        }
        Commands::Register { id, name } => {
            let service = Recommender::new(connect(&config).await?, registry);
            let student = service.register_student(&id, &name).await?;
            println!("{}", serde_json::to_string_pretty(&student)?);
        }
        Commands::Log {
            student,
            hours,
            date,
            subject,
            time_of_day,
            method,
            distractions,
            quiz_score,
        } => {
            let mut service = Recommender::new(connect(&config).await?, registry);
            let receipt = service
                .record_log(NewStudyLog {
                    student_id: student,
                    date: date.unwrap_or_else(today),
                    study_hours: hours,
                    subject,
                    time_of_day,
                    method,
                    distraction_level: distractions,
                    quiz_score,
                })
                .await?;
            println!("{}", serde_json::to_string_pretty(&receipt)?);
        }
        Commands::Recommend { student, seed } => {
            let store = connect(&config).await?;
            let mut service = match seed {
                Some(seed) => Recommender::with_seed(store, registry, seed),
                None => Recommender::new(store, registry),
            };
            let recommendation = service.get_recommendation(&student).await?;
            println!("{}", serde_json::to_string_pretty(&recommendation)?);
        }
        Commands::Stats { student } => {
            let service = Recommender::new(connect(&config).await?, registry);
            let stats = service.student_stats(&student, today()).await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::Retrain { csv } => {
            let mut registry = registry;
            let outcome = registry.retrain(csv.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Commands::ImportDataset { csv } => {
            let rows = dataset::import(&csv, registry.dataset_path())?;
            println!(
                "Imported {rows} rows from {} into {}.",
                csv.display(),
                registry.dataset_path().display()
            );
        }
        Commands::GenerateDataset { out, samples, seed } => {
            let out = out.unwrap_or_else(|| registry.dataset_path().to_path_buf());
            let records = dataset::synthesize(seed, samples);
            dataset::write(&out, &records)?;
            println!("Wrote {} rows to {}.", records.len(), out.display());
        }
        Commands::Profiles => {
            let samples = match dataset::load(registry.dataset_path()) {
                Ok(records) => Some(records.len()),
                Err(err) => {
                    tracing::debug!(error = %err, "no usable reference dataset");
                    None
                }
            };
            println!("{}", serde_json::to_string_pretty(&profiles::insights(samples))?);
        }
        Commands::Demo { seed } => {
            let mut service = Recommender::with_seed(MemoryStore::new(), registry, seed);
            for (student_id, name, logs) in db::seed_data(today()) {
                service.register_student(student_id, name).await?;
                for log in logs {
                    service.record_log(log).await?;
                }
                let recommendation = service.get_recommendation(student_id).await?;
                println!("{name}:");
                println!("{}", serde_json::to_string_pretty(&recommendation)?);
            }
        }
        Commands::Report { out } => {
            let service = Recommender::new(connect(&config).await?, registry);
            let analytics = service.analytics().await?;
            let logs = service.store().all_logs().await?;
            let report = report::build_report(today(), &analytics, &logs);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
