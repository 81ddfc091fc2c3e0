use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

mod batch;
mod classifier;
mod config;
mod export;
mod models;
mod normalize;
mod report;
mod risk;
mod session;

use models::{DietaryHabits, Gender, RawSubmission, SleepBucket, YesNo};
use risk::ClassifierHandle;

#[derive(Parser)]
#[command(name = "mindscan")]
#[command(about = "Student depression risk screening", long_about = None)]
struct Cli {
    /// Config file [default: ./mindscan.toml]
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Classifier artifact, overrides the config and MINDSCAN_MODEL
    #[arg(long, global = true)]
    model: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report whether the classifier loaded
    Status,
    /// Assess one student
    Predict {
        #[command(flatten)]
        form: FormArgs,
        /// Use the built-in sample values instead of the form fields
        #[arg(long)]
        demo: bool,
        /// Write the features and probability as CSV
        #[arg(long = "export")]
        export_path: Option<PathBuf>,
        /// Write the markdown report here instead of stdout
        #[arg(long = "report")]
        report_path: Option<PathBuf>,
    },
    /// Assess every row of a submissions CSV
    Batch {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, default_value = "predictions.csv")]
        out: PathBuf,
    },
    /// Show a single-prediction export written by `predict --export`
    Inspect {
        #[arg(long)]
        csv: PathBuf,
    },
}

#[derive(Args, Debug)]
struct FormArgs {
    #[arg(long, default_value_t = 0)]
    student_id: u64,
    #[arg(long)]
    name: Option<String>,
    /// Male, Female or Other
    #[arg(long, default_value = "Male")]
    gender: String,
    #[arg(long, default_value_t = 20, value_parser = clap::value_parser!(u32).range(15..=60))]
    age: u32,
    #[arg(long, default_value = "")]
    city: String,
    #[arg(long, default_value = "Student")]
    profession: String,
    #[arg(long, default_value = "B.Tech")]
    degree: String,
    #[arg(long, default_value_t = 7.5, value_parser = parse_cgpa)]
    cgpa: f64,
    /// Work/study hours per week
    #[arg(long, default_value_t = 20, value_parser = clap::value_parser!(u32).range(0..=168))]
    study_hours: u32,
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(0..=5))]
    academic_pressure: u8,
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(0..=5))]
    study_satisfaction: u8,
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u8).range(0..=5))]
    job_satisfaction: u8,
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(0..=5))]
    work_pressure: u8,
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u8).range(1..=5))]
    financial_stress: u8,
    /// <5h, 5-6h, 7-8h or 9h+
    #[arg(long, default_value = "<5h")]
    sleep_duration: String,
    /// Healthy or Unhealthy
    #[arg(long, default_value = "Healthy")]
    dietary_habits: String,
    /// Ever had suicidal thoughts? Yes or No
    #[arg(long, default_value = "No")]
    suicidal_thoughts: String,
    /// Family history of mental illness? Yes or No
    #[arg(long, default_value = "No")]
    family_history: String,
}

fn parse_cgpa(value: &str) -> Result<f64, String> {
    let cgpa: f64 = value.parse().map_err(|_| format!("{value:?} is not a number"))?;
    if (0.0..=10.0).contains(&cgpa) {
        Ok(cgpa)
    } else {
        Err(format!("CGPA must be between 0 and 10, got {cgpa}"))
    }
}

impl From<FormArgs> for RawSubmission {
    fn from(form: FormArgs) -> Self {
        RawSubmission {
            student_id: form.student_id,
            name: form.name,
            gender: Gender::from_label(&form.gender),
            age: form.age,
            city: form.city,
            profession: form.profession,
            degree: form.degree,
            cgpa: form.cgpa,
            study_hours: form.study_hours,
            academic_pressure: form.academic_pressure,
            study_satisfaction: form.study_satisfaction,
            job_satisfaction: form.job_satisfaction,
            work_pressure: form.work_pressure,
            financial_stress: form.financial_stress,
            sleep_duration: SleepBucket::from_label(&form.sleep_duration),
            dietary_habits: DietaryHabits::from_label(&form.dietary_habits),
            suicidal_thoughts: YesNo::from_label(&form.suicidal_thoughts),
            family_history: YesNo::from_label(&form.family_history),
        }
    }
}

fn resolve_model_path(cli_model: Option<PathBuf>, configured: &Path) -> PathBuf {
    cli_model
        .or_else(|| std::env::var_os(config::MODEL_ENV).map(PathBuf::from))
        .unwrap_or_else(|| configured.to_path_buf())
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let cwd = std::env::current_dir().context("failed to resolve working directory")?;
    let config = config::load_config(&cwd, cli.config.as_deref())?;
    let tiers = config.tiers.table()?;

    let model_path = resolve_model_path(cli.model, &config.model_path);
    let classifier = classifier::load_classifier(&model_path);

    match cli.command {
        Commands::Status => {
            println!("Model status: {}", classifier.status_label());
            println!("Model path: {}", model_path.display());
            if let ClassifierHandle::Unavailable { reason } = &classifier {
                println!("Reason: {reason}");
            }
            println!("Feature schema: v{}", normalize::SCHEMA_VERSION);
            println!("Risk tiers:");
            for band in tiers.bands() {
                println!("- from {:.0}%: {}", band.lower * 100.0, band.tier);
            }
        }
        Commands::Predict {
            form,
            demo,
            export_path,
            report_path,
        } => {
            let submission = if demo {
                RawSubmission {
                    name: form.name.clone(),
                    ..RawSubmission::demo()
                }
            } else {
                RawSubmission::from(form)
            };
            let name = submission.name.clone();
            let features = normalize::normalize(&submission);

            let mut session = session::Session::new();
            let outcome = session
                .submit_features(submission, features.clone(), &classifier, &tiers)
                .map(|last| last.assessment.clone());
            if let Some(last) = session.last() {
                log::info!(
                    "session {} (started {}) holds student {} assessed at {}",
                    session.id,
                    session.started_at,
                    last.submission.student_id,
                    last.assessed_at
                );
            }

            let text = report::build_report(
                classifier.status_label(),
                name.as_deref(),
                &features,
                &outcome,
            );
            match &report_path {
                Some(path) => {
                    std::fs::write(path, &text)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("Report written to {}.", path.display());
                }
                None => print!("{text}"),
            }

            if let Some(path) = export_path {
                if session.export_last_to(&path)? {
                    println!("Export written to {}.", path.display());
                }
            }

            outcome?;
        }
        Commands::Batch { csv, out } => {
            let submissions = batch::read_submissions(&csv)?;
            let outcome = batch::run_batch(&submissions, &classifier, &tiers);

            for (student_id, err) in &outcome.failures {
                eprintln!("- student {student_id}: {err}");
            }

            let file = File::create(&out)
                .with_context(|| format!("failed to create {}", out.display()))?;
            export::write_export_rows(
                BufWriter::new(file),
                outcome
                    .assessed
                    .iter()
                    .map(|(features, assessment)| (features, assessment.probability)),
            )?;

            let assessments: Vec<_> = outcome
                .assessed
                .iter()
                .map(|(_, assessment)| assessment.clone())
                .collect();
            print!(
                "{}",
                report::build_batch_report(&assessments, outcome.failures.len())
            );
            println!("Predictions written to {}.", out.display());
        }
        Commands::Inspect { csv } => {
            let file = File::open(&csv)
                .with_context(|| format!("failed to open {}", csv.display()))?;
            let (features, probability) = export::parse_export(file)?;
            let tier = tiers.tier_for(probability);

            print!("{}", report::build_snapshot(&features));
            println!();
            println!("{} — {:.2}%", tier.headline(), probability * 100.0);
            println!("Risk tier: {} ({})", tier, tier.color());
        }
    }

    Ok(())
}
