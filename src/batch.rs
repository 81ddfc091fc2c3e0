use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::models::{
    DietaryHabits, FeatureRecord, Gender, RawSubmission, RiskAssessment, SleepBucket, YesNo,
};
use crate::normalize::normalize;
use crate::risk::{assess, AssessError, ClassifierHandle, TierTable};

/// One submission per CSV row, categorical answers as the form labels them.
#[derive(Debug, Deserialize)]
struct CsvRow {
    student_id: u64,
    name: Option<String>,
    gender: String,
    age: u32,
    city: String,
    profession: String,
    degree: String,
    cgpa: f64,
    study_hours: u32,
    academic_pressure: u8,
    study_satisfaction: u8,
    job_satisfaction: u8,
    work_pressure: u8,
    financial_stress: u8,
    sleep_duration: String,
    dietary_habits: String,
    suicidal_thoughts: String,
    family_history: String,
}

impl From<CsvRow> for RawSubmission {
    fn from(row: CsvRow) -> Self {
        RawSubmission {
            student_id: row.student_id,
            name: row.name.filter(|name| !name.trim().is_empty()),
            gender: Gender::from_label(&row.gender),
            age: row.age,
            city: row.city,
            profession: row.profession,
            degree: row.degree,
            cgpa: row.cgpa,
            study_hours: row.study_hours,
            academic_pressure: row.academic_pressure,
            study_satisfaction: row.study_satisfaction,
            job_satisfaction: row.job_satisfaction,
            work_pressure: row.work_pressure,
            financial_stress: row.financial_stress,
            sleep_duration: SleepBucket::from_label(&row.sleep_duration),
            dietary_habits: DietaryHabits::from_label(&row.dietary_habits),
            suicidal_thoughts: YesNo::from_label(&row.suicidal_thoughts),
            family_history: YesNo::from_label(&row.family_history),
        }
    }
}

pub fn read_submissions(csv_path: &Path) -> anyhow::Result<Vec<RawSubmission>> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut submissions = Vec::new();

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.with_context(|| format!("row {} is malformed", index + 1))?;
        submissions.push(row.into());
    }

    Ok(submissions)
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub assessed: Vec<(FeatureRecord, RiskAssessment)>,
    pub failures: Vec<(u64, AssessError)>,
}

/// Assess every submission independently; a failed row does not stop the rest.
pub fn run_batch(
    submissions: &[RawSubmission],
    classifier: &ClassifierHandle,
    tiers: &TierTable,
) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();

    for submission in submissions {
        let features = normalize(submission);
        match assess(&features, classifier, tiers) {
            Ok(assessment) => outcome.assessed.push((features, assessment)),
            Err(err) => outcome.failures.push((submission.student_id, err)),
        }
    }

    outcome
}
