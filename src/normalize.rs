//! Raw form values to classifier features.
//!
//! Column order and encodings are fixed by whatever trained the classifier.
//! Changing either means bumping `SCHEMA_VERSION` and retraining.

use crate::models::{FeatureRecord, RawSubmission, SleepBucket};

pub const SCHEMA_VERSION: u32 = 1;

pub const FEATURE_COLUMNS: [&str; 17] = [
    "id",
    "Gender",
    "Age",
    "City",
    "Profession",
    "Academic Pressure",
    "Work Pressure",
    "CGPA",
    "Study Satisfaction",
    "Job Satisfaction",
    "Sleep Duration",
    "Dietary Habits",
    "Degree",
    "Have you ever had suicidal thoughts ?",
    "Work/Study Hours",
    "Financial Stress",
    "Family History of Mental Illness",
];

/// Free-text columns; every other column is numeric.
pub const TEXT_COLUMNS: [&str; 3] = ["City", "Profession", "Degree"];

pub const DEFAULT_SLEEP_HOURS: f64 = 7.5;

pub fn sleep_hours(bucket: &SleepBucket) -> f64 {
    match bucket {
        SleepBucket::UnderFive => 4.0,
        SleepBucket::FiveToSix => 5.5,
        SleepBucket::SevenToEight => 7.5,
        SleepBucket::NineOrMore => 9.0,
        SleepBucket::Unrecognized(label) => {
            log::warn!(
                "unrecognized sleep duration {label:?}, using {DEFAULT_SLEEP_HOURS}h"
            );
            DEFAULT_SLEEP_HOURS
        }
    }
}

pub fn normalize(raw: &RawSubmission) -> FeatureRecord {
    FeatureRecord {
        id: raw.student_id,
        gender: raw.gender.code(),
        age: raw.age,
        city: raw.city.clone(),
        profession: raw.profession.clone(),
        academic_pressure: raw.academic_pressure,
        work_pressure: raw.work_pressure,
        cgpa: raw.cgpa,
        study_satisfaction: raw.study_satisfaction,
        job_satisfaction: raw.job_satisfaction,
        sleep_duration: sleep_hours(&raw.sleep_duration),
        dietary_habits: raw.dietary_habits.code(),
        degree: raw.degree.clone(),
        suicidal_thoughts: raw.suicidal_thoughts.code(),
        study_hours: raw.study_hours,
        financial_stress: raw.financial_stress,
        family_history: raw.family_history.code(),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FieldError {
    #[error("expected {expected} fields, got {actual}")]
    WrongFieldCount { expected: usize, actual: usize },
    #[error("column {column:?}: cannot parse {value:?}")]
    BadValue { column: &'static str, value: String },
}

fn parse_field<T: std::str::FromStr>(
    fields: &[&str],
    index: usize,
) -> Result<T, FieldError> {
    let value = fields[index].trim();
    value.parse().map_err(|_| FieldError::BadValue {
        column: FEATURE_COLUMNS[index],
        value: value.to_string(),
    })
}

impl FeatureRecord {
    /// Values as text, in `FEATURE_COLUMNS` order.
    pub fn to_fields(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.gender.to_string(),
            self.age.to_string(),
            self.city.clone(),
            self.profession.clone(),
            self.academic_pressure.to_string(),
            self.work_pressure.to_string(),
            self.cgpa.to_string(),
            self.study_satisfaction.to_string(),
            self.job_satisfaction.to_string(),
            self.sleep_duration.to_string(),
            self.dietary_habits.to_string(),
            self.degree.clone(),
            self.suicidal_thoughts.to_string(),
            self.study_hours.to_string(),
            self.financial_stress.to_string(),
            self.family_history.to_string(),
        ]
    }

    pub fn from_fields(fields: &[&str]) -> Result<Self, FieldError> {
        if fields.len() != FEATURE_COLUMNS.len() {
            return Err(FieldError::WrongFieldCount {
                expected: FEATURE_COLUMNS.len(),
                actual: fields.len(),
            });
        }

        Ok(FeatureRecord {
            id: parse_field(fields, 0)?,
            gender: parse_field(fields, 1)?,
            age: parse_field(fields, 2)?,
            city: fields[3].to_string(),
            profession: fields[4].to_string(),
            academic_pressure: parse_field(fields, 5)?,
            work_pressure: parse_field(fields, 6)?,
            cgpa: parse_field(fields, 7)?,
            study_satisfaction: parse_field(fields, 8)?,
            job_satisfaction: parse_field(fields, 9)?,
            sleep_duration: parse_field(fields, 10)?,
            dietary_habits: parse_field(fields, 11)?,
            degree: fields[12].to_string(),
            suicidal_thoughts: parse_field(fields, 13)?,
            study_hours: parse_field(fields, 14)?,
            financial_stress: parse_field(fields, 15)?,
            family_history: parse_field(fields, 16)?,
        })
    }

    /// Numeric value of a column, `None` for text columns and unknown names.
    pub fn numeric(&self, column: &str) -> Option<f64> {
        let value = match column {
            "id" => self.id as f64,
            "Gender" => self.gender as f64,
            "Age" => self.age as f64,
            "Academic Pressure" => self.academic_pressure as f64,
            "Work Pressure" => self.work_pressure as f64,
            "CGPA" => self.cgpa,
            "Study Satisfaction" => self.study_satisfaction as f64,
            "Job Satisfaction" => self.job_satisfaction as f64,
            "Sleep Duration" => self.sleep_duration,
            "Dietary Habits" => self.dietary_habits as f64,
            "Have you ever had suicidal thoughts ?" => self.suicidal_thoughts as f64,
            "Work/Study Hours" => self.study_hours as f64,
            "Financial Stress" => self.financial_stress as f64,
            "Family History of Mental Illness" => self.family_history as f64,
            _ => return None,
        };
        Some(value)
    }

    pub fn text(&self, column: &str) -> Option<&str> {
        match column {
            "City" => Some(&self.city),
            "Profession" => Some(&self.profession),
            "Degree" => Some(&self.degree),
            _ => None,
        }
    }
}
