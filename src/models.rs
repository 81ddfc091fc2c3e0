use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Gender::Male,
            "female" | "f" => Gender::Female,
            "other" => Gender::Other,
            _ => {
                log::warn!("unknown gender {label:?}, falling back to Other");
                Gender::Other
            }
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Gender::Male => 1,
            Gender::Female => 0,
            Gender::Other => 2,
        }
    }
}

/// Sleep-duration selection. Labels outside the four known buckets are kept
/// verbatim so the normalizer can apply (and report) its fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SleepBucket {
    UnderFive,
    FiveToSix,
    SevenToEight,
    NineOrMore,
    Unrecognized(String),
}

impl SleepBucket {
    pub fn from_label(label: &str) -> Self {
        let compact: String = label
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();

        match compact.as_str() {
            "<5h" | "<5hrs" | "<5hours" | "lessthan5hours" => SleepBucket::UnderFive,
            "5-6h" | "5-6hrs" | "5-6hours" => SleepBucket::FiveToSix,
            "7-8h" | "7-8hrs" | "7-8hours" => SleepBucket::SevenToEight,
            "9h+" | "9+h" | "9+hrs" | "9+hours" | "morethan8hours" => SleepBucket::NineOrMore,
            _ => SleepBucket::Unrecognized(label.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DietaryHabits {
    Healthy,
    Unhealthy,
}

impl DietaryHabits {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "healthy" => DietaryHabits::Healthy,
            "unhealthy" => DietaryHabits::Unhealthy,
            _ => {
                log::warn!("unknown dietary habits {label:?}, falling back to Unhealthy");
                DietaryHabits::Unhealthy
            }
        }
    }

    pub fn code(self) -> u8 {
        match self {
            DietaryHabits::Healthy => 1,
            DietaryHabits::Unhealthy => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YesNo {
    Yes,
    No,
}

impl YesNo {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "yes" | "y" | "1" | "true" => YesNo::Yes,
            "no" | "n" | "0" | "false" => YesNo::No,
            _ => {
                log::warn!("unknown yes/no answer {label:?}, falling back to No");
                YesNo::No
            }
        }
    }

    pub fn code(self) -> u8 {
        match self {
            YesNo::Yes => 1,
            YesNo::No => 0,
        }
    }
}

/// One form submission as the student entered it. Range checks belong to the
/// input layer; nothing here re-validates.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSubmission {
    pub student_id: u64,
    pub name: Option<String>,
    pub gender: Gender,
    pub age: u32,
    pub city: String,
    pub profession: String,
    pub degree: String,
    pub cgpa: f64,
    pub study_hours: u32,
    pub academic_pressure: u8,
    pub study_satisfaction: u8,
    pub job_satisfaction: u8,
    pub work_pressure: u8,
    pub financial_stress: u8,
    pub sleep_duration: SleepBucket,
    pub dietary_habits: DietaryHabits,
    pub suicidal_thoughts: YesNo,
    pub family_history: YesNo,
}

impl Default for RawSubmission {
    fn default() -> Self {
        Self {
            student_id: 0,
            name: None,
            gender: Gender::Male,
            age: 20,
            city: String::new(),
            profession: "Student".to_string(),
            degree: "B.Tech".to_string(),
            cgpa: 7.5,
            study_hours: 20,
            academic_pressure: 3,
            study_satisfaction: 3,
            job_satisfaction: 2,
            work_pressure: 1,
            financial_stress: 2,
            sleep_duration: SleepBucket::UnderFive,
            dietary_habits: DietaryHabits::Healthy,
            suicidal_thoughts: YesNo::No,
            family_history: YesNo::No,
        }
    }
}

impl RawSubmission {
    /// The prefilled "load sample values" submission.
    pub fn demo() -> Self {
        Self {
            student_id: 123,
            name: None,
            gender: Gender::Male,
            age: 21,
            city: "Indore".to_string(),
            profession: "Student".to_string(),
            degree: "B.Tech".to_string(),
            cgpa: 7.8,
            study_hours: 25,
            academic_pressure: 4,
            study_satisfaction: 2,
            job_satisfaction: 1,
            work_pressure: 3,
            financial_stress: 3,
            sleep_duration: SleepBucket::FiveToSix,
            dietary_habits: DietaryHabits::Unhealthy,
            suicidal_thoughts: YesNo::No,
            family_history: YesNo::No,
        }
    }
}

/// Classifier input, one field per schema column in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    pub id: u64,
    pub gender: u8,
    pub age: u32,
    pub city: String,
    pub profession: String,
    pub academic_pressure: u8,
    pub work_pressure: u8,
    pub cgpa: f64,
    pub study_satisfaction: u8,
    pub job_satisfaction: u8,
    pub sleep_duration: f64,
    pub dietary_habits: u8,
    pub degree: String,
    pub suicidal_thoughts: u8,
    pub study_hours: u32,
    pub financial_stress: u8,
    pub family_history: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
pub enum RiskTier {
    VeryLow,
    Low,
    Moderate,
    High,
    Severe,
}

impl RiskTier {
    pub fn headline(self) -> &'static str {
        match self {
            RiskTier::VeryLow => "Very unlikely to have depression",
            RiskTier::Low => "Unlikely to have depression",
            RiskTier::Moderate => "May have depression",
            RiskTier::High => "Likely to have depression",
            RiskTier::Severe => "Highly likely to have depression",
        }
    }

    pub fn advice(self) -> &'static str {
        match self {
            RiskTier::VeryLow => "Tip: Maintain healthy habits, regular sleep and diet.",
            RiskTier::Low => "Tip: Small lifestyle improvements and check-ins recommended.",
            RiskTier::Moderate => "Recommend: Talk with a counselor; prioritize sleep & routine.",
            RiskTier::High => "Recommend: Seek professional help; contact campus counseling.",
            RiskTier::Severe => {
                "Immediate action: If suicidal thoughts are present, contact emergency services or helplines."
            }
        }
    }

    pub fn color(self) -> SeverityColor {
        match self {
            RiskTier::VeryLow | RiskTier::Low => SeverityColor::Green,
            RiskTier::Moderate => SeverityColor::Amber,
            RiskTier::High | RiskTier::Severe => SeverityColor::Red,
        }
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskTier::VeryLow => write!(f, "Very Low"),
            RiskTier::Low => write!(f, "Low"),
            RiskTier::Moderate => write!(f, "Moderate"),
            RiskTier::High => write!(f, "High"),
            RiskTier::Severe => write!(f, "Severe"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeverityColor {
    Green,
    Amber,
    Red,
}

impl std::fmt::Display for SeverityColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeverityColor::Green => write!(f, "green"),
            SeverityColor::Amber => write!(f, "amber"),
            SeverityColor::Red => write!(f, "red"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskAssessment {
    pub probability: f64,
    pub percentage: f64,
    pub tier: RiskTier,
    pub message: String,
    pub severity_color: SeverityColor,
}

/// What a session remembers about its most recent successful prediction.
#[derive(Debug, Clone)]
pub struct LastResult {
    pub submission: RawSubmission,
    pub features: FeatureRecord,
    pub assessment: RiskAssessment,
    pub assessed_at: DateTime<Utc>,
}
