use std::fmt::Write;

use crate::models::{FeatureRecord, RiskAssessment, RiskTier};
use crate::normalize::FEATURE_COLUMNS;
use crate::risk::AssessError;

pub const DISCLAIMER: &str =
    "This tool gives probabilistic output and is NOT a clinical diagnosis.";

#[derive(Debug, Clone, PartialEq)]
pub struct TierSummary {
    pub tier: RiskTier,
    pub count: usize,
    pub avg_percentage: f64,
}

pub fn result_headline(assessment: &RiskAssessment) -> String {
    format!(
        "{} — {:.2}%",
        assessment.tier.headline(),
        assessment.percentage
    )
}

pub fn build_snapshot(features: &FeatureRecord) -> String {
    let mut output = String::new();
    let width = FEATURE_COLUMNS.iter().map(|c| c.len()).max().unwrap_or(0);

    let _ = writeln!(output, "## Input Snapshot");
    for (column, value) in FEATURE_COLUMNS.iter().zip(features.to_fields()) {
        let _ = writeln!(output, "- {column:<width$}  {value}");
    }
    output
}

pub fn build_report(
    model_status: &str,
    name: Option<&str>,
    features: &FeatureRecord,
    outcome: &Result<RiskAssessment, AssessError>,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Student Depression Screening");
    let _ = writeln!(output, "Model status: {model_status}");
    if let Some(name) = name {
        let _ = writeln!(output, "Student: {name}");
    }
    let _ = writeln!(output);
    output.push_str(&build_snapshot(features));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Prediction");

    match outcome {
        Ok(assessment) => {
            let _ = writeln!(output, "{}", result_headline(assessment));
            let _ = writeln!(output, "{}", assessment.message);
            let _ = writeln!(
                output,
                "Risk tier: {} ({})",
                assessment.tier, assessment.severity_color
            );
        }
        Err(err) => {
            let _ = writeln!(output, "No prediction: {err}");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "{DISCLAIMER}");
    output
}

pub fn summarize_by_tier(assessments: &[RiskAssessment]) -> Vec<TierSummary> {
    let mut map: std::collections::HashMap<RiskTier, (usize, f64)> =
        std::collections::HashMap::new();

    for assessment in assessments {
        let entry = map.entry(assessment.tier).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += assessment.percentage;
    }

    let mut summaries: Vec<TierSummary> = map
        .into_iter()
        .map(|(tier, (count, total))| TierSummary {
            tier,
            count,
            avg_percentage: total / count as f64,
        })
        .collect();

    summaries.sort_by_key(|s| s.tier);
    summaries
}

pub fn build_batch_report(assessments: &[RiskAssessment], failures: usize) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Batch Screening Summary");
    let _ = writeln!(
        output,
        "{} assessed, {} failed",
        assessments.len(),
        failures
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Tier Mix");

    let summaries = summarize_by_tier(assessments);
    if summaries.is_empty() {
        let _ = writeln!(output, "No assessments in this batch.");
    } else {
        for summary in summaries.iter() {
            let _ = writeln!(
                output,
                "- {}: {} students (avg {:.1}%)",
                summary.tier, summary.count, summary.avg_percentage
            );
        }
    }

    output
}
