//! Loading the serialized classifier artifact.
//!
//! The artifact is a JSON logistic model: an intercept, one weight per numeric
//! column and a contribution table per free-text column. It carries the schema
//! version it was trained against so a stale artifact is refused at load time
//! instead of silently scoring a reordered feature vector.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::models::FeatureRecord;
use crate::normalize::{FEATURE_COLUMNS, SCHEMA_VERSION, TEXT_COLUMNS};
use crate::risk::{ClassifierError, ClassifierHandle, ExternalClassifier, Prediction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    #[default]
    Probability,
    Decision,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelArtifact {
    pub schema_version: u32,
    pub name: String,
    #[serde(default)]
    pub output: OutputKind,
    pub intercept: f64,
    #[serde(default)]
    pub weights: BTreeMap<String, f64>,
    #[serde(default)]
    pub categories: BTreeMap<String, BTreeMap<String, f64>>,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

fn default_threshold() -> f64 {
    0.5
}

#[derive(Debug, thiserror::Error)]
pub enum ModelLoadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid model artifact: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("artifact trained for feature schema v{found}, this build uses v{expected}")]
    SchemaVersion { found: u32, expected: u32 },
    #[error("artifact references unknown column {0:?}")]
    UnknownColumn(String),
    #[error("column {0:?} is free text and cannot carry a numeric weight")]
    NotNumeric(String),
    #[error("column {0:?} is numeric and cannot carry a category table")]
    NotText(String),
}

#[derive(Debug, Clone)]
pub struct LinearClassifier {
    artifact: ModelArtifact,
}

impl LinearClassifier {
    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self, ModelLoadError> {
        if artifact.schema_version != SCHEMA_VERSION {
            return Err(ModelLoadError::SchemaVersion {
                found: artifact.schema_version,
                expected: SCHEMA_VERSION,
            });
        }

        for column in artifact.weights.keys() {
            check_known(column)?;
            if TEXT_COLUMNS.contains(&column.as_str()) {
                return Err(ModelLoadError::NotNumeric(column.clone()));
            }
        }

        for column in artifact.categories.keys() {
            check_known(column)?;
            if !TEXT_COLUMNS.contains(&column.as_str()) {
                return Err(ModelLoadError::NotText(column.clone()));
            }
        }

        Ok(Self { artifact })
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    fn logit(&self, features: &FeatureRecord) -> f64 {
        let mut z = self.artifact.intercept;

        for (column, weight) in &self.artifact.weights {
            z += weight * features.numeric(column).unwrap_or(0.0);
        }

        for (column, table) in &self.artifact.categories {
            if let Some(value) = features.text(column) {
                z += table.get(value.trim()).copied().unwrap_or(0.0);
            }
        }

        z
    }
}

fn check_known(column: &str) -> Result<(), ModelLoadError> {
    if FEATURE_COLUMNS.contains(&column) {
        Ok(())
    } else {
        Err(ModelLoadError::UnknownColumn(column.to_string()))
    }
}

impl ExternalClassifier for LinearClassifier {
    fn name(&self) -> &str {
        &self.artifact.name
    }

    fn predict(&self, features: &FeatureRecord) -> Result<Prediction, ClassifierError> {
        let z = self.logit(features);
        if !z.is_finite() {
            return Err(ClassifierError(format!("non-finite score {z}")));
        }

        let probability = 1.0 / (1.0 + (-z).exp());
        Ok(match self.artifact.output {
            OutputKind::Probability => Prediction::Probability(probability),
            OutputKind::Decision => Prediction::Decision(probability >= self.artifact.threshold),
        })
    }
}

pub fn load_artifact(path: &Path) -> Result<LinearClassifier, ModelLoadError> {
    let content = std::fs::read_to_string(path).map_err(|source| ModelLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let artifact: ModelArtifact = serde_json::from_str(&content)?;
    LinearClassifier::from_artifact(artifact)
}

/// Load the classifier for the lifetime of the process. Failure leaves the
/// handle unavailable so the tool still starts and reports the problem.
pub fn load_classifier(path: &Path) -> ClassifierHandle {
    match load_artifact(path) {
        Ok(model) => {
            log::info!(
                "loaded classifier {} ({:?} output) from {}",
                model.name(),
                model.artifact().output,
                path.display()
            );
            ClassifierHandle::loaded(model)
        }
        Err(err) => {
            log::warn!("classifier unavailable: {err}");
            ClassifierHandle::Unavailable {
                reason: err.to_string(),
            }
        }
    }
}
