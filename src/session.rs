use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::export::{write_export, ExportError};
use crate::models::{FeatureRecord, LastResult, RawSubmission, RiskAssessment};
use crate::normalize::normalize;
use crate::risk::{assess, AssessError, ClassifierHandle, TierTable};

/// Per-user screening context. Holds only the most recent successful result;
/// nothing here is shared between sessions.
#[derive(Debug)]
pub struct Session {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    last: Option<LastResult>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            last: None,
        }
    }

    /// Normalize, assess and remember one submission. A failed assessment
    /// leaves the previous result untouched.
    pub fn submit(
        &mut self,
        submission: RawSubmission,
        classifier: &ClassifierHandle,
        tiers: &TierTable,
    ) -> Result<&LastResult, AssessError> {
        let features = normalize(&submission);
        self.submit_features(submission, features, classifier, tiers)
    }

    /// Like [`Session::submit`] for a caller that already normalized the
    /// submission; the stored features are exactly the ones assessed.
    pub fn submit_features(
        &mut self,
        submission: RawSubmission,
        features: FeatureRecord,
        classifier: &ClassifierHandle,
        tiers: &TierTable,
    ) -> Result<&LastResult, AssessError> {
        let assessment = assess(&features, classifier, tiers)?;
        log::info!(
            "session {} student {} assessed {} ({:.2}%)",
            self.id,
            features.id,
            assessment.tier,
            assessment.percentage
        );
        Ok(self.record(submission, features, assessment))
    }

    pub fn record(
        &mut self,
        submission: RawSubmission,
        features: FeatureRecord,
        assessment: RiskAssessment,
    ) -> &LastResult {
        self.last.insert(LastResult {
            submission,
            features,
            assessment,
            assessed_at: Utc::now(),
        })
    }

    pub fn last(&self) -> Option<&LastResult> {
        self.last.as_ref()
    }

    /// Export the last result; `Ok(false)` when there is nothing to export.
    pub fn export_last<W: Write>(&self, writer: W) -> Result<bool, ExportError> {
        match &self.last {
            Some(last) => {
                write_export(writer, &last.features, last.assessment.probability)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Export the last result to `path`. With no result the file is neither
    /// created nor truncated.
    pub fn export_last_to(&self, path: &Path) -> Result<bool, ExportError> {
        if self.last.is_none() {
            return Ok(false);
        }

        let file = File::create(path).map_err(|source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.export_last(BufWriter::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::parse_export;
    use crate::models::RiskTier;
    use crate::risk::{ClassifierError, ExternalClassifier, Prediction};

    struct Constant(f64);

    impl ExternalClassifier for Constant {
        fn name(&self) -> &str {
            "constant"
        }

        fn predict(&self, _features: &FeatureRecord) -> Result<Prediction, ClassifierError> {
            Ok(Prediction::Probability(self.0))
        }
    }

    #[test]
    fn new_session_has_no_result() {
        let session = Session::new();
        assert!(session.last().is_none());
        let mut out = Vec::new();
        assert!(!session.export_last(&mut out).unwrap());
        assert!(out.is_empty());
    }

    #[test]
    fn submit_keeps_latest_result() {
        let mut session = Session::new();
        let handle = ClassifierHandle::loaded(Constant(0.73));
        let tiers = TierTable::default();

        session.submit(RawSubmission::default(), &handle, &tiers).unwrap();
        let last = session.submit(RawSubmission::demo(), &handle, &tiers).unwrap();
        assert_eq!(last.features.id, 123);
        assert_eq!(last.assessment.tier, RiskTier::High);
        assert_eq!(session.last().unwrap().submission, RawSubmission::demo());
    }

    #[test]
    fn failure_keeps_previous_result() {
        let mut session = Session::new();
        let tiers = TierTable::default();
        session
            .submit(RawSubmission::demo(), &ClassifierHandle::loaded(Constant(0.1)), &tiers)
            .unwrap();

        let missing = ClassifierHandle::Unavailable {
            reason: "not loaded".to_string(),
        };
        let result = session.submit(RawSubmission::default(), &missing, &tiers);
        assert!(matches!(result, Err(AssessError::ClassifierUnavailable(_))));
        assert_eq!(session.last().unwrap().features.id, 123);
    }

    #[test]
    fn sessions_do_not_share_results() {
        let handle = ClassifierHandle::loaded(Constant(0.5));
        let tiers = TierTable::default();
        let mut first = Session::new();
        let second = Session::new();

        first.submit(RawSubmission::demo(), &handle, &tiers).unwrap();
        assert!(first.last().is_some());
        assert!(second.last().is_none());
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn exported_last_result_parses_back() {
        let mut session = Session::new();
        let handle = ClassifierHandle::loaded(Constant(0.62));
        session
            .submit(RawSubmission::demo(), &handle, &TierTable::default())
            .unwrap();

        let mut out = Vec::new();
        assert!(session.export_last(&mut out).unwrap());
        let (features, probability) = parse_export(out.as_slice()).unwrap();
        assert_eq!(&features, &session.last().unwrap().features);
        assert_eq!(probability, 0.62);
    }

    #[test]
    fn stores_the_features_it_was_given() {
        let mut session = Session::new();
        let handle = ClassifierHandle::loaded(Constant(0.3));
        let mut features = normalize(&RawSubmission::demo());
        features.city = "Bhopal".to_string();

        let tiers = TierTable::default();
        let last = session
            .submit_features(RawSubmission::demo(), features.clone(), &handle, &tiers)
            .unwrap();
        assert_eq!(last.features, features);
        assert_eq!(last.assessment.tier, RiskTier::Low);
    }

    #[test]
    fn failed_submit_leaves_existing_export_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prediction.csv");
        std::fs::write(&path, "previous,export\n").unwrap();

        let mut session = Session::new();
        let missing = ClassifierHandle::Unavailable {
            reason: "not loaded".to_string(),
        };
        assert!(session
            .submit(RawSubmission::demo(), &missing, &TierTable::default())
            .is_err());

        assert!(!session.export_last_to(&path).unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "previous,export\n");

        let absent = dir.path().join("absent.csv");
        assert!(!session.export_last_to(&absent).unwrap());
        assert!(!absent.exists());
    }

    #[test]
    fn export_to_path_writes_one_prediction() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prediction.csv");
        let mut session = Session::new();
        session
            .submit(
                RawSubmission::demo(),
                &ClassifierHandle::loaded(Constant(0.73)),
                &TierTable::default(),
            )
            .unwrap();

        assert!(session.export_last_to(&path).unwrap());
        let (features, probability) = parse_export(File::open(&path).unwrap()).unwrap();
        assert_eq!(features.id, 123);
        assert_eq!(probability, 0.73);
    }
}
