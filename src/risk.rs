use std::sync::Arc;

use serde::Deserialize;

use crate::models::{FeatureRecord, RiskAssessment, RiskTier};

/// What a classifier returns for one record: a positive-class probability, or
/// only a hard decision when the model has no probability output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Prediction {
    Probability(f64),
    Decision(bool),
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct ClassifierError(pub String);

pub trait ExternalClassifier: Send + Sync {
    fn name(&self) -> &str;
    fn predict(&self, features: &FeatureRecord) -> Result<Prediction, ClassifierError>;
}

/// The process-wide classifier slot, filled once at startup.
#[derive(Clone)]
pub enum ClassifierHandle {
    Loaded(Arc<dyn ExternalClassifier>),
    Unavailable { reason: String },
}

impl ClassifierHandle {
    pub fn loaded(classifier: impl ExternalClassifier + 'static) -> Self {
        ClassifierHandle::Loaded(Arc::new(classifier))
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, ClassifierHandle::Loaded(_))
    }

    pub fn status_label(&self) -> &'static str {
        if self.is_loaded() {
            "OK"
        } else {
            "Model Missing"
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AssessError {
    #[error("model not found or failed to load: {0}")]
    ClassifierUnavailable(String),
    #[error("prediction failed: {0}")]
    InferenceFailed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct TierBand {
    pub lower: f64,
    pub tier: RiskTier,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TierTableError {
    #[error("tier table has no bands")]
    Empty,
    #[error("first band must start at 0.0, starts at {0}")]
    FirstBoundNotZero(f64),
    #[error("band bound {0} is outside [0, 1]")]
    OutOfRange(f64),
    #[error("band bounds must be strictly ascending ({previous} then {next})")]
    NotAscending { previous: f64, next: f64 },
}

/// Probability bands, each closed on its lower bound and open on the next
/// band's lower bound. The last band runs through 1.0 inclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct TierTable {
    bands: Vec<TierBand>,
}

impl Default for TierTable {
    fn default() -> Self {
        Self {
            bands: vec![
                TierBand { lower: 0.0, tier: RiskTier::VeryLow },
                TierBand { lower: 0.2, tier: RiskTier::Low },
                TierBand { lower: 0.4, tier: RiskTier::Moderate },
                TierBand { lower: 0.6, tier: RiskTier::High },
                TierBand { lower: 0.8, tier: RiskTier::Severe },
            ],
        }
    }
}

impl TierTable {
    pub fn new(bands: Vec<TierBand>) -> Result<Self, TierTableError> {
        let first = bands.first().ok_or(TierTableError::Empty)?;
        if first.lower != 0.0 {
            return Err(TierTableError::FirstBoundNotZero(first.lower));
        }

        for band in &bands {
            if !(0.0..=1.0).contains(&band.lower) {
                return Err(TierTableError::OutOfRange(band.lower));
            }
        }

        for pair in bands.windows(2) {
            if pair[1].lower <= pair[0].lower {
                return Err(TierTableError::NotAscending {
                    previous: pair[0].lower,
                    next: pair[1].lower,
                });
            }
        }

        Ok(Self { bands })
    }

    /// Three bands split at 30% and 60%.
    pub fn coarse() -> Self {
        Self {
            bands: vec![
                TierBand { lower: 0.0, tier: RiskTier::Low },
                TierBand { lower: 0.3, tier: RiskTier::Moderate },
                TierBand { lower: 0.6, tier: RiskTier::High },
            ],
        }
    }

    pub fn bands(&self) -> &[TierBand] {
        &self.bands
    }

    pub fn tier_for(&self, probability: f64) -> RiskTier {
        let mut tier = self.bands[0].tier;
        for band in &self.bands[1..] {
            if probability >= band.lower {
                tier = band.tier;
            } else {
                break;
            }
        }
        tier
    }
}

pub fn assess(
    features: &FeatureRecord,
    classifier: &ClassifierHandle,
    tiers: &TierTable,
) -> Result<RiskAssessment, AssessError> {
    let model = match classifier {
        ClassifierHandle::Loaded(model) => model,
        ClassifierHandle::Unavailable { reason } => {
            return Err(AssessError::ClassifierUnavailable(reason.clone()));
        }
    };

    let probability = match model.predict(features) {
        Ok(Prediction::Probability(p)) => p,
        Ok(Prediction::Decision(positive)) => {
            if positive {
                1.0
            } else {
                0.0
            }
        }
        Err(err) => {
            log::error!("classifier {} failed on id {}: {err}", model.name(), features.id);
            return Err(AssessError::InferenceFailed(err.to_string()));
        }
    };

    if !probability.is_finite() || !(0.0..=1.0).contains(&probability) {
        log::error!(
            "classifier {} returned {probability} for id {}",
            model.name(),
            features.id
        );
        return Err(AssessError::InferenceFailed(format!(
            "probability {probability} is outside [0, 1]"
        )));
    }

    let tier = tiers.tier_for(probability);
    Ok(RiskAssessment {
        probability,
        percentage: probability * 100.0,
        tier,
        message: tier.advice().to_string(),
        severity_color: tier.color(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RawSubmission, SeverityColor};
    use crate::normalize::normalize;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed {
        output: Prediction,
        calls: AtomicUsize,
    }

    impl Fixed {
        fn new(output: Prediction) -> Self {
            Self {
                output,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl ExternalClassifier for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn predict(&self, _features: &FeatureRecord) -> Result<Prediction, ClassifierError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.output)
        }
    }

    struct Broken;

    impl ExternalClassifier for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn predict(&self, _features: &FeatureRecord) -> Result<Prediction, ClassifierError> {
            Err(ClassifierError("feature mismatch".to_string()))
        }
    }

    fn sample_features() -> FeatureRecord {
        normalize(&RawSubmission::default())
    }

    fn assess_probability(p: f64) -> RiskAssessment {
        let handle = ClassifierHandle::loaded(Fixed::new(Prediction::Probability(p)));
        assess(&sample_features(), &handle, &TierTable::default()).unwrap()
    }

    #[test]
    fn boundaries_resolve_upward() {
        let tiers = TierTable::default();
        assert_eq!(tiers.tier_for(0.0), RiskTier::VeryLow);
        assert_eq!(tiers.tier_for(0.1999), RiskTier::VeryLow);
        assert_eq!(tiers.tier_for(0.2), RiskTier::Low);
        assert_eq!(tiers.tier_for(0.4), RiskTier::Moderate);
        assert_eq!(tiers.tier_for(0.6), RiskTier::High);
        assert_eq!(tiers.tier_for(0.8), RiskTier::Severe);
        assert_eq!(tiers.tier_for(1.0), RiskTier::Severe);
    }

    #[test]
    fn colors_follow_tiers() {
        assert_eq!(assess_probability(0.1).severity_color, SeverityColor::Green);
        assert_eq!(assess_probability(0.3).severity_color, SeverityColor::Green);
        assert_eq!(assess_probability(0.5).severity_color, SeverityColor::Amber);
        assert_eq!(assess_probability(0.7).severity_color, SeverityColor::Red);
        assert_eq!(assess_probability(0.95).severity_color, SeverityColor::Red);
    }

    #[test]
    fn high_probability_is_high_tier() {
        let result = assess_probability(0.73);
        assert_eq!(result.tier, RiskTier::High);
        assert!((result.percentage - 73.0).abs() < 1e-9);
        assert_eq!(format!("{:.2}", result.percentage), "73.00");
        assert_eq!(result.severity_color, SeverityColor::Red);
        assert_eq!(result.message, RiskTier::High.advice());
    }

    #[test]
    fn decision_output_is_cast() {
        let tiers = TierTable::default();
        let positive = ClassifierHandle::loaded(Fixed::new(Prediction::Decision(true)));
        let negative = ClassifierHandle::loaded(Fixed::new(Prediction::Decision(false)));

        let result = assess(&sample_features(), &positive, &tiers).unwrap();
        assert_eq!(result.probability, 1.0);
        assert_eq!(result.tier, RiskTier::Severe);

        let result = assess(&sample_features(), &negative, &tiers).unwrap();
        assert_eq!(result.probability, 0.0);
        assert_eq!(result.tier, RiskTier::VeryLow);
    }

    #[test]
    fn classifier_called_once() {
        let model = Arc::new(Fixed::new(Prediction::Probability(0.5)));
        let handle = ClassifierHandle::Loaded(model.clone());
        assess(&sample_features(), &handle, &TierTable::default()).unwrap();
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn missing_model_yields_no_assessment() {
        let handle = ClassifierHandle::Unavailable {
            reason: "model.json not found".to_string(),
        };
        let result = assess(&sample_features(), &handle, &TierTable::default());
        assert!(matches!(result, Err(AssessError::ClassifierUnavailable(_))));
        assert_eq!(handle.status_label(), "Model Missing");
    }

    #[test]
    fn failing_model_yields_no_assessment() {
        let handle = ClassifierHandle::loaded(Broken);
        let result = assess(&sample_features(), &handle, &TierTable::default());
        match result {
            Err(AssessError::InferenceFailed(message)) => {
                assert!(message.contains("feature mismatch"))
            }
            other => panic!("expected inference failure, got {other:?}"),
        }
    }

    #[test]
    fn out_of_range_output_is_a_failure() {
        for bad in [1.5, -0.1, f64::NAN] {
            let handle = ClassifierHandle::loaded(Fixed::new(Prediction::Probability(bad)));
            let result = assess(&sample_features(), &handle, &TierTable::default());
            assert!(matches!(result, Err(AssessError::InferenceFailed(_))));
        }
    }

    #[test]
    fn coarse_table_splits_at_thirty_and_sixty() {
        let tiers = TierTable::coarse();
        assert_eq!(tiers.tier_for(0.29), RiskTier::Low);
        assert_eq!(tiers.tier_for(0.3), RiskTier::Moderate);
        assert_eq!(tiers.tier_for(0.6), RiskTier::High);
        assert_eq!(tiers.tier_for(1.0), RiskTier::High);
    }

    #[test]
    fn tier_table_validation() {
        assert_eq!(TierTable::new(vec![]), Err(TierTableError::Empty));
        assert_eq!(
            TierTable::new(vec![TierBand { lower: 0.1, tier: RiskTier::Low }]),
            Err(TierTableError::FirstBoundNotZero(0.1))
        );
        assert_eq!(
            TierTable::new(vec![
                TierBand { lower: 0.0, tier: RiskTier::Low },
                TierBand { lower: 1.2, tier: RiskTier::High },
            ]),
            Err(TierTableError::OutOfRange(1.2))
        );
        assert_eq!(
            TierTable::new(vec![
                TierBand { lower: 0.0, tier: RiskTier::Low },
                TierBand { lower: 0.5, tier: RiskTier::Moderate },
                TierBand { lower: 0.5, tier: RiskTier::High },
            ]),
            Err(TierTableError::NotAscending { previous: 0.5, next: 0.5 })
        );
        assert_eq!(
            TierTable::new(TierTable::default().bands().to_vec()),
            Ok(TierTable::default())
        );
    }

    #[test]
    fn shared_classifier_serves_parallel_requests() {
        let handle = ClassifierHandle::loaded(Fixed::new(Prediction::Probability(0.45)));
        let tiers = TierTable::default();

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    let result = assess(&sample_features(), &handle, &tiers).unwrap();
                    assert_eq!(result.tier, RiskTier::Moderate);
                });
            }
        });
    }
}
