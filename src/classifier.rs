// src/classifier.rs
//
// Boundary to the external behavior model. The model is an opaque
// predict(features) -> (label, probability) function; this adapter owns
// validation of its output and the degrade-to-unknown policy. It never
// retries and never halts the pipeline.

use crate::error::PipelineError;
use crate::features::FeatureVector;
use crate::types::{BehaviorLabel, Observation};
use chrono::{DateTime, Utc};
use tracing::debug;

/// Raw model output before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: String,
    pub probability: f64,
}

/// The external classifier model. Implementations must be pure with
/// respect to pipeline state: one feature vector in, one prediction out.
pub trait BehaviorModel: Send + Sync {
    fn predict(&self, features: &FeatureVector) -> anyhow::Result<Prediction>;
}

impl<F> BehaviorModel for F
where
    F: Fn(&FeatureVector) -> anyhow::Result<Prediction> + Send + Sync,
{
    fn predict(&self, features: &FeatureVector) -> anyhow::Result<Prediction> {
        self(features)
    }
}

pub struct ClassifierAdapter<M: BehaviorModel> {
    model: M,
}

impl<M: BehaviorModel> ClassifierAdapter<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }

    /// Run one classification.
    ///
    /// A label string outside the closed set is a successful classification
    /// that maps to `Unknown`. A model error or a probability outside [0, 1]
    /// is a `Classification` error; callers degrade that tick to
    /// `degraded_observation` and keep the pipeline running.
    pub fn classify(
        &self,
        features: &FeatureVector,
        now: DateTime<Utc>,
    ) -> Result<Observation, PipelineError> {
        let prediction = self
            .model
            .predict(features)
            .map_err(|e| PipelineError::Classification(e.to_string()))?;

        if !(0.0..=1.0).contains(&prediction.probability) || prediction.probability.is_nan() {
            return Err(PipelineError::Classification(format!(
                "model probability {} outside [0, 1]",
                prediction.probability
            )));
        }

        let label = BehaviorLabel::parse_or_unknown(&prediction.label);
        if label == BehaviorLabel::Unknown {
            debug!(raw = %prediction.label, "model label outside closed set");
        }

        Ok(Observation {
            label,
            confidence: prediction.probability,
            timestamp: now,
        })
    }
}

/// What subscribers see when a tick fails to classify: unknown at zero
/// confidence. Never fed to the segmenter.
pub fn degraded_observation(now: DateTime<Utc>) -> Observation {
    Observation {
        label: BehaviorLabel::Unknown,
        confidence: 0.0,
        timestamp: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::tests::feature_vector_from;
    use crate::types::SensorChannel;

    fn any_features() -> FeatureVector {
        feature_vector_from(|_: SensorChannel| vec![0.0, 1.0, 2.0])
    }

    #[test]
    fn test_valid_prediction_maps_to_label() {
        let adapter = ClassifierAdapter::new(|_: &FeatureVector| {
            Ok(Prediction {
                label: "overtake".to_string(),
                probability: 0.87,
            })
        });
        let obs = adapter.classify(&any_features(), Utc::now()).unwrap();
        assert_eq!(obs.label, BehaviorLabel::Overtake);
        assert_eq!(obs.confidence, 0.87);
    }

    #[test]
    fn test_out_of_vocabulary_label_is_successful_unknown() {
        let adapter = ClassifierAdapter::new(|_: &FeatureVector| {
            Ok(Prediction {
                label: "teleporting".to_string(),
                probability: 0.6,
            })
        });
        let obs = adapter.classify(&any_features(), Utc::now()).unwrap();
        assert_eq!(obs.label, BehaviorLabel::Unknown);
        assert_eq!(obs.confidence, 0.6);
    }

    #[test]
    fn test_out_of_range_probability_is_classification_error() {
        let adapter = ClassifierAdapter::new(|_: &FeatureVector| {
            Ok(Prediction {
                label: "cruise".to_string(),
                probability: 1.5,
            })
        });
        let err = adapter.classify(&any_features(), Utc::now()).unwrap_err();
        assert!(matches!(err, PipelineError::Classification(_)));

        // The pipeline continues with the degraded observation.
        let degraded = degraded_observation(Utc::now());
        assert_eq!(degraded.label, BehaviorLabel::Unknown);
        assert_eq!(degraded.confidence, 0.0);
    }

    #[test]
    fn test_model_error_is_classification_error() {
        let adapter =
            ClassifierAdapter::new(|_: &FeatureVector| -> anyhow::Result<Prediction> {
                anyhow::bail!("model file missing")
            });
        let err = adapter.classify(&any_features(), Utc::now()).unwrap_err();
        match err {
            PipelineError::Classification(msg) => assert!(msg.contains("model file missing")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
