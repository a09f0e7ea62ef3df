//! Text mood classification.
//!
//! A [`SequenceClassifier`] turns text into a logits vector. [`MoodClassifier`]
//! wraps one, applies softmax, picks the winning index and maps it to a
//! [`MoodLabel`]. The ONNX Runtime backend lives behind the `inference`
//! feature; anything else implementing the trait (tests use fixed logits)
//! plugs in the same way.

#[cfg(feature = "inference")]
mod model;

#[cfg(feature = "inference")]
pub use model::{Device, ModelPaths, OnnxClassifier, OnnxOptions, ReloadingClassifier};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AppError;
use crate::math::{argmax, softmax};
use crate::mood::MoodLabel;

/// Inference error types
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("Model artifact not found: {0}")]
    ArtifactMissing(String),

    #[error("Model artifact {path} could not be loaded: {reason}")]
    ArtifactInvalid { path: String, reason: String },

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    #[error("ONNX runtime error: {0}")]
    Onnx(String),

    #[error("Classifier produced no usable logits")]
    EmptyOutput,

    #[error("Inference task failed: {0}")]
    Task(String),
}

impl From<InferenceError> for AppError {
    fn from(err: InferenceError) -> Self {
        match err {
            InferenceError::Tokenizer(msg) => AppError::BadRequest(msg),
            _ => AppError::Internal(err.to_string()),
        }
    }
}

/// When the model artifact is loaded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadPolicy {
    /// Load at startup and share across requests
    #[default]
    Once,
    /// Load the artifact afresh for every classification
    PerCall,
}

impl std::fmt::Display for LoadPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Once => write!(f, "once"),
            Self::PerCall => write!(f, "per_call"),
        }
    }
}

/// A model that scores text against the classifier's label set.
///
/// Implementations must be reentrant: `logits` is called concurrently from
/// blocking worker threads.
pub trait SequenceClassifier: Send + Sync {
    /// Raw, unnormalized scores, one per label index
    fn logits(&self, text: &str) -> Result<Vec<f32>, InferenceError>;

    /// Short backend name for diagnostics
    fn name(&self) -> &str {
        "custom"
    }
}

/// Result of classifying one message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodPrediction {
    /// Label the winning index maps to
    pub label: MoodLabel,
    /// Winning label index (first maximum)
    pub index: usize,
    /// Softmax probabilities, one per label index
    pub probabilities: Vec<f32>,
}

/// Maps free text to one [`MoodLabel`]
#[derive(Clone)]
pub struct MoodClassifier {
    backend: Arc<dyn SequenceClassifier>,
}

impl std::fmt::Debug for MoodClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MoodClassifier")
            .field("backend", &self.backend.name())
            .finish()
    }
}

impl MoodClassifier {
    pub fn new(backend: impl SequenceClassifier + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Classify text, keeping the full probability distribution
    pub fn predict(&self, text: &str) -> Result<MoodPrediction, InferenceError> {
        let logits = self.backend.logits(text)?;
        let probabilities = softmax(&logits);
        let index = argmax(&probabilities).ok_or(InferenceError::EmptyOutput)?;
        let label = MoodLabel::from_index(index);

        debug!(index, %label, "Classified message");

        Ok(MoodPrediction {
            label,
            index,
            probabilities,
        })
    }

    /// Classify text into a single mood label
    pub fn classify(&self, text: &str) -> Result<MoodLabel, InferenceError> {
        self.predict(text).map(|p| p.label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedLogits(Vec<f32>);

    impl SequenceClassifier for FixedLogits {
        fn logits(&self, _text: &str) -> Result<Vec<f32>, InferenceError> {
            Ok(self.0.clone())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    struct Broken;

    impl SequenceClassifier for Broken {
        fn logits(&self, _text: &str) -> Result<Vec<f32>, InferenceError> {
            Err(InferenceError::Tokenizer("invalid input".to_string()))
        }
    }

    #[test]
    fn test_logits_favoring_index_one_is_joy() {
        let classifier = MoodClassifier::new(FixedLogits(vec![0.1, 3.0, 0.2, -1.0, 0.0, 0.5]));
        assert_eq!(classifier.classify("I'm so happy").unwrap(), MoodLabel::Joy);
    }

    #[test]
    fn test_each_index_maps_through_table() {
        for index in 0..6 {
            let mut logits = vec![0.0; 6];
            logits[index] = 5.0;
            let classifier = MoodClassifier::new(FixedLogits(logits));
            let prediction = classifier.predict("text").unwrap();
            assert_eq!(prediction.index, index);
            assert_eq!(prediction.label, MoodLabel::from_index(index));
        }
    }

    #[test]
    fn test_index_beyond_table_is_neutral() {
        // index 5 ("surprise" in the six-class training set)
        let classifier = MoodClassifier::new(FixedLogits(vec![0.0, 0.0, 0.0, 0.0, 0.0, 9.0]));
        assert_eq!(classifier.classify("whoa").unwrap(), MoodLabel::Neutral);
    }

    #[test]
    fn test_tie_resolves_to_first_index() {
        let classifier = MoodClassifier::new(FixedLogits(vec![1.0, 2.0, 2.0, 0.0]));
        let prediction = classifier.predict("tie").unwrap();
        assert_eq!(prediction.index, 1);
        assert_eq!(prediction.label, MoodLabel::Joy);
    }

    #[test]
    fn test_probabilities_are_normalized() {
        let classifier = MoodClassifier::new(FixedLogits(vec![0.5, 1.5, 2.5]));
        let prediction = classifier.predict("text").unwrap();
        let sum: f32 = prediction.probabilities.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert_eq!(prediction.label, MoodLabel::Love);
    }

    #[test]
    fn test_empty_logits_is_error() {
        let classifier = MoodClassifier::new(FixedLogits(vec![]));
        assert!(matches!(
            classifier.classify("text"),
            Err(InferenceError::EmptyOutput)
        ));
    }

    #[test]
    fn test_backend_error_propagates() {
        let classifier = MoodClassifier::new(Broken);
        assert!(matches!(
            classifier.classify("text"),
            Err(InferenceError::Tokenizer(_))
        ));
        assert_eq!(classifier.backend_name(), "custom");
    }

    #[test]
    fn test_tokenizer_error_maps_to_bad_request() {
        let err: AppError = InferenceError::Tokenizer("bad".to_string()).into();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err: AppError = InferenceError::EmptyOutput.into();
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[test]
    fn test_unloadable_artifact_is_server_error() {
        let err: AppError = InferenceError::ArtifactInvalid {
            path: "checkpoint/tokenizer.json".to_string(),
            reason: "expected value".to_string(),
        }
        .into();
        assert!(matches!(err, AppError::Internal(_)));
        assert_eq!(err.status_code(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_load_policy_display() {
        assert_eq!(LoadPolicy::default(), LoadPolicy::Once);
        assert_eq!(LoadPolicy::PerCall.to_string(), "per_call");
    }
}
