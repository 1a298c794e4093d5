//! Delay-risk classifier seam
//!
//! The decision engine only sees the [`Classifier`] trait: a binary model
//! over the 7-feature vector returning class probabilities. The shipped
//! implementation is [`DecisionForest`], a JSON-serialized tree ensemble.
//!
//! Every prediction passes through [`check_output`] before the engine uses
//! it, so a broken artifact surfaces as a `ModelError` instead of a silently
//! wrong decision.

pub mod forest;

pub use forest::{DecisionForest, ForestArtifact, Node, Tree};

use crate::error::ModelError;
use crate::types::{ClassProbabilities, FeatureVector};

/// Probabilities must sum to 1 within this tolerance.
const PROBABILITY_SUM_TOLERANCE: f64 = 1e-6;

/// Binary delay-risk model: class 0 = low risk (reduce speed), class 1 =
/// high risk (hold).
pub trait Classifier: Send + Sync {
    /// Model name for logs and the health endpoint
    fn name(&self) -> &str;

    /// Class probabilities `[p0, p1]`.
    fn predict_proba(&self, features: &FeatureVector) -> Result<[f64; 2], ModelError>;

    /// Predicted class label. Defaults to the arg-max of
    /// [`Classifier::predict_proba`], ties to class 0.
    fn predict(&self, features: &FeatureVector) -> Result<u8, ModelError> {
        let p = self.predict_proba(features)?;
        Ok(argmax(p))
    }
}

/// A checked classifier result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub class: u8,
    pub probabilities: ClassProbabilities,
}

/// Arg-max over two classes, ties to class 0.
pub fn argmax(p: [f64; 2]) -> u8 {
    u8::from(p[1] > p[0])
}

/// Call `predict` and `predict_proba` and check that the pair is well formed.
pub fn classify(model: &dyn Classifier, features: &FeatureVector) -> Result<Prediction, ModelError> {
    let class = model.predict(features)?;
    let proba = model.predict_proba(features)?;
    check_output(class, proba)
}

/// Reject malformed classifier output.
///
/// The class must be 0 or 1, each probability finite and within [0, 1], the
/// pair must sum to 1, and the predicted class must not have the lower
/// probability.
pub fn check_output(class: u8, proba: [f64; 2]) -> Result<Prediction, ModelError> {
    if class > 1 {
        return Err(ModelError::MalformedOutput(format!(
            "predicted class {class} is not 0 or 1"
        )));
    }
    for (i, p) in proba.iter().enumerate() {
        if !p.is_finite() {
            return Err(ModelError::MalformedOutput(format!(
                "probability of class {i} is not finite ({p})"
            )));
        }
        if !(0.0..=1.0).contains(p) {
            return Err(ModelError::MalformedOutput(format!(
                "probability of class {i} is outside [0, 1] ({p})"
            )));
        }
    }
    let sum = proba[0] + proba[1];
    if (sum - 1.0).abs() > PROBABILITY_SUM_TOLERANCE {
        return Err(ModelError::MalformedOutput(format!(
            "probabilities sum to {sum}, expected 1"
        )));
    }
    let other = 1 - usize::from(class);
    if proba[usize::from(class)] < proba[other] {
        return Err(ModelError::MalformedOutput(format!(
            "predicted class {class} disagrees with probabilities [{:.4}, {:.4}]",
            proba[0], proba[1]
        )));
    }
    Ok(Prediction {
        class,
        probabilities: ClassProbabilities(proba),
    })
}
