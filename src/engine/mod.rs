//! Decision Engine
//!
//! Picks one of two paths per conflict:
//!
//! - **Equal priority** (both declared levels present and equal): score each
//!   train with [`scoring::score_train`]; the higher score keeps precedence.
//!   Exact ties go to the originally-named priority train.
//! - **Classifier** (anything else): build the feature vector from the shared
//!   trip attributes and ask the [`Classifier`] for a delay-risk class. The
//!   named priority train always keeps precedence; class 0 slows the affected
//!   train, class 1 holds it.
//!
//! The engine is immutable after construction and takes `&self`, so one
//! instance serves any number of concurrent decisions.

pub mod scoring;

use std::sync::Arc;
use tracing::debug;

use crate::classifier::{classify, Classifier};
use crate::config::{ActionsConfig, ArbiterConfig, ScoringConfig};
use crate::error::{ArbiterError, ModelError};
use crate::features::build_features;
use crate::types::{
    Action, ConflictRequest, Decision, DecisionBasis, PriorityAnalysis, Side,
};

pub struct DecisionEngine {
    scoring: ScoringConfig,
    actions: ActionsConfig,
    classifier: Option<Arc<dyn Classifier>>,
}

impl DecisionEngine {
    pub fn new(
        scoring: ScoringConfig,
        actions: ActionsConfig,
        classifier: Option<Arc<dyn Classifier>>,
    ) -> Self {
        Self {
            scoring,
            actions,
            classifier,
        }
    }

    pub fn from_config(config: &ArbiterConfig, classifier: Option<Arc<dyn Classifier>>) -> Self {
        Self::new(config.scoring.clone(), config.actions.clone(), classifier)
    }

    pub fn classifier_name(&self) -> Option<&str> {
        self.classifier.as_deref().map(|c| c.name())
    }

    pub fn decide(&self, request: &ConflictRequest) -> Result<Decision, ArbiterError> {
        match request.shared_level() {
            Some(level) => self.decide_equal_priority(request, level),
            None => self.decide_with_classifier(request),
        }
    }

    /// Equal-priority path.
    ///
    /// Finite inputs can still overflow a score (huge passengers over a tiny
    /// capacity); such a score is rejected instead of compared.
    pub fn decide_equal_priority(
        &self,
        request: &ConflictRequest,
        level: i64,
    ) -> Result<Decision, ArbiterError> {
        let priority_score = self.finite_score(request, Side::Priority)?;
        let affected_score = self.finite_score(request, Side::Affected)?;
        let tie = priority_score == affected_score;
        let priority_wins = priority_score >= affected_score;

        debug!(
            level,
            priority_score,
            affected_score,
            tie,
            "Equal-priority scoring"
        );

        let (action, keeps, yields, suggested_speed) = if priority_wins {
            (
                Action::ReduceSpeed,
                &request.priority_train,
                &request.affected_train,
                self.actions.reduced_speed_kmh,
            )
        } else {
            (
                Action::HoldTrain,
                &request.affected_train,
                &request.priority_train,
                self.actions.hold_speed_kmh,
            )
        };

        Ok(Decision {
            action,
            priority_train: keeps.clone(),
            reduced_train: yields.clone(),
            suggested_speed,
            confidence: scoring::confidence(priority_score, affected_score, &self.scoring),
            prediction: u8::from(!priority_wins),
            basis: DecisionBasis::Heuristic(PriorityAnalysis {
                level,
                priority_score,
                affected_score,
                tie,
            }),
        })
    }

    fn finite_score(&self, request: &ConflictRequest, side: Side) -> Result<f64, ArbiterError> {
        let score = scoring::score_train(&request.observation_for(side), &self.scoring);
        if score.is_finite() {
            Ok(score)
        } else {
            Err(ArbiterError::invalid(
                format!("{}_passengers", side.prefix()),
                "equal-priority score overflows; passengers and train_capacity are out of range",
            ))
        }
    }

    /// Classifier path.
    pub fn decide_with_classifier(&self, request: &ConflictRequest) -> Result<Decision, ArbiterError> {
        let model = self.classifier.as_deref().ok_or(ModelError::Unavailable)?;
        let features = build_features(&request.trip);
        let prediction = classify(model, &features)?;

        debug!(
            model = model.name(),
            class = prediction.class,
            p_reduce = prediction.probabilities.0[0],
            p_hold = prediction.probabilities.0[1],
            "Classifier prediction"
        );

        let (action, suggested_speed) = if prediction.class == 0 {
            (Action::ReduceSpeed, self.actions.reduced_speed_kmh)
        } else {
            (Action::HoldTrain, self.actions.hold_speed_kmh)
        };

        Ok(Decision {
            action,
            priority_train: request.priority_train.clone(),
            reduced_train: request.affected_train.clone(),
            suggested_speed,
            confidence: (prediction.probabilities.max() * 100.0).clamp(0.0, 100.0),
            prediction: prediction.class,
            basis: DecisionBasis::Classifier {
                model: model.name().to_string(),
                probabilities: prediction.probabilities,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{DecisionForest, ForestArtifact, Tree};
    use crate::error::ErrorKind;
    use crate::types::{FeatureVector, TrainRef};
    use serde_json::json;

    /// Class 1 when distance_km > 400.
    fn model() -> Arc<dyn Classifier> {
        Arc::new(
            DecisionForest::from_artifact(ForestArtifact::new(vec![Tree::stump(
                1,
                400.0,
                [0.8, 0.2],
                [0.1, 0.9],
            )]))
            .unwrap(),
        )
    }

    fn engine() -> DecisionEngine {
        DecisionEngine::from_config(&ArbiterConfig::default(), Some(model()))
    }

    fn request(extra: serde_json::Value) -> ConflictRequest {
        let mut payload = json!({
            "priority_train": 101,
            "affected_train": 202,
            "passengers": 500,
            "distance_km": 300,
            "travel_time_hr": 5,
            "train_capacity": 800,
            "is_peak_hour": 0
        });
        for (k, v) in extra.as_object().unwrap() {
            payload[k] = v.clone();
        }
        ConflictRequest::from_value(&payload).unwrap()
    }

    #[test]
    fn equal_levels_use_scoring_priority_wins() {
        let req = request(json!({
            "priority_train_level": 2,
            "affected_train_level": 2,
            "priority_train_passengers": 500,
            "priority_train_distance": 450,
            "affected_train_passengers": 200,
            "affected_train_distance": 100
        }));
        let d = engine().decide(&req).unwrap();
        assert_eq!(d.action, Action::ReduceSpeed);
        assert_eq!(d.priority_train, TrainRef::Number(101));
        assert_eq!(d.reduced_train, TrainRef::Number(202));
        assert_eq!(d.suggested_speed, 60);
        assert_eq!(d.prediction, 0);
        assert_eq!(d.confidence, 95.0);
        match d.basis {
            DecisionBasis::Heuristic(a) => {
                assert!((a.priority_score - 111.25).abs() < 1e-9);
                assert!((a.affected_score - 57.5).abs() < 1e-9);
                assert!(!a.tie);
            }
            other => panic!("expected heuristic basis, got {other:?}"),
        }
    }

    #[test]
    fn equal_levels_affected_wins_holds_priority_train() {
        let req = request(json!({
            "priority_train_level": 1,
            "affected_train_level": 1,
            "priority_train_passengers": 100,
            "affected_train_passengers": 700
        }));
        let d = engine().decide(&req).unwrap();
        assert_eq!(d.action, Action::HoldTrain);
        assert_eq!(d.priority_train, TrainRef::Number(202));
        assert_eq!(d.reduced_train, TrainRef::Number(101));
        assert_eq!(d.suggested_speed, 0);
        assert_eq!(d.prediction, 1);
    }

    #[test]
    fn exact_tie_keeps_named_priority_train() {
        let req = request(json!({"priority_train_level": 3, "affected_train_level": 3}));
        let d = engine().decide(&req).unwrap();
        assert_eq!(d.action, Action::ReduceSpeed);
        assert_eq!(d.priority_train, TrainRef::Number(101));
        assert_eq!(d.confidence, 70.0);
        assert!(matches!(d.basis, DecisionBasis::Heuristic(a) if a.tie));
    }

    #[test]
    fn overflowing_score_is_rejected_not_tied() {
        let req = request(json!({
            "priority_train_level": 2,
            "affected_train_level": 2,
            "passengers": 1e308,
            "train_capacity": 1e-300
        }));
        let err = engine().decide(&req).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("priority_train_passengers"));

        // One side overflowing is enough
        let req = request(json!({
            "priority_train_level": 2,
            "affected_train_level": 2,
            "affected_train_passengers": 1e308,
            "affected_train_capacity": 1e-300
        }));
        let err = engine().decide(&req).unwrap_err();
        assert!(err.to_string().contains("affected_train_passengers"));
    }

    #[test]
    fn equal_priority_path_needs_no_model() {
        let engine = DecisionEngine::from_config(&ArbiterConfig::default(), None);
        let req = request(json!({"priority_train_level": 3, "affected_train_level": 3}));
        assert!(engine.decide(&req).is_ok());
    }

    #[test]
    fn classifier_class_zero_reduces_affected() {
        let d = engine().decide(&request(json!({}))).unwrap();
        assert_eq!(d.action, Action::ReduceSpeed);
        assert_eq!(d.suggested_speed, 60);
        assert_eq!(d.priority_train, TrainRef::Number(101));
        assert_eq!(d.reduced_train, TrainRef::Number(202));
        assert!((d.confidence - 80.0).abs() < 1e-9);
    }

    #[test]
    fn classifier_class_one_holds_affected() {
        let d = engine().decide(&request(json!({"distance_km": 900}))).unwrap();
        assert_eq!(d.action, Action::HoldTrain);
        assert_eq!(d.suggested_speed, 0);
        assert_eq!(d.prediction, 1);
        assert_eq!(d.reduced_train, TrainRef::Number(202));
        assert!((d.confidence - 90.0).abs() < 1e-9);
    }

    #[test]
    fn unequal_levels_go_to_classifier() {
        let req = request(json!({"priority_train_level": 1, "affected_train_level": 2}));
        let d = engine().decide(&req).unwrap();
        assert!(matches!(d.basis, DecisionBasis::Classifier { .. }));
    }

    #[test]
    fn missing_model_is_model_error() {
        let engine = DecisionEngine::from_config(&ArbiterConfig::default(), None);
        let err = engine.decide(&request(json!({}))).unwrap_err();
        assert!(matches!(err, ArbiterError::Model(ModelError::Unavailable)));
    }

    struct Broken;

    impl Classifier for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn predict_proba(&self, _features: &FeatureVector) -> Result<[f64; 2], ModelError> {
            Ok([0.7, 0.7])
        }
    }

    #[test]
    fn malformed_output_is_model_error() {
        let engine = DecisionEngine::from_config(&ArbiterConfig::default(), Some(Arc::new(Broken)));
        let err = engine.decide(&request(json!({}))).unwrap_err();
        assert!(matches!(err, ArbiterError::Model(ModelError::MalformedOutput(_))));
    }
}
