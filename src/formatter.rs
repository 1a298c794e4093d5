//! Action Formatter
//!
//! Maps an engine [`Decision`] onto the external result record: rounding,
//! reason text, and the per-path evidence block. No decision logic lives here.

use serde::Serialize;

use crate::types::{Action, Decision, DecisionBasis, TrainDetails, TrainRef};

/// Successful decision as emitted on stdout / by the service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionResponse {
    pub success: bool,
    pub decision: Action,
    pub priority_train: TrainRef,
    pub reduced_train: TrainRef,
    pub suggested_speed: u32,
    pub confidence: f64,
    pub reason: String,
    pub prediction: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probabilities: Option<ProbabilityReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority_analysis: Option<PriorityReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub train_details: Option<TrainDetails>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProbabilityReport {
    pub reduce_speed: f64,
    pub hold_train: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriorityReport {
    pub priority_level: i64,
    pub priority_train_score: f64,
    pub affected_train_score: f64,
    pub score_difference: f64,
    pub tie: bool,
}

/// The only shape a failure ever takes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureResponse {
    pub success: bool,
    pub error: String,
}

impl FailureResponse {
    pub fn new(error: impl std::fmt::Display) -> Self {
        Self {
            success: false,
            error: error.to_string(),
        }
    }
}

/// Round half away from zero to `places` decimals.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

pub fn format_decision(decision: &Decision, train_details: Option<TrainDetails>) -> DecisionResponse {
    let (probabilities, priority_analysis) = match &decision.basis {
        DecisionBasis::Heuristic(a) => (
            None,
            Some(PriorityReport {
                priority_level: a.level,
                priority_train_score: round_to(a.priority_score, 2),
                affected_train_score: round_to(a.affected_score, 2),
                score_difference: round_to(a.score_gap(), 2),
                tie: a.tie,
            }),
        ),
        DecisionBasis::Classifier { probabilities, .. } => (
            Some(ProbabilityReport {
                reduce_speed: round_to(probabilities.0[0], 4),
                hold_train: round_to(probabilities.0[1], 4),
            }),
            None,
        ),
    };

    DecisionResponse {
        success: true,
        decision: decision.action,
        priority_train: decision.priority_train.clone(),
        reduced_train: decision.reduced_train.clone(),
        suggested_speed: decision.suggested_speed,
        confidence: round_to(decision.confidence, 2),
        reason: reason(decision),
        prediction: decision.prediction,
        probabilities,
        priority_analysis,
        train_details,
    }
}

/// Human-readable justification.
pub fn reason(decision: &Decision) -> String {
    let kept = &decision.priority_train;
    let yielded = &decision.reduced_train;
    match (&decision.basis, decision.action) {
        (DecisionBasis::Heuristic(a), Action::ReduceSpeed) => format!(
            "Equal priority level {}: train {kept} scores {:.2} vs {:.2} for train {yielded}; \
             reduce speed of {yielded} to {} km/h",
            a.level, a.priority_score, a.affected_score, decision.suggested_speed
        ),
        // The named priority train lost on score and is the one held
        (DecisionBasis::Heuristic(a), Action::HoldTrain) => format!(
            "Equal priority level {}: train {yielded} scores {:.2} vs {:.2} for train {kept}; \
             hold train {yielded}",
            a.level, a.priority_score, a.affected_score
        ),
        (DecisionBasis::Classifier { .. }, Action::ReduceSpeed) => format!(
            "Model predicts low delay risk ({:.2}% confidence); train {kept} proceeds, \
             reduce {yielded} to {} km/h",
            decision.confidence, decision.suggested_speed
        ),
        (DecisionBasis::Classifier { .. }, Action::HoldTrain) => format!(
            "Model predicts high delay risk ({:.2}% confidence); hold train {yielded} \
             until {kept} clears the block",
            decision.confidence
        ),
    }
}
