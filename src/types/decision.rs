//! Decision types: Action, Decision and the per-path evidence attached to it

use serde::{Deserialize, Serialize};

use super::{TrainRecord, TrainRef};

/// What happens to the train that loses precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    ReduceSpeed,
    HoldTrain,
}

impl Action {
    /// Model class label for this action (0 = reduce, 1 = hold).
    pub const fn class_label(self) -> u8 {
        match self {
            Self::ReduceSpeed => 0,
            Self::HoldTrain => 1,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ReduceSpeed => "REDUCE_SPEED",
            Self::HoldTrain => "HOLD_TRAIN",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Heuristic scores from the equal-priority path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriorityAnalysis {
    /// The declared level both trains share
    pub level: i64,
    pub priority_score: f64,
    pub affected_score: f64,
    /// Scores were exactly equal and the tie-break applied
    pub tie: bool,
}

impl PriorityAnalysis {
    pub fn score_gap(&self) -> f64 {
        (self.priority_score - self.affected_score).abs()
    }
}

/// Class probabilities from the classifier path, `[p(reduce), p(hold)]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassProbabilities(pub [f64; 2]);

impl ClassProbabilities {
    pub fn max(&self) -> f64 {
        self.0[0].max(self.0[1])
    }
}

/// Which algorithm produced the decision, with its evidence.
#[derive(Debug, Clone, PartialEq)]
pub enum DecisionBasis {
    Heuristic(PriorityAnalysis),
    Classifier {
        model: String,
        probabilities: ClassProbabilities,
    },
}

/// Engine output for one conflict. Formatted once, then discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub action: Action,
    pub priority_train: TrainRef,
    pub reduced_train: TrainRef,
    /// km/h (0 = hold)
    pub suggested_speed: u32,
    /// 0-100
    pub confidence: f64,
    pub prediction: u8,
    pub basis: DecisionBasis,
}

/// Reference-table attributes of both trains, when a schedule is loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainDetails {
    pub priority_train: TrainRecord,
    pub reduced_train: TrainRecord,
}
