//! Arbiter - one decision, end to end
//!
//! ```text
//! raw payload ─► ConflictRequest ─► (schedule lookup) ─► DecisionEngine ─► DecisionResponse
//!                  validate             enrich             path A | B          format
//! ```
//!
//! The arbiter owns the read-only handles (engine with its classifier, the
//! optional schedule table, lookup policy) and is shared as `Arc<Arbiter>` by
//! the decision service. Nothing in it mutates after construction.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::classifier::{Classifier, DecisionForest};
use crate::config::{ArbiterConfig, DetectionConfig, ScheduleConfig};
use crate::conflicts::{detect_all, Conflict};
use crate::engine::DecisionEngine;
use crate::error::{ArbiterError, ScheduleError};
use crate::formatter::{format_decision, DecisionResponse};
use crate::schedule::ScheduleTable;
use crate::types::{ConflictRequest, TrainDetails, TrainRecord, TrainRef};

pub struct Arbiter {
    engine: DecisionEngine,
    schedule: Option<ScheduleTable>,
    schedule_policy: ScheduleConfig,
    detection: DetectionConfig,
}

impl Arbiter {
    pub fn new(engine: DecisionEngine, schedule: Option<ScheduleTable>, config: &ArbiterConfig) -> Self {
        Self {
            engine,
            schedule,
            schedule_policy: config.schedule.clone(),
            detection: config.detection.clone(),
        }
    }

    /// Load the artifacts named in the config.
    ///
    /// A classifier artifact that fails to load is logged and left out: the
    /// equal-priority path still works, and classifier decisions fail with a
    /// model error. A configured schedule that fails to load is fatal.
    pub fn load(config: &ArbiterConfig) -> Result<Self, ScheduleError> {
        let model_path = &config.artifacts.model_path;
        let classifier: Option<Arc<dyn Classifier>> = match DecisionForest::load(model_path) {
            Ok(forest) => Some(Arc::new(forest)),
            Err(e) => {
                warn!(path = %model_path.display(), error = %e, "Classifier artifact unavailable");
                None
            }
        };

        let schedule = config
            .artifacts
            .schedule_path
            .as_ref()
            .map(|path| ScheduleTable::load(path, &config.schedule))
            .transpose()?;

        let engine = DecisionEngine::from_config(config, classifier);
        info!(
            classifier = engine.classifier_name().unwrap_or("none"),
            schedule_trains = schedule.as_ref().map_or(0, ScheduleTable::len),
            "Arbiter ready"
        );
        Ok(Self::new(engine, schedule, config))
    }

    pub fn classifier_name(&self) -> Option<&str> {
        self.engine.classifier_name()
    }

    pub fn schedule(&self) -> Option<&ScheduleTable> {
        self.schedule.as_ref()
    }

    /// Arbitrate one raw JSON payload.
    pub fn evaluate(&self, raw: &str) -> Result<DecisionResponse, ArbiterError> {
        let request = ConflictRequest::from_json_str(raw)?;
        self.evaluate_request(&request)
    }

    pub fn evaluate_value(&self, payload: &serde_json::Value) -> Result<DecisionResponse, ArbiterError> {
        let request = ConflictRequest::from_value(payload)?;
        self.evaluate_request(&request)
    }

    pub fn evaluate_request(&self, request: &ConflictRequest) -> Result<DecisionResponse, ArbiterError> {
        let records = self.lookup_pair(request)?;
        let decision = self.engine.decide(request)?;

        // Equal-priority scoring may hand precedence to the affected train
        let train_details = records.map(|(named_priority, named_affected)| {
            if decision.priority_train == request.priority_train {
                TrainDetails {
                    priority_train: named_priority,
                    reduced_train: named_affected,
                }
            } else {
                TrainDetails {
                    priority_train: named_affected,
                    reduced_train: named_priority,
                }
            }
        });

        debug!(
            decision = %decision.action,
            priority = %decision.priority_train,
            reduced = %decision.reduced_train,
            confidence = decision.confidence,
            "Decision made"
        );
        Ok(format_decision(&decision, train_details))
    }

    /// Records of both named trains, when a schedule is loaded.
    ///
    /// Unknown trains fail the decision only under `require_known_trains`.
    fn lookup_pair(
        &self,
        request: &ConflictRequest,
    ) -> Result<Option<(TrainRecord, TrainRecord)>, ArbiterError> {
        let Some(table) = &self.schedule else {
            return Ok(None);
        };
        let pair = table
            .lookup(&request.priority_train)
            .and_then(|p| Ok((p.clone(), table.lookup(&request.affected_train)?.clone())));
        match pair {
            Ok(pair) => Ok(Some(pair)),
            Err(e) if self.schedule_policy.require_known_trains => Err(e),
            Err(e) => {
                warn!(error = %e, "Train details omitted");
                Ok(None)
            }
        }
    }

    /// Look up one train in the schedule.
    pub fn lookup(&self, train: &TrainRef) -> Result<&TrainRecord, ArbiterError> {
        self.schedule
            .as_ref()
            .ok_or(ArbiterError::ScheduleUnavailable)?
            .lookup(train)
    }

    /// Detect conflicts across the loaded schedule.
    pub fn scan(&self) -> Result<Vec<Conflict>, ArbiterError> {
        let table = self.schedule.as_ref().ok_or(ArbiterError::ScheduleUnavailable)?;
        Ok(detect_all(table, &self.detection))
    }

    /// Arbitrate a detected conflict.
    pub fn resolve(&self, conflict: &Conflict) -> Result<DecisionResponse, ArbiterError> {
        let table = self.schedule.as_ref().ok_or(ArbiterError::ScheduleUnavailable)?;
        let request = conflict.to_request(table, &self.schedule_policy)?;
        self.evaluate_request(&request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{ForestArtifact, Tree};
    use crate::error::ErrorKind;
    use crate::types::Action;
    use serde_json::json;

    const CSV: &str = "\
train_id,priority,max_speed,train_type,block_id,approach_dir,arrival_time,delay,level,passengers,distance_km,travel_time_hr
101,1,110,Express,B1,UP,08:00,0,2,100,300,5
202,2,90,Passenger,B1,DOWN,08:01,0,2,700,300,5
";

    fn arbiter(config: &ArbiterConfig, with_schedule: bool) -> Arbiter {
        let forest = DecisionForest::from_artifact(ForestArtifact::new(vec![Tree::stump(
            1,
            400.0,
            [0.8, 0.2],
            [0.1, 0.9],
        )]))
        .unwrap();
        let engine = DecisionEngine::from_config(config, Some(Arc::new(forest)));
        let schedule = with_schedule
            .then(|| ScheduleTable::from_csv_str(CSV, &config.schedule).unwrap());
        Arbiter::new(engine, schedule, config)
    }

    fn payload(priority: i64, affected: i64) -> serde_json::Value {
        json!({
            "priority_train": priority,
            "affected_train": affected,
            "passengers": 400,
            "distance_km": 300,
            "travel_time_hr": 5,
            "train_capacity": 800,
            "is_peak_hour": 0
        })
    }

    #[test]
    fn attaches_train_details() {
        let a = arbiter(&ArbiterConfig::default(), true);
        let out = a.evaluate_value(&payload(101, 202)).unwrap();
        let details = out.train_details.unwrap();
        assert_eq!(details.priority_train.id, 101);
        assert_eq!(details.reduced_train.train_type, "Passenger");
    }

    #[test]
    fn unknown_train_omits_details_by_default() {
        let a = arbiter(&ArbiterConfig::default(), true);
        let out = a.evaluate_value(&payload(101, 999)).unwrap();
        assert!(out.train_details.is_none());
    }

    #[test]
    fn unknown_train_fails_when_required() {
        let mut config = ArbiterConfig::default();
        config.schedule.require_known_trains = true;
        let a = arbiter(&config, true);
        let err = a.evaluate_value(&payload(101, 999)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Lookup);
        assert_eq!(err.to_string(), "Train ID not found in schedule: 999");
    }

    #[test]
    fn no_schedule_means_no_details() {
        let a = arbiter(&ArbiterConfig::default(), false);
        let out = a.evaluate(&payload(1, 2).to_string()).unwrap();
        assert!(out.train_details.is_none());
        assert!(matches!(a.scan(), Err(ArbiterError::ScheduleUnavailable)));
        assert!(a.lookup(&TrainRef::from(1)).is_err());
    }

    #[test]
    fn scanned_conflict_resolves_with_swapped_details() {
        let a = arbiter(&ArbiterConfig::default(), true);
        let conflicts = a.scan().unwrap();
        assert_eq!(conflicts.len(), 1);

        // Equal levels; 202 carries far more passengers and wins on score
        let out = a.resolve(&conflicts[0]).unwrap();
        assert_eq!(out.decision, Action::HoldTrain);
        assert_eq!(out.priority_train, TrainRef::Number(202));
        let details = out.train_details.unwrap();
        assert_eq!(details.priority_train.id, 202);
        assert_eq!(details.reduced_train.id, 101);
    }

    #[test]
    fn parse_errors_surface_before_lookup() {
        let a = arbiter(&ArbiterConfig::default(), true);
        let err = a.evaluate("not json").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InputParse);
    }
}
