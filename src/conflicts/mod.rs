//! Conflict Detector
//!
//! Scans the schedule table for pairs of trains that will contend for the
//! same infrastructure:
//!
//! | Kind        | Condition                                                     |
//! |-------------|---------------------------------------------------------------|
//! | SAME_BLOCK  | same block, opposite approach, arrivals within clearance      |
//! | LOOP_LINE   | same block and direction, delayed leader, follower within it  |
//! | JUNCTION    | consecutive arrivals at one junction within its clearance     |
//!
//! Every detected conflict can be turned into a [`ConflictRequest`] for the
//! decision engine, with the first train of the pair as the priority train.

mod block;
mod junction;
mod loop_line;

pub use block::detect_block_conflicts;
pub use junction::{detect_junction_conflicts, junction_arrival_min};
pub use loop_line::detect_loop_line_conflicts;

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::config::{DetectionConfig, ScheduleConfig};
use crate::error::ArbiterError;
use crate::schedule::ScheduleTable;
use crate::types::ConflictRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictKind {
    SameBlock,
    LoopLine,
    Junction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Critical,
    High,
    Medium,
}

impl Severity {
    /// Band a gap by its fraction of the required clearance.
    pub fn from_gap(gap_min: f64, clearance_min: f64, critical_ratio: f64, high_ratio: f64) -> Self {
        if clearance_min <= 0.0 {
            return Self::Critical;
        }
        let ratio = gap_min / clearance_min;
        if ratio < critical_ratio {
            Self::Critical
        } else if ratio < high_ratio {
            Self::High
        } else {
            Self::Medium
        }
    }
}

/// One detected conflict between two schedule rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conflict {
    pub kind: ConflictKind,
    /// Block id or junction id
    pub location: String,
    /// Priority train when resolved (opposing train A, loop leader, first at junction)
    pub first_train: i64,
    pub second_train: i64,
    /// Minutes between the two arrivals
    pub gap_min: f64,
    pub clearance_min: f64,
    pub severity: Severity,
    pub message: String,
}

impl Conflict {
    /// Build the decision request for this conflict from the two rows'
    /// trip columns.
    ///
    /// The first train's trip is the shared observation and each train's own
    /// trip becomes its per-train override. A row without trip columns uses
    /// the `[schedule]` defaults. Levels are declared only when both rows
    /// carry a `level`.
    pub fn to_request(
        &self,
        table: &ScheduleTable,
        defaults: &ScheduleConfig,
    ) -> Result<ConflictRequest, ArbiterError> {
        let first = table
            .get(self.first_train)
            .ok_or_else(|| ArbiterError::NotFound(self.first_train.to_string()))?;
        let second = table
            .get(self.second_train)
            .ok_or_else(|| ArbiterError::NotFound(self.second_train.to_string()))?;
        let first_trip = first.trip.unwrap_or_else(|| defaults.default_trip());
        let second_trip = second.trip.unwrap_or_else(|| defaults.default_trip());

        let mut payload = Map::new();
        payload.insert("priority_train".into(), json!(first.id()));
        payload.insert("affected_train".into(), json!(second.id()));
        payload.insert("passengers".into(), json!(first_trip.passengers));
        payload.insert("distance_km".into(), json!(first_trip.distance_km));
        payload.insert("travel_time_hr".into(), json!(first_trip.travel_time_hr));
        payload.insert("train_capacity".into(), json!(first_trip.train_capacity));
        payload.insert("is_peak_hour".into(), json!(first_trip.is_peak_hour));
        if let (Some(p), Some(a)) = (first.level, second.level) {
            payload.insert("priority_train_level".into(), json!(p));
            payload.insert("affected_train_level".into(), json!(a));
        }
        for (prefix, trip) in [("priority_train", first_trip), ("affected_train", second_trip)] {
            payload.insert(format!("{prefix}_passengers"), json!(trip.passengers));
            payload.insert(format!("{prefix}_distance"), json!(trip.distance_km));
            payload.insert(format!("{prefix}_travel_time"), json!(trip.travel_time_hr));
            payload.insert(format!("{prefix}_capacity"), json!(trip.train_capacity));
        }

        ConflictRequest::from_value(&Value::Object(payload))
    }
}

/// Run all three detectors over the table.
pub fn detect_all(table: &ScheduleTable, config: &DetectionConfig) -> Vec<Conflict> {
    let rows = table.rows();
    let mut conflicts = detect_block_conflicts(rows, config);
    let block_count = conflicts.len();
    conflicts.extend(detect_loop_line_conflicts(rows, config));
    let loop_count = conflicts.len() - block_count;
    conflicts.extend(detect_junction_conflicts(rows, config));
    let junction_count = conflicts.len() - block_count - loop_count;

    tracing::info!(
        trains = rows.len(),
        same_block = block_count,
        loop_line = loop_count,
        junction = junction_count,
        "Conflict scan complete"
    );
    conflicts
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
train_id,priority,max_speed,train_type,block_id,approach_dir,arrival_time,delay,level,passengers,distance_km,travel_time_hr,train_capacity,is_peak_hour
101,1,110,Express,B1,UP,08:00,0,2,500,450,6,800,1
202,2,90,Passenger,B1,DOWN,08:01,0,2,200,100,2,,0
303,3,80,Goods,B9,UP,09:00,0,,,,,,
";

    fn table() -> ScheduleTable {
        ScheduleTable::from_csv_str(CSV, &ScheduleConfig::default()).unwrap()
    }

    #[test]
    fn severity_bands() {
        assert_eq!(Severity::from_gap(0.5, 3.0, 0.33, 0.67), Severity::Critical);
        assert_eq!(Severity::from_gap(1.5, 3.0, 0.33, 0.67), Severity::High);
        assert_eq!(Severity::from_gap(3.0, 3.0, 0.33, 0.67), Severity::Medium);
        assert_eq!(Severity::from_gap(1.0, 0.0, 0.33, 0.67), Severity::Critical);
    }

    #[test]
    fn detect_all_finds_opposing_pair() {
        let conflicts = detect_all(&table(), &DetectionConfig::default());
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind, ConflictKind::SameBlock);
        assert_eq!(conflicts[0].location, "B1");
    }

    #[test]
    fn conflict_converts_to_equal_priority_request() {
        let t = table();
        let conflict = &detect_all(&t, &DetectionConfig::default())[0];
        let req = conflict.to_request(&t, &ScheduleConfig::default()).unwrap();
        assert_eq!(req.shared_level(), Some(2));
        assert_eq!(req.trip.passengers, 500.0);
        assert_eq!(req.affected_overrides.passengers, Some(200.0));
        assert_eq!(req.affected_overrides.train_capacity, Some(800.0));
    }

    #[test]
    fn rows_without_trip_use_schedule_defaults() {
        let t = table();
        let conflict = Conflict {
            kind: ConflictKind::Junction,
            location: "J1".into(),
            first_train: 101,
            second_train: 303,
            gap_min: 1.0,
            clearance_min: 5.0,
            severity: Severity::Critical,
            message: String::new(),
        };
        let req = conflict.to_request(&t, &ScheduleConfig::default()).unwrap();
        assert_eq!(req.trip.passengers, 500.0);
        let o = &req.affected_overrides;
        assert_eq!(o.passengers, Some(600.0));
        assert_eq!(o.distance_km, Some(300.0));
        assert_eq!(o.travel_time_hr, Some(5.0));
        assert_eq!(o.train_capacity, Some(800.0));
        // 303 has no level, so the pair goes to the classifier
        assert_eq!(req.shared_level(), None);

        let defaults = ScheduleConfig {
            default_passengers: 250.0,
            ..ScheduleConfig::default()
        };
        let req = conflict.to_request(&t, &defaults).unwrap();
        assert_eq!(req.affected_overrides.passengers, Some(250.0));
    }

    #[test]
    fn serializes_wire_names() {
        let v = serde_json::to_value(ConflictKind::LoopLine).unwrap();
        assert_eq!(v, json!("LOOP_LINE"));
        let v = serde_json::to_value(Severity::Critical).unwrap();
        assert_eq!(v, json!("CRITICAL"));
    }
}
