//! Train identity types: TrainRef, TrainRecord, ScheduledTrain, Direction

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::TripObservation;

/// A train identifier as it arrived in the payload.
///
/// The external contract accepts both integers and strings, and the result
/// echoes the identifier back in the same JSON type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TrainRef {
    Number(i64),
    Text(String),
}

impl TrainRef {
    /// Integer key used by the reference table, if the identifier has one.
    pub fn as_table_id(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for TrainRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for TrainRef {
    fn from(id: i64) -> Self {
        Self::Number(id)
    }
}

impl From<&str> for TrainRef {
    fn from(id: &str) -> Self {
        Self::Text(id.to_string())
    }
}

/// Static attributes of a train from the reference table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainRecord {
    pub id: i64,
    /// Priority class from the timetable (not the declared conflict level)
    pub priority: i64,
    /// Line speed limit (km/h)
    pub max_speed: i64,
    pub train_type: String,
}

/// Direction a train approaches a block from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "UP" => Some(Self::Up),
            "DOWN" | "DN" => Some(Self::Down),
            _ => None,
        }
    }
}

/// One reference-table row: the record plus the optional movement and trip
/// columns used by conflict detection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduledTrain {
    pub record: TrainRecord,
    pub name: Option<String>,
    pub block_id: Option<String>,
    pub approach_dir: Option<Direction>,
    pub arrival_time: Option<NaiveTime>,
    /// Running delay (minutes)
    pub delay_min: f64,
    pub clearance_min: f64,
    pub next_junction: Option<String>,
    /// Distance still to run before the junction (km)
    pub distance_to_junction_km: f64,
    pub junction_clearance_min: f64,
    /// Declared conflict priority level
    pub level: Option<i64>,
    pub trip: Option<TripObservation>,
}

impl ScheduledTrain {
    /// Row with only the four reference columns set.
    pub fn from_record(record: TrainRecord) -> Self {
        Self {
            record,
            name: None,
            block_id: None,
            approach_dir: None,
            arrival_time: None,
            delay_min: 0.0,
            clearance_min: crate::config::defaults::DEFAULT_CLEARANCE_MIN,
            next_junction: None,
            distance_to_junction_km: 0.0,
            junction_clearance_min: crate::config::defaults::DEFAULT_JUNCTION_CLEARANCE_MIN,
            level: None,
            trip: None,
        }
    }

    pub const fn id(&self) -> i64 {
        self.record.id
    }

    /// Scheduled arrival plus running delay, in minutes since midnight.
    pub fn effective_arrival_min(&self) -> Option<f64> {
        self.arrival_time
            .map(|t| f64::from(t.num_seconds_from_midnight()) / 60.0 + self.delay_min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64) -> TrainRecord {
        TrainRecord {
            id,
            priority: 2,
            max_speed: 110,
            train_type: "Express".to_string(),
        }
    }

    #[test]
    fn train_ref_round_trips_json_type() {
        let n: TrainRef = serde_json::from_str("12951").unwrap();
        assert_eq!(n, TrainRef::Number(12951));
        let s: TrainRef = serde_json::from_str("\"12951A\"").unwrap();
        assert_eq!(s, TrainRef::Text("12951A".to_string()));
        assert_eq!(serde_json::to_string(&n).unwrap(), "12951");
    }

    #[test]
    fn table_id_parses_numeric_strings_only() {
        assert_eq!(TrainRef::from(" 42 ").as_table_id(), Some(42));
        assert_eq!(TrainRef::from("EXP-1").as_table_id(), None);
        assert_eq!(TrainRef::Number(7).as_table_id(), Some(7));
    }

    #[test]
    fn direction_parsing() {
        assert_eq!(Direction::parse("up"), Some(Direction::Up));
        assert_eq!(Direction::parse(" DOWN "), Some(Direction::Down));
        assert_eq!(Direction::parse("sideways"), None);
    }

    #[test]
    fn effective_arrival_includes_delay() {
        let mut row = ScheduledTrain::from_record(record(1));
        assert_eq!(row.effective_arrival_min(), None);
        row.arrival_time = NaiveTime::from_hms_opt(6, 30, 0);
        row.delay_min = 4.0;
        assert_eq!(row.effective_arrival_min(), Some(394.0));
    }
}
