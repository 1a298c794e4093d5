//! ConflictRequest: the validated decision payload
//!
//! Parsing is the only fallible step before the engine runs. Required fields
//! are checked in a fixed order so the first missing one is reported, then
//! every value is coerced (numbers, numeric strings, booleans for the peak
//! flag) and range-checked.

use serde_json::{json, Map, Value};

use super::{TrainRef, TripObservation};
use crate::error::ArbiterError;

/// Required payload keys, in the order they are checked.
pub const REQUIRED_FIELDS: [&str; 7] = [
    "priority_train",
    "affected_train",
    "passengers",
    "distance_km",
    "travel_time_hr",
    "train_capacity",
    "is_peak_hour",
];

/// Which of the two named trains a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Priority,
    Affected,
}

impl Side {
    pub(crate) const fn prefix(self) -> &'static str {
        match self {
            Self::Priority => "priority_train",
            Self::Affected => "affected_train",
        }
    }
}

/// Per-train values that replace the shared trip fields in heuristic scoring.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrainOverrides {
    pub passengers: Option<f64>,
    pub distance_km: Option<f64>,
    pub travel_time_hr: Option<f64>,
    pub train_capacity: Option<f64>,
}

impl TrainOverrides {
    fn from_map(map: &Map<String, Value>, side: Side) -> Result<Self, ArbiterError> {
        let p = side.prefix();
        Ok(Self {
            passengers: optional_quantity(map, &format!("{p}_passengers"))?,
            distance_km: optional_quantity(map, &format!("{p}_distance"))?,
            travel_time_hr: optional_quantity(map, &format!("{p}_travel_time"))?,
            train_capacity: optional_quantity(map, &format!("{p}_capacity"))?,
        })
    }

    fn write_into(&self, map: &mut Map<String, Value>, side: Side) {
        let p = side.prefix();
        let fields = [
            ("passengers", self.passengers),
            ("distance", self.distance_km),
            ("travel_time", self.travel_time_hr),
            ("capacity", self.train_capacity),
        ];
        for (suffix, value) in fields {
            if let Some(v) = value {
                map.insert(format!("{p}_{suffix}"), json!(v));
            }
        }
    }
}

/// A validated request to arbitrate one two-train conflict.
#[derive(Debug, Clone, PartialEq)]
pub struct ConflictRequest {
    pub priority_train: TrainRef,
    pub affected_train: TrainRef,
    /// Shared trip attributes (the classifier input)
    pub trip: TripObservation,
    pub priority_level: Option<i64>,
    pub affected_level: Option<i64>,
    pub priority_overrides: TrainOverrides,
    pub affected_overrides: TrainOverrides,
}

impl ConflictRequest {
    /// Parse a raw JSON payload.
    pub fn from_json_str(raw: &str) -> Result<Self, ArbiterError> {
        let value: Value =
            serde_json::from_str(raw).map_err(|e| ArbiterError::InputParse(e.to_string()))?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self, ArbiterError> {
        let map = value
            .as_object()
            .ok_or_else(|| ArbiterError::InputParse("expected a JSON object".to_string()))?;

        for field in REQUIRED_FIELDS {
            if matches!(map.get(field), None | Some(Value::Null)) {
                return Err(ArbiterError::MissingField(field.to_string()));
            }
        }

        let trip = TripObservation {
            passengers: required_quantity(map, "passengers")?,
            distance_km: required_quantity(map, "distance_km")?,
            travel_time_hr: required_quantity(map, "travel_time_hr")?,
            train_capacity: required_quantity(map, "train_capacity")?,
            is_peak_hour: peak_flag(map, "is_peak_hour")?,
        };

        Ok(Self {
            priority_train: train_ref(map, "priority_train")?,
            affected_train: train_ref(map, "affected_train")?,
            trip,
            priority_level: optional_level(map, "priority_train_level")?,
            affected_level: optional_level(map, "affected_train_level")?,
            priority_overrides: TrainOverrides::from_map(map, Side::Priority)?,
            affected_overrides: TrainOverrides::from_map(map, Side::Affected)?,
        })
    }

    /// The shared level when both levels are declared and equal.
    pub fn shared_level(&self) -> Option<i64> {
        match (self.priority_level, self.affected_level) {
            (Some(p), Some(a)) if p == a => Some(p),
            _ => None,
        }
    }

    /// Trip attributes for one train: its overrides over the shared fields.
    pub fn observation_for(&self, side: Side) -> TripObservation {
        let o = match side {
            Side::Priority => &self.priority_overrides,
            Side::Affected => &self.affected_overrides,
        };
        TripObservation {
            passengers: o.passengers.unwrap_or(self.trip.passengers),
            distance_km: o.distance_km.unwrap_or(self.trip.distance_km),
            travel_time_hr: o.travel_time_hr.unwrap_or(self.trip.travel_time_hr),
            train_capacity: o.train_capacity.unwrap_or(self.trip.train_capacity),
            is_peak_hour: self.trip.is_peak_hour,
        }
    }

    /// Render back into the external payload shape.
    pub fn to_payload(&self) -> Value {
        let mut map = Map::new();
        map.insert("priority_train".into(), json!(self.priority_train));
        map.insert("affected_train".into(), json!(self.affected_train));
        map.insert("passengers".into(), json!(self.trip.passengers));
        map.insert("distance_km".into(), json!(self.trip.distance_km));
        map.insert("travel_time_hr".into(), json!(self.trip.travel_time_hr));
        map.insert("train_capacity".into(), json!(self.trip.train_capacity));
        map.insert("is_peak_hour".into(), json!(self.trip.is_peak_hour));
        if let Some(level) = self.priority_level {
            map.insert("priority_train_level".into(), json!(level));
        }
        if let Some(level) = self.affected_level {
            map.insert("affected_train_level".into(), json!(level));
        }
        self.priority_overrides.write_into(&mut map, Side::Priority);
        self.affected_overrides.write_into(&mut map, Side::Affected);
        Value::Object(map)
    }
}

// ============================================================================
// Field coercion
// ============================================================================

fn coerce_number(field: &str, value: &Value) -> Result<f64, ArbiterError> {
    let n = match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| ArbiterError::invalid(field, "number out of range"))?,
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| ArbiterError::invalid(field, format!("'{s}' is not numeric")))?,
        other => {
            return Err(ArbiterError::invalid(
                field,
                format!("expected a number, got {}", json_type(other)),
            ))
        }
    };
    if n.is_finite() {
        Ok(n)
    } else {
        Err(ArbiterError::invalid(field, "must be finite"))
    }
}

fn quantity(field: &str, value: &Value) -> Result<f64, ArbiterError> {
    let n = coerce_number(field, value)?;
    if n < 0.0 {
        return Err(ArbiterError::invalid(field, "must not be negative"));
    }
    Ok(n)
}

fn required_quantity(map: &Map<String, Value>, field: &str) -> Result<f64, ArbiterError> {
    match map.get(field) {
        Some(v) if !v.is_null() => quantity(field, v),
        _ => Err(ArbiterError::MissingField(field.to_string())),
    }
}

fn optional_quantity(map: &Map<String, Value>, field: &str) -> Result<Option<f64>, ArbiterError> {
    match map.get(field) {
        Some(v) if !v.is_null() => quantity(field, v).map(Some),
        _ => Ok(None),
    }
}

fn peak_flag(map: &Map<String, Value>, field: &str) -> Result<u8, ArbiterError> {
    let value = map
        .get(field)
        .ok_or_else(|| ArbiterError::MissingField(field.to_string()))?;
    if let Value::Bool(b) = value {
        return Ok(u8::from(*b));
    }
    let n = coerce_number(field, value)?;
    if n == 0.0 {
        Ok(0)
    } else if n == 1.0 {
        Ok(1)
    } else {
        Err(ArbiterError::invalid(field, format!("expected 0 or 1, got {n}")))
    }
}

fn integer(field: &str, value: &Value) -> Result<i64, ArbiterError> {
    if let Some(i) = value.as_i64() {
        return Ok(i);
    }
    let n = coerce_number(field, value)?;
    if n.fract() != 0.0 || n.abs() > 9.0e15 {
        return Err(ArbiterError::invalid(field, format!("expected an integer, got {n}")));
    }
    #[allow(clippy::cast_possible_truncation)]
    Ok(n as i64)
}

fn optional_level(map: &Map<String, Value>, field: &str) -> Result<Option<i64>, ArbiterError> {
    match map.get(field) {
        Some(v) if !v.is_null() => integer(field, v).map(Some),
        _ => Ok(None),
    }
}

fn train_ref(map: &Map<String, Value>, field: &str) -> Result<TrainRef, ArbiterError> {
    match map.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(TrainRef::Text(s.trim().to_string())),
        Some(Value::String(_)) => Err(ArbiterError::invalid(field, "train identifier is empty")),
        Some(v @ Value::Number(_)) => integer(field, v).map(TrainRef::Number),
        Some(Value::Null) | None => Err(ArbiterError::MissingField(field.to_string())),
        Some(other) => Err(ArbiterError::invalid(
            field,
            format!("expected a string or integer, got {}", json_type(other)),
        )),
    }
}

const fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
