//! Header-driven CSV parsing for the reference table
//!
//! Columns are located by name, so extra columns and any column order are
//! accepted. Fields are split quote-aware (commas inside quotes, `""` escapes).

use chrono::NaiveTime;

use crate::config::ScheduleConfig;
use crate::error::ScheduleError;
use crate::types::{Direction, ScheduledTrain, TrainRecord, TripObservation};

/// Split a CSV line respecting quoted fields (handles commas inside quotes).
/// Returns owned strings because quoted fields need unquoting.
pub fn csv_split(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    fields.push(current);
    fields
}

/// Column indices resolved from the header row.
#[derive(Debug, Clone, Default)]
pub(super) struct ColumnMap {
    train_id: usize,
    priority: usize,
    max_speed: usize,
    train_type: usize,

    train_name: Option<usize>,
    block_id: Option<usize>,
    approach_dir: Option<usize>,
    arrival_time: Option<usize>,
    delay: Option<usize>,
    clearance_min: Option<usize>,
    next_junction: Option<usize>,
    distance_to_junction: Option<usize>,
    junction_clearance_min: Option<usize>,
    level: Option<usize>,

    passengers: Option<usize>,
    distance_km: Option<usize>,
    travel_time_hr: Option<usize>,
    train_capacity: Option<usize>,
    is_peak_hour: Option<usize>,
}

impl ColumnMap {
    pub(super) fn from_header(header: &str) -> Result<Self, ScheduleError> {
        let columns: Vec<String> = csv_split(header)
            .into_iter()
            .map(|c| c.trim().trim_start_matches('\u{feff}').to_ascii_lowercase())
            .collect();
        let find = |name: &str| columns.iter().position(|c| c == name);
        let require = |name: &'static str| find(name).ok_or(ScheduleError::MissingColumn(name));

        Ok(Self {
            train_id: require("train_id")?,
            priority: require("priority")?,
            max_speed: require("max_speed")?,
            train_type: require("train_type")?,
            train_name: find("train_name"),
            block_id: find("block_id"),
            approach_dir: find("approach_dir"),
            arrival_time: find("arrival_time"),
            delay: find("delay"),
            clearance_min: find("clearance_min"),
            next_junction: find("next_junction"),
            distance_to_junction: find("distance_to_junction"),
            junction_clearance_min: find("junction_clearance_min"),
            level: find("level"),
            passengers: find("passengers"),
            distance_km: find("distance_km"),
            travel_time_hr: find("travel_time_hr"),
            train_capacity: find("train_capacity"),
            is_peak_hour: find("is_peak_hour"),
        })
    }

    /// Names of the optional columns present, for load logging.
    pub(super) fn optional_summary(&self) -> String {
        let named = [
            ("train_name", self.train_name),
            ("block_id", self.block_id),
            ("approach_dir", self.approach_dir),
            ("arrival_time", self.arrival_time),
            ("delay", self.delay),
            ("clearance_min", self.clearance_min),
            ("next_junction", self.next_junction),
            ("distance_to_junction", self.distance_to_junction),
            ("junction_clearance_min", self.junction_clearance_min),
            ("level", self.level),
            ("passengers", self.passengers),
            ("distance_km", self.distance_km),
            ("travel_time_hr", self.travel_time_hr),
            ("train_capacity", self.train_capacity),
            ("is_peak_hour", self.is_peak_hour),
        ];
        let present: Vec<&str> = named
            .iter()
            .filter(|(_, idx)| idx.is_some())
            .map(|(name, _)| *name)
            .collect();
        if present.is_empty() {
            "none".to_string()
        } else {
            present.join(",")
        }
    }
}

/// One data row with its line number, for error reporting.
struct Row<'a> {
    fields: &'a [String],
    line: usize,
}

impl Row<'_> {
    fn text(&self, idx: Option<usize>) -> Option<&str> {
        idx.and_then(|i| self.fields.get(i))
            .map(|s| s.trim())
            .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("null"))
    }

    fn invalid(&self, column: &'static str, value: &str) -> ScheduleError {
        ScheduleError::InvalidValue {
            line: self.line,
            column,
            value: value.to_string(),
        }
    }

    fn required_int(&self, idx: usize, column: &'static str) -> Result<i64, ScheduleError> {
        let raw = self.text(Some(idx)).ok_or_else(|| self.invalid(column, ""))?;
        raw.parse().map_err(|_| self.invalid(column, raw))
    }

    fn optional_int(&self, idx: Option<usize>, column: &'static str) -> Result<Option<i64>, ScheduleError> {
        self.text(idx)
            .map(|raw| raw.parse().map_err(|_| self.invalid(column, raw)))
            .transpose()
    }

    /// Non-negative finite number.
    fn optional_quantity(&self, idx: Option<usize>, column: &'static str) -> Result<Option<f64>, ScheduleError> {
        self.text(idx)
            .map(|raw| match raw.parse::<f64>() {
                Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
                _ => Err(self.invalid(column, raw)),
            })
            .transpose()
    }

    fn optional_string(&self, idx: Option<usize>) -> Option<String> {
        self.text(idx).map(str::to_string)
    }
}

/// Parse `HH:MM` (or `HH:MM:SS`).
fn parse_clock(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
}

pub(super) fn parse_row(
    fields: &[String],
    cols: &ColumnMap,
    config: &ScheduleConfig,
    line: usize,
) -> Result<ScheduledTrain, ScheduleError> {
    let row = Row { fields, line };

    let record = TrainRecord {
        id: row.required_int(cols.train_id, "train_id")?,
        priority: row.required_int(cols.priority, "priority")?,
        max_speed: row.required_int(cols.max_speed, "max_speed")?,
        train_type: row
            .text(Some(cols.train_type))
            .ok_or_else(|| row.invalid("train_type", ""))?
            .to_string(),
    };

    let approach_dir = row
        .text(cols.approach_dir)
        .map(|raw| Direction::parse(raw).ok_or_else(|| row.invalid("approach_dir", raw)))
        .transpose()?;
    let arrival_time = row
        .text(cols.arrival_time)
        .map(|raw| parse_clock(raw).ok_or_else(|| row.invalid("arrival_time", raw)))
        .transpose()?;

    // Delay may be negative (running early)
    let delay_min = row
        .text(cols.delay)
        .map(|raw| match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(row.invalid("delay", raw)),
        })
        .transpose()?
        .unwrap_or(0.0);

    // A row with any trip column gets a trip; the missing ones fall back
    // to the configured defaults
    let passengers = row.optional_quantity(cols.passengers, "passengers")?;
    let distance_km = row.optional_quantity(cols.distance_km, "distance_km")?;
    let travel_time_hr = row.optional_quantity(cols.travel_time_hr, "travel_time_hr")?;
    let train_capacity = row.optional_quantity(cols.train_capacity, "train_capacity")?;
    let is_peak_hour = match row.text(cols.is_peak_hour) {
        None | Some("0") => 0,
        Some("1") => 1,
        Some(raw) => return Err(row.invalid("is_peak_hour", raw)),
    };
    let trip = (passengers.is_some() || distance_km.is_some() || travel_time_hr.is_some()).then(|| {
        TripObservation {
            passengers: passengers.unwrap_or(config.default_passengers),
            distance_km: distance_km.unwrap_or(config.default_distance_km),
            travel_time_hr: travel_time_hr.unwrap_or(config.default_travel_time_hr),
            train_capacity: train_capacity.unwrap_or(config.default_capacity),
            is_peak_hour,
        }
    });

    Ok(ScheduledTrain {
        record,
        name: row.optional_string(cols.train_name),
        block_id: row.optional_string(cols.block_id),
        approach_dir,
        arrival_time,
        delay_min,
        clearance_min: row
            .optional_quantity(cols.clearance_min, "clearance_min")?
            .filter(|v| *v > 0.0)
            .unwrap_or(config.default_clearance_min),
        next_junction: row.optional_string(cols.next_junction),
        distance_to_junction_km: row
            .optional_quantity(cols.distance_to_junction, "distance_to_junction")?
            .unwrap_or(0.0),
        junction_clearance_min: row
            .optional_quantity(cols.junction_clearance_min, "junction_clearance_min")?
            .filter(|v| *v > 0.0)
            .unwrap_or(config.default_junction_clearance_min),
        level: row.optional_int(cols.level, "level")?,
        trip,
    })
}
