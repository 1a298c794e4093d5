//! Trip types: TripObservation (raw per-train attributes) and FeatureVector
//! (the 7-feature classifier input)

use serde::{Deserialize, Serialize};

/// Raw trip attributes for one train in one conflict evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TripObservation {
    pub passengers: f64,
    pub distance_km: f64,
    pub travel_time_hr: f64,
    pub train_capacity: f64,
    /// 0 or 1
    pub is_peak_hour: u8,
}

/// Feature names in model column order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "passengers",
    "distance_km",
    "travel_time_hr",
    "load_ratio",
    "avg_speed",
    "distance_type",
    "is_peak_hour",
];

/// Model input dimensionality.
pub const FEATURE_COUNT: usize = 7;

/// Trip length bucket used as a categorical feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DistanceType {
    /// Under 150 km
    Short = 0,
    /// 150 km up to (not including) 400 km
    Medium = 1,
    /// 400 km and beyond
    Long = 2,
}

/// Derived classifier input. Built once from a [`TripObservation`], never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureVector {
    pub passengers: f64,
    pub distance_km: f64,
    pub travel_time_hr: f64,
    pub load_ratio: f64,
    /// km/h
    pub avg_speed: f64,
    pub distance_type: DistanceType,
    pub is_peak_hour: u8,
}

impl FeatureVector {
    /// Values in [`FEATURE_NAMES`] order.
    pub fn as_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.passengers,
            self.distance_km,
            self.travel_time_hr,
            self.load_ratio,
            self.avg_speed,
            f64::from(self.distance_type as u8),
            f64::from(self.is_peak_hour),
        ]
    }
}
