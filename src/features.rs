//! Feature Builder
//!
//! Turns a [`TripObservation`] into the 7-feature vector the classifier was
//! fitted on. Pure and infallible: coercion of raw payload fields happens
//! before an observation exists (see [`crate::types::ConflictRequest`]).

use crate::types::{DistanceType, FeatureVector, TripObservation};

/// Lower bound of the medium-haul bucket (km).
pub const MEDIUM_HAUL_FROM_KM: f64 = 150.0;
/// Lower bound of the long-haul bucket (km).
pub const LONG_HAUL_FROM_KM: f64 = 400.0;

/// Bucket a trip distance: `<150 → Short`, `[150, 400) → Medium`, `≥400 → Long`.
pub fn distance_type(distance_km: f64) -> DistanceType {
    if distance_km < MEDIUM_HAUL_FROM_KM {
        DistanceType::Short
    } else if distance_km < LONG_HAUL_FROM_KM {
        DistanceType::Medium
    } else {
        DistanceType::Long
    }
}

/// Passengers per seat; 0 when capacity is 0.
pub fn load_ratio(passengers: f64, capacity: f64) -> f64 {
    guarded_ratio(passengers, capacity)
}

/// Average speed in km/h; 0 when travel time is 0.
pub fn avg_speed(distance_km: f64, travel_time_hr: f64) -> f64 {
    guarded_ratio(distance_km, travel_time_hr)
}

fn guarded_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

pub fn build_features(trip: &TripObservation) -> FeatureVector {
    FeatureVector {
        passengers: trip.passengers,
        distance_km: trip.distance_km,
        travel_time_hr: trip.travel_time_hr,
        load_ratio: load_ratio(trip.passengers, trip.train_capacity),
        avg_speed: avg_speed(trip.distance_km, trip.travel_time_hr),
        distance_type: distance_type(trip.distance_km),
        is_peak_hour: trip.is_peak_hour,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trip(passengers: f64, distance_km: f64, travel_time_hr: f64, capacity: f64) -> TripObservation {
        TripObservation {
            passengers,
            distance_km,
            travel_time_hr,
            train_capacity: capacity,
            is_peak_hour: 1,
        }
    }

    #[test]
    fn distance_buckets_at_breakpoints() {
        assert_eq!(distance_type(0.0), DistanceType::Short);
        assert_eq!(distance_type(149.999), DistanceType::Short);
        assert_eq!(distance_type(150.0), DistanceType::Medium);
        assert_eq!(distance_type(399.999), DistanceType::Medium);
        assert_eq!(distance_type(400.0), DistanceType::Long);
        assert_eq!(distance_type(2_500.0), DistanceType::Long);
    }

    #[test]
    fn distance_buckets_are_monotonic() {
        let mut previous = DistanceType::Short;
        for km in (0..1_000).map(|d| f64::from(d) * 0.75) {
            let bucket = distance_type(km);
            assert!(bucket >= previous, "bucket went down at {km} km");
            previous = bucket;
        }
    }

    #[test]
    fn zero_denominators_yield_zero() {
        let fv = build_features(&trip(500.0, 300.0, 0.0, 0.0));
        assert_eq!(fv.load_ratio, 0.0);
        assert_eq!(fv.avg_speed, 0.0);
        assert!(fv.as_array().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn ratios_and_column_order() {
        let fv = build_features(&trip(600.0, 450.0, 5.0, 800.0));
        assert_eq!(
            fv.as_array(),
            [600.0, 450.0, 5.0, 0.75, 90.0, 2.0, 1.0]
        );
    }
}
