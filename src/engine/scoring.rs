//! Equal-priority scoring
//!
//! When both trains declare the same priority level, precedence goes to the
//! train with the higher score:
//!
//! ```text
//! score = passengers * passenger_weight
//!       + load_ratio * load_ratio_weight
//!       + distance_bonus(distance)
//!       + near_completion_bonus(distance)
//! ```

use crate::config::ScoringConfig;
use crate::features::load_ratio;
use crate::types::TripObservation;

/// Long-haul bonus above `long_haul_km`, medium above `medium_haul_km`,
/// short otherwise (both thresholds exclusive).
pub fn distance_bonus(distance_km: f64, cfg: &ScoringConfig) -> f64 {
    if distance_km > cfg.long_haul_km {
        cfg.long_haul_bonus
    } else if distance_km > cfg.medium_haul_km {
        cfg.medium_haul_bonus
    } else {
        cfg.short_haul_bonus
    }
}

/// Bonus for trips shorter than `near_completion_km`.
pub fn near_completion_bonus(distance_km: f64, cfg: &ScoringConfig) -> f64 {
    if distance_km < cfg.near_completion_km {
        cfg.near_completion_bonus
    } else {
        0.0
    }
}

pub fn score_train(trip: &TripObservation, cfg: &ScoringConfig) -> f64 {
    trip.passengers * cfg.passenger_weight
        + load_ratio(trip.passengers, trip.train_capacity) * cfg.load_ratio_weight
        + distance_bonus(trip.distance_km, cfg)
        + near_completion_bonus(trip.distance_km, cfg)
}

/// `min(cap, base + |a - b| / 2)`, clamped to `[0, cap]`.
pub fn confidence(score_a: f64, score_b: f64, cfg: &ScoringConfig) -> f64 {
    let raw = cfg.confidence_base + (score_a - score_b).abs() / 2.0;
    raw.min(cfg.confidence_cap).clamp(0.0, cfg.confidence_cap.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trip(passengers: f64, distance_km: f64, capacity: f64) -> TripObservation {
        TripObservation {
            passengers,
            distance_km,
            travel_time_hr: 5.0,
            train_capacity: capacity,
            is_peak_hour: 0,
        }
    }

    #[test]
    fn distance_bonus_thresholds_are_exclusive() {
        let cfg = ScoringConfig::default();
        assert_eq!(distance_bonus(400.0, &cfg), 20.0);
        assert_eq!(distance_bonus(400.1, &cfg), 30.0);
        assert_eq!(distance_bonus(200.0, &cfg), 10.0);
        assert_eq!(distance_bonus(200.1, &cfg), 20.0);
        assert_eq!(distance_bonus(0.0, &cfg), 10.0);
    }

    #[test]
    fn near_completion_below_150() {
        let cfg = ScoringConfig::default();
        assert_eq!(near_completion_bonus(149.9, &cfg), 15.0);
        assert_eq!(near_completion_bonus(150.0, &cfg), 0.0);
    }

    #[test]
    fn scores_for_long_and_short_trip() {
        let cfg = ScoringConfig::default();
        // 50 + 31.25 + 30
        assert!((score_train(&trip(500.0, 450.0, 800.0), &cfg) - 111.25).abs() < 1e-9);
        // 20 + 12.5 + 10 + 15
        assert!((score_train(&trip(200.0, 100.0, 800.0), &cfg) - 57.5).abs() < 1e-9);
    }

    #[test]
    fn zero_capacity_scores_without_load_term() {
        let cfg = ScoringConfig::default();
        assert!((score_train(&trip(100.0, 300.0, 0.0), &cfg) - 30.0).abs() < 1e-9);
    }

    #[test]
    fn confidence_is_capped() {
        let cfg = ScoringConfig::default();
        assert_eq!(confidence(10.0, 10.0, &cfg), 70.0);
        assert_eq!(confidence(111.25, 57.5, &cfg), 95.0);
        assert_eq!(confidence(20.0, 30.0, &cfg), 75.0);
        assert_eq!(confidence(0.0, 1.0e9, &cfg), 95.0);
    }
}
