//! Junction conflicts: trains converging on the same junction with less than
//! the junction clearance between consecutive arrivals.

use std::collections::BTreeMap;

use super::{Conflict, ConflictKind, Severity};
use crate::config::DetectionConfig;
use crate::types::ScheduledTrain;

/// Arrival at the next junction in minutes since midnight: effective block
/// arrival plus the run time over `distance_to_junction` at line speed.
///
/// A non-positive `max_speed` falls back to the configured approach speed.
pub fn junction_arrival_min(row: &ScheduledTrain, config: &DetectionConfig) -> Option<f64> {
    let base = row.effective_arrival_min()?;
    let speed = if row.record.max_speed > 0 {
        row.record.max_speed as f64
    } else {
        config.default_approach_speed_kmh
    };
    let run = if row.distance_to_junction_km > 0.0 {
        row.distance_to_junction_km / speed * 60.0
    } else {
        0.0
    };
    Some(base + run)
}

pub fn detect_junction_conflicts(rows: &[ScheduledTrain], config: &DetectionConfig) -> Vec<Conflict> {
    let mut by_junction: BTreeMap<&str, Vec<(&ScheduledTrain, f64)>> = BTreeMap::new();
    for row in rows {
        let Some(junction) = row.next_junction.as_deref() else {
            continue;
        };
        let Some(arrival) = junction_arrival_min(row, config) else {
            tracing::debug!(train = row.id(), junction, "No arrival time, skipping junction check");
            continue;
        };
        by_junction.entry(junction).or_default().push((row, arrival));
    }

    let mut conflicts = Vec::new();
    for (junction, mut arrivals) in by_junction {
        if arrivals.len() < 2 {
            continue;
        }
        arrivals.sort_by(|a, b| a.1.total_cmp(&b.1));

        for pair in arrivals.windows(2) {
            let (first, t1) = pair[0];
            let (second, t2) = pair[1];
            let gap = t2 - t1;
            let clearance = first.junction_clearance_min;
            if gap > clearance {
                continue;
            }

            conflicts.push(Conflict {
                kind: ConflictKind::Junction,
                location: junction.to_string(),
                first_train: first.id(),
                second_train: second.id(),
                gap_min: gap,
                clearance_min: clearance,
                severity: Severity::from_gap(
                    gap,
                    clearance,
                    config.junction_critical_ratio,
                    config.junction_high_ratio,
                ),
                message: format!(
                    "Trains {} and {} converging at junction {junction}",
                    first.id(),
                    second.id()
                ),
            });
        }
    }

    conflicts
}
