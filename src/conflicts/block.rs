//! Same-block conflicts: opposing trains entering one block within its
//! clearance time.

use super::{Conflict, ConflictKind, Severity};
use crate::config::DetectionConfig;
use crate::types::ScheduledTrain;

pub fn detect_block_conflicts(rows: &[ScheduledTrain], config: &DetectionConfig) -> Vec<Conflict> {
    let mut conflicts = Vec::new();

    for (i, a) in rows.iter().enumerate() {
        let Some((block_a, dir_a, ta)) = movement(a) else {
            continue;
        };
        for b in &rows[i + 1..] {
            let Some((block_b, dir_b, tb)) = movement(b) else {
                continue;
            };
            if block_a != block_b || dir_a == dir_b {
                continue;
            }

            let gap = (ta - tb).abs();
            let clearance = a.clearance_min;
            tracing::trace!(a = a.id(), b = b.id(), block = block_a, gap, clearance, "Opposing pair");
            if gap > clearance {
                continue;
            }

            conflicts.push(Conflict {
                kind: ConflictKind::SameBlock,
                location: block_a.to_string(),
                first_train: a.id(),
                second_train: b.id(),
                gap_min: gap,
                clearance_min: clearance,
                severity: Severity::from_gap(
                    gap,
                    clearance,
                    config.block_critical_ratio,
                    config.block_high_ratio,
                ),
                message: format!(
                    "Opposing trains {} and {} in block {block_a}",
                    a.id(),
                    b.id()
                ),
            });
        }
    }

    conflicts
}

/// Block, direction and effective arrival, when the row has all three.
fn movement(row: &ScheduledTrain) -> Option<(&str, crate::types::Direction, f64)> {
    Some((
        row.block_id.as_deref()?,
        row.approach_dir?,
        row.effective_arrival_min()?,
    ))
}
