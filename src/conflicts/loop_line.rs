//! Loop-line conflicts: a delayed train with a same-direction follower
//! closing up behind it inside the leader's clearance. The follower has to
//! be put into the loop.

use super::{Conflict, ConflictKind, Severity};
use crate::config::DetectionConfig;
use crate::types::ScheduledTrain;

pub fn detect_loop_line_conflicts(rows: &[ScheduledTrain], config: &DetectionConfig) -> Vec<Conflict> {
    let mut conflicts = Vec::new();

    for (i, lead) in rows.iter().enumerate() {
        if lead.delay_min <= 0.0 {
            continue;
        }
        let (Some(block), Some(dir), Some(t_lead)) = (
            lead.block_id.as_deref(),
            lead.approach_dir,
            lead.effective_arrival_min(),
        ) else {
            continue;
        };

        for (j, follow) in rows.iter().enumerate() {
            if i == j
                || follow.block_id.as_deref() != Some(block)
                || follow.approach_dir != Some(dir)
            {
                continue;
            }
            let Some(t_follow) = follow.effective_arrival_min() else {
                continue;
            };

            let gap = t_follow - t_lead;
            if gap <= 0.0 || gap > lead.clearance_min {
                continue;
            }

            conflicts.push(Conflict {
                kind: ConflictKind::LoopLine,
                location: block.to_string(),
                first_train: lead.id(),
                second_train: follow.id(),
                gap_min: gap,
                clearance_min: lead.clearance_min,
                severity: Severity::from_gap(
                    gap,
                    lead.clearance_min,
                    config.block_critical_ratio,
                    config.block_high_ratio,
                ),
                message: format!(
                    "Train {} must be held in loop line behind delayed train {}",
                    follow.id(),
                    lead.id()
                ),
            });
        }
    }

    conflicts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScheduleConfig;
    use crate::schedule::ScheduleTable;

    fn rows(csv_body: &str) -> Vec<ScheduledTrain> {
        let csv = format!(
            "train_id,priority,max_speed,train_type,block_id,approach_dir,arrival_time,delay\n{csv_body}"
        );
        ScheduleTable::from_csv_str(&csv, &ScheduleConfig::default())
            .unwrap()
            .rows()
            .to_vec()
    }

    #[test]
    fn follower_closing_on_delayed_leader() {
        // Leader effective 10:04, follower 10:06
        let rows = rows("1,1,100,A,B1,UP,10:00,4\n2,1,100,B,B1,UP,10:06,0\n");
        let c = detect_loop_line_conflicts(&rows, &DetectionConfig::default());
        assert_eq!(c.len(), 1);
        assert_eq!(c[0].kind, ConflictKind::LoopLine);
        assert_eq!((c[0].first_train, c[0].second_train), (1, 2));
        assert_eq!(c[0].gap_min, 2.0);
        assert_eq!(
            c[0].message,
            "Train 2 must be held in loop line behind delayed train 1"
        );
    }

    #[test]
    fn on_time_leader_is_not_a_conflict() {
        let rows = rows("1,1,100,A,B1,UP,10:00,0\n2,1,100,B,B1,UP,10:01,0\n");
        assert!(detect_loop_line_conflicts(&rows, &DetectionConfig::default()).is_empty());
    }

    #[test]
    fn follower_must_arrive_strictly_after() {
        let rows = rows("1,1,100,A,B1,UP,10:00,2\n2,1,100,B,B1,UP,10:02,0\n");
        assert!(detect_loop_line_conflicts(&rows, &DetectionConfig::default()).is_empty());
    }

    #[test]
    fn opposite_direction_is_left_to_block_detector() {
        let rows = rows("1,1,100,A,B1,UP,10:00,2\n2,1,100,B,B1,DOWN,10:03,0\n");
        assert!(detect_loop_line_conflicts(&rows, &DetectionConfig::default()).is_empty());
    }
}
