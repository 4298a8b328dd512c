//! Capacity-triggered eviction planning.
//!
//! The planner is a pure function from the current record set to the set of
//! ids to drop, independent of the index and of I/O: importance acts as a
//! "never forget" tag, recency ranks everything else.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::record::MemoryId;

/// Importance floor for the retained partition when the filter does not
/// configure one.
pub const DEFAULT_RETAIN_FLOOR: u8 = 3;

/// Fraction of capacity left occupied after a cleanup, as the ratio 7/10
/// with integer floor.
const TARGET_NUM: usize = 7;
const TARGET_DEN: usize = 10;

/// A record's eviction-relevant view.
#[derive(Debug, Clone, Copy)]
pub struct EvictionCandidate {
    pub id: MemoryId,
    pub importance: u8,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct EvictionPlan {
    pub evicted: HashSet<MemoryId>,
}

/// Whether the store has grown enough to warrant a cleanup.
#[must_use]
pub fn due(count: usize, max_memories: usize, clean_threshold: f64) -> bool {
    #[expect(clippy::cast_precision_loss)]
    let trigger = clean_threshold * max_memories as f64;
    #[expect(clippy::cast_precision_loss)]
    let reached = count as f64 >= trigger;
    reached
}

/// Decide which records survive a cleanup.
///
/// Records at or above `retain_floor` are kept unconditionally. The rest are
/// kept most-recent-first until the total reaches 70% of `max_memories`;
/// when the high-importance partition alone meets the target, no
/// low-importance record survives.
#[must_use]
pub fn plan(
    candidates: &[EvictionCandidate],
    max_memories: usize,
    retain_floor: u8,
) -> EvictionPlan {
    let target = max_memories * TARGET_NUM / TARGET_DEN;

    let mut high_count = 0usize;
    let mut low: Vec<&EvictionCandidate> = Vec::new();
    for candidate in candidates {
        if candidate.importance >= retain_floor {
            high_count += 1;
        } else {
            low.push(candidate);
        }
    }

    // Most recent first; ids are monotonic, so the higher id wins a
    // timestamp tie.
    low.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| b.id.cmp(&a.id)));

    let keep_low = target.saturating_sub(high_count);
    let evicted = low.iter().skip(keep_low).map(|c| c.id).collect();
    EvictionPlan { evicted }
}
