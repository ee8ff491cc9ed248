//! Streak ("combo") derivation from a habit's completion history.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::schedule::Cadence;

/// Cached streak statistics stored on each habit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComboStats {
    /// Consecutive satisfied periods ending at the current (or just-closed) period.
    pub current_combo: u32,
    /// Longest run of consecutive satisfied periods ever observed.
    pub best_combo: u32,
    /// Number of recorded completions.
    pub total_completions: u32,
}

impl ComboStats {
    /// Derive statistics from the full completion history.
    ///
    /// A period is satisfied when it holds at least
    /// [`Cadence::required_per_period`] completions. The current combo stays
    /// alive while the present period is still open: it is anchored on the
    /// present period when satisfied, otherwise on the one before it.
    ///
    /// The result depends only on the set of timestamps, not their order, so
    /// recomputing after any edit yields the same answer as incremental updates.
    pub fn compute(
        cadence: Cadence,
        target_count: u32,
        completions: &[DateTime<Utc>],
        now: DateTime<Utc>,
    ) -> Self {
        let required = cadence.required_per_period(target_count);
        let mut counts: BTreeMap<i64, u32> = BTreeMap::new();
        for at in completions {
            *counts.entry(cadence.period.index(*at)).or_default() += 1;
        }
        let satisfied = |index: i64| counts.get(&index).is_some_and(|count| *count >= required);

        let mut best_combo = 0;
        let mut run = 0;
        let mut previous: Option<i64> = None;
        for (index, count) in &counts {
            if *count < required {
                run = 0;
                previous = None;
                continue;
            }
            run = match previous {
                Some(prev) if prev + 1 == *index => run + 1,
                _ => 1,
            };
            previous = Some(*index);
            best_combo = best_combo.max(run);
        }

        let now_index = cadence.period.index(now);
        let anchor = if satisfied(now_index) {
            Some(now_index)
        } else if satisfied(now_index - 1) {
            Some(now_index - 1)
        } else {
            None
        };
        let mut current_combo = 0;
        if let Some(mut index) = anchor {
            while satisfied(index) {
                current_combo += 1;
                index -= 1;
            }
        }

        Self {
            current_combo,
            best_combo: best_combo.max(current_combo),
            total_completions: u32::try_from(completions.len()).unwrap_or(u32::MAX),
        }
    }
}
