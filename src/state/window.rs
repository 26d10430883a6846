use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use crate::types::Contest;

/// Outcome of folding freshly fetched contests into a stored window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub added: usize,
    pub evicted: usize,
}

/// Highest contest number in the window, 0 when empty.
pub fn latest_numero(window: &[Contest]) -> u64 {
    window.iter().map(|c| c.numero).max().unwrap_or(0)
}

/// Build a window from an unordered batch: deduplicated by `numero`, capped to
/// the `cap` highest numbers, sorted ascending.
pub fn build_window(contests: Vec<Contest>, cap: usize) -> Vec<Contest> {
    merge_window(Vec::new(), contests, cap).0
}

/// Merge `fresh` into `existing`, keep only the `cap` highest numbers and return
/// the result ascending. A number already present keeps its stored record.
pub fn merge_window(existing: Vec<Contest>, fresh: Vec<Contest>, cap: usize) -> (Vec<Contest>, MergeStats) {
    // BTreeMap keyed by numero gives uniqueness and ascending order in one go.
    let mut by_numero: BTreeMap<u64, Contest> = BTreeMap::new();
    for contest in existing {
        by_numero.insert(contest.numero, contest);
    }
    let before = by_numero.len();

    for contest in fresh {
        by_numero.entry(contest.numero).or_insert(contest);
    }
    let added = by_numero.len() - before;

    let mut evicted = 0;
    while by_numero.len() > cap {
        by_numero.pop_first();
        evicted += 1;
    }

    (by_numero.into_values().collect(), MergeStats { added, evicted })
}

/// The next batch of numbers to request below `upper`: at most `needed` of
/// them, highest first in coverage, never reaching down to `stored` or 0.
/// `upper` itself is excluded.
///
/// Bootstrap asks once with `stored = 0` and `needed = cap - 1`. Incremental
/// sync keeps asking below the lowest batch until the window is full, so
/// absent contests are made up for by older ones.
pub fn batch_below(upper: u64, stored: u64, needed: u64) -> RangeInclusive<u64> {
    let start = stored.saturating_add(1).max(upper.saturating_sub(needed));
    // Empty (start > end) when nothing is left between `stored` and `upper`.
    start..=upper.saturating_sub(1)
}
