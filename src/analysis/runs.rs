//! Longest run of consecutive integers in a sorted sequence.
//!
//! Shared by the subsequent-requisition linker (requisition order indices)
//! and the weekly aggregator (week ordinals).

/// Adjacency statistics of a sorted, deduplicated integer sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunStats {
    /// Neighbouring pairs exactly one apart.
    pub links: usize,
    /// Length of the longest chain of values each one apart.
    pub longest: usize,
}

/// Scan `values` (ascending, no duplicates) for consecutive runs.
///
/// An empty sequence has no run; a single value is a run of length 1.
pub fn consecutive_runs(values: &[i64]) -> RunStats {
    if values.is_empty() {
        return RunStats::default();
    }

    let mut stats = RunStats {
        links: 0,
        longest: 1,
    };
    let mut current = 1;

    for pair in values.windows(2) {
        if pair[1] - pair[0] == 1 {
            stats.links += 1;
            current += 1;
            stats.longest = stats.longest.max(current);
        } else {
            current = 1;
        }
    }

    stats
}
