//! Nearest registrations before and after each record.
//!
//! Sorting row indices by instant and walking groups of equal instants gives the
//! same answer as comparing every pair: the neighbour above is the latest
//! instant strictly earlier, the neighbour below the earliest instant strictly
//! later. Records sharing an instant are never each other's neighbours. When
//! several rows share the neighbouring instant, the lowest row position wins.

use super::scalar::seconds_between;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeNeighbours {
    /// Row of the latest record registered strictly earlier
    pub above: Option<usize>,
    /// Row of the earliest record registered strictly later
    pub below: Option<usize>,
    /// Seconds back to `above`
    pub above_secs: Option<f64>,
    /// Seconds forward to `below`
    pub below_secs: Option<f64>,
}

/// Temporal neighbours for every row of `instants`, in row order.
pub fn find_time_neighbours(instants: &[DateTime<Utc>]) -> Vec<TimeNeighbours> {
    let n = instants.len();
    let mut order: Vec<usize> = (0..n).collect();
    // Stable, so rows sharing an instant stay in load order.
    order.sort_by_key(|&i| instants[i]);

    // Start offsets into `order` of each run of equal instants.
    let mut starts = Vec::new();
    for (pos, &row) in order.iter().enumerate() {
        if pos == 0 || instants[order[pos - 1]] != instants[row] {
            starts.push(pos);
        }
    }

    let mut out = vec![TimeNeighbours::default(); n];
    for (g, &start) in starts.iter().enumerate() {
        let end = starts.get(g + 1).copied().unwrap_or(n);
        let above = g.checked_sub(1).map(|p| order[starts[p]]);
        let below = starts.get(g + 1).map(|&s| order[s]);
        for &row in &order[start..end] {
            let t = &instants[row];
            out[row] = TimeNeighbours {
                above,
                below,
                above_secs: above.map(|a| seconds_between(&instants[a], t)),
                below_secs: below.map(|b| seconds_between(t, &instants[b])),
            };
        }
    }
    out
}
