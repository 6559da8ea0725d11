//! Text-similarity neighbours.
//!
//! Neighbour references are row positions into the immutable record slice. The
//! row-window searches read only that slice, so rows are searched in parallel
//! and gathered back in order.

use super::distance::{damerau_levenshtein, harmonic_mean};
use crate::records::RawAccountRecord;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// First similar row above and below, by load order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowNeighbours {
    pub above: Option<usize>,
    pub below: Option<usize>,
}

impl RowNeighbours {
    /// Rows between `row` and its neighbour above.
    pub fn above_rows(&self, row: usize) -> Option<usize> {
        self.above.map(|j| row - j)
    }

    /// Rows between `row` and its neighbour below.
    pub fn below_rows(&self, row: usize) -> Option<usize> {
        self.below.map(|j| j - row)
    }
}

/// Scan `row+1 ..= row+radius` and `row-1 ..= row-radius`, nearest first, for
/// the first row accepted by `similar`.
fn window_search(row: usize, len: usize, radius: usize, similar: impl Fn(usize) -> bool) -> RowNeighbours {
    let below = (row + 1..len.min(row.saturating_add(radius).saturating_add(1))).find(|&j| similar(j));
    let above = (row.saturating_sub(radius)..row).rev().find(|&j| similar(j));
    RowNeighbours { above, below }
}

/// Row-window neighbours where either the username or the email is within
/// `threshold` edits. Absent emails never match.
pub fn text_window_neighbours(
    records: &[RawAccountRecord],
    radius: usize,
    threshold: usize,
) -> Vec<RowNeighbours> {
    (0..records.len())
        .into_par_iter()
        .map(|i| {
            let r = &records[i];
            window_search(i, records.len(), radius, |j| {
                let other = &records[j];
                damerau_levenshtein(&r.username, &other.username) <= threshold
                    || match (&r.email, &other.email) {
                        (Some(a), Some(b)) => damerau_levenshtein(a, b) <= threshold,
                        _ => false,
                    }
            })
        })
        .collect()
}

/// Row-window neighbours over a single text column. Absent values never match.
pub fn column_window_neighbours(
    values: &[Option<&str>],
    radius: usize,
    threshold: usize,
) -> Vec<RowNeighbours> {
    (0..values.len())
        .into_par_iter()
        .map(|i| match values[i] {
            Some(v) => window_search(i, values.len(), radius, |j| {
                values[j].is_some_and(|w| damerau_levenshtein(v, w) <= threshold)
            }),
            None => RowNeighbours::default(),
        })
        .collect()
}

/// Scores a record against a chosen neighbour: the harmonic mean of the
/// username and email edit distances.
pub struct TextScorer<'a> {
    records: &'a [RawAccountRecord],
}

impl<'a> TextScorer<'a> {
    pub fn new(records: &'a [RawAccountRecord]) -> Self {
        Self { records }
    }

    /// An absent email compares as the empty string.
    pub fn score(&self, row: usize, neighbour: usize) -> f64 {
        let a = &self.records[row];
        let b = &self.records[neighbour];
        let username = damerau_levenshtein(&a.username, &b.username);
        let email = damerau_levenshtein(
            a.email.as_deref().unwrap_or_default(),
            b.email.as_deref().unwrap_or_default(),
        );
        harmonic_mean(username as f64, email as f64)
    }

    pub fn score_opt(&self, row: usize, neighbour: Option<usize>) -> Option<f64> {
        neighbour.map(|j| self.score(row, j))
    }
}
