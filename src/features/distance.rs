//! String edit distances over Unicode scalar values, and the harmonic mean
//! used to fold two distances into one score.

use std::collections::HashMap;

/// Levenshtein distance: insertions, deletions and substitutions at unit cost.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        cur[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            cur[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(cur[j] + 1);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

/// Unrestricted Damerau–Levenshtein distance (Lowrance–Wagner): Levenshtein
/// plus transposition of adjacent characters, which may be edited further.
pub fn damerau_levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (n, m) = (a.len(), b.len());
    if n == 0 {
        return m;
    }
    if m == 0 {
        return n;
    }

    // h[(i + 1) * w + (j + 1)] is the distance between a[..i] and b[..j];
    // row and column 0 hold the "infinite" border.
    let w = m + 2;
    let inf = n + m;
    let mut h = vec![0usize; (n + 2) * w];
    h[0] = inf;
    for i in 0..=n {
        h[(i + 1) * w] = inf;
        h[(i + 1) * w + 1] = i;
    }
    for j in 0..=m {
        h[j + 1] = inf;
        h[w + j + 1] = j;
    }

    // Last row in which each character of `a` was seen.
    let mut last_row: HashMap<char, usize> = HashMap::new();
    for i in 1..=n {
        let mut last_match_col = 0;
        for j in 1..=m {
            let k = last_row.get(&b[j - 1]).copied().unwrap_or(0);
            let l = last_match_col;
            let cost = if a[i - 1] == b[j - 1] {
                last_match_col = j;
                0
            } else {
                1
            };
            let substitute = h[i * w + j] + cost;
            let insert = h[(i + 1) * w + j] + 1;
            let delete = h[i * w + j + 1] + 1;
            let transpose = h[k * w + l] + (i - k - 1) + 1 + (j - l - 1);
            h[(i + 1) * w + j + 1] = substitute.min(insert).min(delete).min(transpose);
        }
        last_row.insert(a[i - 1], i);
    }
    h[(n + 1) * w + m + 1]
}

/// `2ab / (a + b)`, and 0 when `a + b == 0`.
pub fn harmonic_mean(a: f64, b: f64) -> f64 {
    if a + b == 0.0 {
        return 0.0;
    }
    2.0 * a * b / (a + b)
}
