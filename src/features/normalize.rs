//! Per-column min-max scaling over the current dataset. Absent values do not
//! move the bounds and are filled with 0 afterwards, which makes them
//! indistinguishable from the observed minimum.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinMax {
    pub min: f64,
    pub max: f64,
}

impl MinMax {
    /// Bounds over the present, finite values; `None` if there are none.
    pub fn fit(values: &[Option<f64>]) -> Option<Self> {
        values
            .iter()
            .flatten()
            .filter(|v| v.is_finite())
            .fold(None, |acc: Option<MinMax>, &v| {
                Some(match acc {
                    Some(m) => MinMax {
                        min: m.min.min(v),
                        max: m.max.max(v),
                    },
                    None => MinMax { min: v, max: v },
                })
            })
    }

    /// A constant column maps to 0.
    pub fn transform(&self, v: f64) -> f64 {
        let range = self.max - self.min;
        if range == 0.0 {
            return 0.0;
        }
        ((v - self.min) / range).clamp(0.0, 1.0)
    }
}

/// Scale a column into [0, 1], filling absent entries with 0.
pub fn min_max(values: &[Option<f64>]) -> Vec<f64> {
    let Some(bounds) = MinMax::fit(values) else {
        return vec![0.0; values.len()];
    };
    values
        .iter()
        .map(|v| match v {
            Some(x) if x.is_finite() => bounds.transform(*x),
            _ => 0.0,
        })
        .collect()
}
