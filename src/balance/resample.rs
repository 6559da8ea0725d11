//! Synthesizes minority-class rows until fake and real counts match.
//!
//! Each synthetic row takes the next identifier after the table maximum and,
//! for every other column, one value drawn uniformly with replacement from that
//! column of the minority rows. Columns are drawn independently, so synthetic
//! rows do not keep the correlations between columns of real minority rows.

use crate::config::BalanceConfig;
use crate::error::{Error, Result};
use crate::records::{parse_label, RawRow, RawTable};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceReport {
    pub source: String,
    /// Name of the balanced table; `None` when nothing was generated
    pub target: Option<String>,
    pub fake_before: usize,
    pub real_before: usize,
    pub fake_after: usize,
    pub real_after: usize,
    pub synthetic: usize,
    /// Identifier of the first synthetic row
    pub first_synthetic_id: Option<i64>,
}

impl BalanceReport {
    pub fn balanced_already(&self) -> bool {
        self.synthetic == 0
    }
}

#[derive(Debug, Clone)]
pub struct BalanceOutcome {
    pub report: BalanceReport,
    /// Source rows followed by synthetic rows; `None` if already balanced
    pub table: Option<RawTable>,
}

pub struct ClassBalancer {
    config: BalanceConfig,
}

impl ClassBalancer {
    pub fn new(config: BalanceConfig) -> Self {
        Self { config }
    }

    pub fn target_name(&self, source: &str) -> String {
        format!("{}{}", source, self.config.suffix)
    }

    /// Count labels in `table` and, if the classes differ in size, append
    /// synthetic minority rows drawn with `rng`.
    pub fn balance<R: Rng>(
        &self,
        table: &RawTable,
        label_column: &str,
        rng: &mut R,
    ) -> Result<BalanceOutcome> {
        let label_idx = table.cell_index(label_column)?;
        let mut fake_rows = Vec::new();
        let mut real_rows = Vec::new();
        let mut seen = HashSet::with_capacity(table.rows.len());
        for row in &table.rows {
            if !seen.insert(row.id) {
                return Err(Error::DuplicateId(row.id));
            }
            let cell = row.cells.get(label_idx).and_then(|c| c.as_deref());
            if parse_label(row.id, cell)? {
                fake_rows.push(row);
            } else {
                real_rows.push(row);
            }
        }
        let (fake_before, real_before) = (fake_rows.len(), real_rows.len());

        if fake_before == real_before {
            info!(table = %table.name, fake = fake_before, real = real_before, "no balancing needed");
            return Ok(BalanceOutcome {
                report: BalanceReport {
                    source: table.name.clone(),
                    target: None,
                    fake_before,
                    real_before,
                    fake_after: fake_before,
                    real_after: real_before,
                    synthetic: 0,
                    first_synthetic_id: None,
                },
                table: None,
            });
        }

        let (minority, label) = if fake_before < real_before {
            (fake_rows, "fake")
        } else {
            (real_rows, "real")
        };
        if minority.is_empty() {
            return Err(Error::EmptyMinorityClass { label });
        }
        let deficit = fake_before.abs_diff(real_before);

        let width = table.columns.len().saturating_sub(1);
        let max_id = table.max_id().unwrap_or(0);
        // deficit >= 1, so if the last id fits every earlier one does too.
        i64::try_from(deficit)
            .ok()
            .and_then(|d| max_id.checked_add(d))
            .ok_or(Error::IdSpaceExhausted(max_id))?;
        let first_synthetic_id = max_id + 1;
        let mut next_id = max_id;
        let mut out = table.clone();
        out.name = self.target_name(&table.name);
        out.rows.reserve(deficit);
        for _ in 0..deficit {
            next_id += 1;
            let cells = (0..width)
                .map(|c| {
                    let donor = minority[rng.gen_range(0..minority.len())];
                    donor.cells.get(c).cloned().flatten()
                })
                .collect();
            out.rows.push(RawRow { id: next_id, cells });
        }

        let (fake_after, real_after) = if label == "fake" {
            (fake_before + deficit, real_before)
        } else {
            (fake_before, real_before + deficit)
        };
        info!(
            table = %table.name,
            target = %out.name,
            minority = label,
            synthetic = deficit,
            fake_before,
            real_before,
            fake_after,
            real_after,
            "dataset balanced"
        );
        Ok(BalanceOutcome {
            report: BalanceReport {
                source: table.name.clone(),
                target: Some(out.name.clone()),
                fake_before,
                real_before,
                fake_after,
                real_after,
                synthetic: deficit,
                first_synthetic_id: Some(first_synthetic_id),
            },
            table: Some(out),
        })
    }
}
