//! End-to-end operations over a store: import, feature derivation, balancing.
//! Each reads its whole input before writing anything.

use crate::balance::{BalanceReport, ClassBalancer};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::features::{FeatureTable, FeatureTableBuilder};
use crate::records::{import_csv, Dataset};
use crate::storage::{DatasetSink, FeatureSink, RecordSource};
use rand::Rng;
use std::path::Path;
use tracing::info;

/// Load a CSV file into the store, replacing any table of the same name.
/// Returns the table name and row count.
pub fn import_file<S: DatasetSink>(store: &S, path: &Path, name: Option<&str>) -> Result<(String, usize)> {
    let table = import_csv(path, name)?;
    store.replace_table(&table)?;
    info!(table = %table.name, rows = table.rows.len(), path = %path.display(), "csv imported");
    Ok((table.name, table.rows.len()))
}

/// Derive the feature table for raw table `name` and replace the feature
/// table of the same name.
pub fn build_features<S: RecordSource + FeatureSink>(
    store: &S,
    config: &PipelineConfig,
    name: &str,
) -> Result<FeatureTable> {
    let raw = store.load_table(name)?;
    let dataset = Dataset::from_table(&raw, &config.columns)?;
    info!(table = name, records = dataset.len(), "deriving features");
    let table = FeatureTableBuilder::new(config.features.clone()).build(
        name,
        &dataset,
        &config.columns.id,
        &config.columns.label,
    )?;
    store.replace_features(&table)?;
    Ok(table)
}

/// Balance raw table `name`; when synthetic rows are generated the result is
/// written as `<name><suffix>`.
pub fn balance_table<S: RecordSource + DatasetSink, R: Rng>(
    store: &S,
    config: &PipelineConfig,
    name: &str,
    rng: &mut R,
) -> Result<BalanceReport> {
    let raw = store.load_table(name)?;
    let outcome = ClassBalancer::new(config.balance.clone()).balance(&raw, &config.columns.label, rng)?;
    if let Some(table) = &outcome.table {
        store.replace_table(table)?;
    }
    Ok(outcome.report)
}
