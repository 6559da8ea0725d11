//! Keyed record storage: raw account tables in, feature tables and balanced
//! datasets out. Every write replaces the named table as a whole.

mod sqlite;

pub use sqlite::{AccountStore, FeatureMatrix, RunRecord};

use crate::error::Result;
use crate::features::FeatureTable;
use crate::records::RawTable;

/// Where named raw tables are read from.
pub trait RecordSource {
    fn load_table(&self, name: &str) -> Result<RawTable>;
}

/// Receives balanced datasets and imports. Replaces any table of the same name.
pub trait DatasetSink {
    fn replace_table(&self, table: &RawTable) -> Result<()>;
}

/// Receives feature tables. Replaces any table of the same name.
pub trait FeatureSink {
    fn replace_features(&self, table: &FeatureTable) -> Result<()>;
}
