//! Pipeline configuration. Every path the store touches comes from here; nothing
//! is resolved against the process working directory implicitly.

use crate::features::{FeatureColumn, FeatureSchema, TextNeighbourMode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Env var naming the JSON config file.
pub const CONFIG_ENV: &str = "ACCOUNT_FEATURES_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Store location and file names
    pub store: StoreConfig,
    /// Names of the raw columns the pipeline reads
    pub columns: ColumnNames,
    /// Feature derivation parameters
    pub features: FeaturesConfig,
    /// Class balancing parameters
    pub balance: BalanceConfig,
    /// Logging
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding both databases
    pub data_dir: PathBuf,
    /// Raw account tables (imports and balanced datasets)
    pub accounts_db: String,
    /// Derived feature tables
    pub features_db: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub id: String,
    pub username: String,
    pub email: String,
    pub country: String,
    pub date_registered: String,
    pub date_last_login: String,
    pub date_last_email: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturesConfig {
    /// Which columns the emitted table carries
    pub schema: FeatureSchema,
    /// How the pair scored by `text_neighbour_*` is chosen
    pub text_neighbours: TextNeighbourMode,
    /// Maximum edit distance for two strings to count as similar
    pub edit_threshold: usize,
    /// Row-window radius; `None` means a third of the dataset
    pub radius: Option<usize>,
    /// Columns rescaled to [0, 1]
    pub normalize: Vec<FeatureColumn>,
    /// Round instants to whole seconds before `matching_dates` compares them
    pub round_dates_to_secs: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceConfig {
    /// Seed for the resampling generator
    pub seed: u64,
    /// Appended to the source table name to name the balanced table
    pub suffix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            accounts_db: "app_database.db".to_string(),
            features_db: "app_database_features.db".to_string(),
        }
    }
}

impl StoreConfig {
    pub fn accounts_path(&self) -> PathBuf {
        self.data_dir.join(&self.accounts_db)
    }

    pub fn features_path(&self) -> PathBuf {
        self.data_dir.join(&self.features_db)
    }
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            id: "user_id".to_string(),
            username: "username".to_string(),
            email: "email".to_string(),
            country: "country".to_string(),
            date_registered: "date_registered".to_string(),
            date_last_login: "date_last_login".to_string(),
            date_last_email: "date_last_email".to_string(),
            label: "is_fake".to_string(),
        }
    }
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            schema: FeatureSchema::Compact,
            text_neighbours: TextNeighbourMode::Temporal,
            edit_threshold: 6,
            radius: None,
            normalize: vec![
                FeatureColumn::TimeDifference,
                FeatureColumn::NeighbourAbove,
                FeatureColumn::NeighbourBelow,
                FeatureColumn::TextNeighbourAbove,
                FeatureColumn::TextNeighbourBelow,
            ],
            round_dates_to_secs: true,
        }
    }
}

impl FeaturesConfig {
    /// Row-window radius for a dataset of `len` records.
    pub fn radius_for(&self, len: usize) -> usize {
        self.radius.unwrap_or(len / 3)
    }
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            suffix: "_augment".to_string(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl PipelineConfig {
    /// Load from JSON file if present; otherwise return default
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match std::fs::read_to_string(path)
            .map_err(crate::Error::from)
            .and_then(|data| serde_json::from_str::<PipelineConfig>(&data).map_err(Into::into))
        {
            Ok(c) => c,
            Err(e) => {
                // The subscriber is not installed yet, so this goes to stderr directly.
                eprintln!("ignoring config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}
