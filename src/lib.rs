//! Account features — feature derivation and class balancing for fake-account
//! detection datasets.
//!
//! Modular structure:
//! - [`records`] — Raw tables, typed account records, CSV import
//! - [`features`] — Scalar signals, temporal/text neighbours, normalization, table assembly
//! - [`balance`] — Minority-class bootstrap resampling
//! - [`storage`] — SQLite store with atomic table replace
//! - [`jobs`] — Import, feature and balance operations over a store
//! - [`logging`] — Structured logging

pub mod balance;
pub mod config;
pub mod error;
pub mod features;
pub mod jobs;
pub mod logging;
pub mod records;
pub mod storage;

pub use balance::{BalanceReport, ClassBalancer};
pub use config::PipelineConfig;
pub use error::{Error, Result};
pub use features::{FeatureTable, FeatureTableBuilder};
pub use logging::StructuredLogger;
pub use records::{Dataset, RawAccountRecord, RawTable};
pub use storage::AccountStore;
