//! Library error type.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("row {id}: cannot parse {column} timestamp {value:?}")]
    Timestamp {
        id: i64,
        column: String,
        value: String,
    },

    #[error("row {id}: label {value:?} is not a boolean")]
    Label { id: i64, value: String },

    #[error("row {id}: label column is empty")]
    MissingLabel { id: i64 },

    #[error("duplicate identifier {0}")]
    DuplicateId(i64),

    #[error("identifier {0:?} is not an integer")]
    InvalidId(String),

    #[error("table {table} has no column {column}")]
    MissingColumn { table: String, column: String },

    #[error("minority class ({label}) has no records to resample from")]
    EmptyMinorityClass { label: &'static str },

    #[error("no identifiers left above {0} for synthetic rows")]
    IdSpaceExhausted(i64),

    #[error("feature column {0:?} collides with the identifier or label column")]
    ColumnClash(String),

    #[error("invalid table name {0:?}")]
    InvalidTableName(String),

    #[error("table {0} not found")]
    TableNotFound(String),

    #[error("csv file has no header row")]
    EmptyCsv,

    #[error("csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}
