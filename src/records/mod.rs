//! Account records: the raw table shape kept by the store and the typed
//! dataset the feature pipeline runs on.

mod import;

pub use import::import_csv;

use crate::config::ColumnNames;
use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
];

/// A named table as stored: the first column is the integer identifier,
/// every other column is an optional text cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    pub name: String,
    /// All column names, identifier first
    pub columns: Vec<String>,
    pub rows: Vec<RawRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    pub id: i64,
    /// One cell per column after the identifier
    pub cells: Vec<Option<String>>,
}

impl RawTable {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    /// Position of `column` within `RawRow::cells`.
    pub fn cell_index(&self, column: &str) -> Result<usize> {
        self.columns
            .iter()
            .skip(1)
            .position(|c| c == column)
            .ok_or_else(|| Error::MissingColumn {
                table: self.name.clone(),
                column: column.to_string(),
            })
    }

    pub fn max_id(&self) -> Option<i64> {
        self.rows.iter().map(|r| r.id).max()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Absent if SQL NULL, blank, or one of the textual null markers.
pub fn present(cell: Option<&str>) -> Option<&str> {
    match cell {
        Some(s) if !s.trim().is_empty() && !matches!(s.trim(), "NULL" | "null" | "NaN" | "nan" | "None") => {
            Some(s)
        }
        _ => None,
    }
}

/// Parse a label cell into fake (`true`) or real (`false`).
pub fn parse_label(id: i64, cell: Option<&str>) -> Result<bool> {
    let Some(raw) = present(cell) else {
        return Err(Error::MissingLabel { id });
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "1.0" | "true" | "yes" => Ok(true),
        "0" | "0.0" | "false" | "no" => Ok(false),
        _ => Err(Error::Label {
            id,
            value: raw.to_string(),
        }),
    }
}

/// Parse an instant; naive values are taken as UTC.
pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAccountRecord {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub country: Option<String>,
    pub registered: DateTime<Utc>,
    pub last_login: DateTime<Utc>,
    pub last_email: Option<DateTime<Utc>>,
    pub is_fake: bool,
}

/// Records in load order. Row positions index into this order; it is never
/// re-sorted in place.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    records: Vec<RawAccountRecord>,
}

impl Dataset {
    /// Wrap records, rejecting duplicate identifiers.
    pub fn new(records: Vec<RawAccountRecord>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(records.len());
        for r in &records {
            if !seen.insert(r.id) {
                return Err(Error::DuplicateId(r.id));
            }
        }
        Ok(Self { records })
    }

    pub fn from_table(table: &RawTable, names: &ColumnNames) -> Result<Self> {
        let username = table.cell_index(&names.username)?;
        let email = table.cell_index(&names.email)?;
        let registered = table.cell_index(&names.date_registered)?;
        let last_login = table.cell_index(&names.date_last_login)?;
        let label = table.cell_index(&names.label)?;
        // Optional columns may be missing from the table altogether.
        let country = table.cell_index(&names.country).ok();
        let last_email = table.cell_index(&names.date_last_email).ok();

        fn cell(row: &RawRow, idx: usize) -> Option<&str> {
            row.cells.get(idx).and_then(|c| c.as_deref())
        }
        let instant = |row: &RawRow, idx: usize, column: &str| -> Result<DateTime<Utc>> {
            let raw = cell(row, idx).unwrap_or_default();
            parse_instant(raw).ok_or_else(|| Error::Timestamp {
                id: row.id,
                column: column.to_string(),
                value: raw.to_string(),
            })
        };

        let mut records = Vec::with_capacity(table.rows.len());
        for row in &table.rows {
            let last_email = match last_email.and_then(|i| present(cell(row, i))) {
                Some(raw) => {
                    let parsed = parse_instant(raw);
                    if parsed.is_none() {
                        tracing::warn!(id = row.id, value = raw, "unparseable last-email instant treated as absent");
                    }
                    parsed
                }
                None => None,
            };
            records.push(RawAccountRecord {
                id: row.id,
                username: cell(row, username).unwrap_or_default().to_string(),
                email: present(cell(row, email)).map(str::to_string),
                country: country.and_then(|i| present(cell(row, i))).map(str::to_string),
                registered: instant(row, registered, &names.date_registered)?,
                last_login: instant(row, last_login, &names.date_last_login)?,
                last_email,
                is_fake: parse_label(row.id, cell(row, label))?,
            });
        }
        Self::new(records)
    }

    pub fn records(&self) -> &[RawAccountRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
