//! CSV → raw table. The first CSV column is the integer identifier; every other
//! column is kept as text, blank fields as NULL.

use super::{RawRow, RawTable};
use crate::error::{Error, Result};
use std::path::Path;
use tracing::debug;

/// Read `path` into a table called `name`, or the file stem when `name` is `None`.
pub fn import_csv(path: &Path, name: Option<&str>) -> Result<RawTable> {
    let name = match name {
        Some(n) => n.to_string(),
        None => path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };

    let mut rdr = csv::ReaderBuilder::new().flexible(false).from_path(path)?;
    let columns: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
    if columns.is_empty() || columns.iter().all(String::is_empty) {
        return Err(Error::EmptyCsv);
    }

    let mut table = RawTable::new(name, columns);
    for record in rdr.records() {
        let record = record?;
        let mut fields = record.iter();
        let raw_id = fields.next().unwrap_or_default().trim();
        let id = raw_id
            .parse::<i64>()
            .map_err(|_| Error::InvalidId(raw_id.to_string()))?;
        let cells = fields
            .map(|f| if f.is_empty() { None } else { Some(f.to_string()) })
            .collect();
        table.rows.push(RawRow { id, cells });
    }
    debug!(table = %table.name, rows = table.rows.len(), "csv parsed");
    Ok(table)
}
