//! SQLite-backed store. Raw tables and feature tables live in separate database
//! files; each replace runs in one transaction so readers see either the old
//! table or the complete new one.

use super::{DatasetSink, FeatureSink, RecordSource};
use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::features::{ColumnType, FeatureTable};
use crate::records::{RawRow, RawTable};
use chrono::Utc;
use rusqlite::types::{Value, ValueRef};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};
use uuid::Uuid;

const RUNS_TABLE: &str = "pipeline_runs";

const RUNS_SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS pipeline_runs (
        run_id TEXT PRIMARY KEY,
        kind TEXT NOT NULL,
        source TEXT NOT NULL,
        target TEXT NOT NULL,
        row_count INTEGER NOT NULL,
        fingerprint TEXT NOT NULL,
        created_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_runs_target ON pipeline_runs(target);
"#;

/// One completed write, as recorded in the run ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub kind: String,
    pub source: String,
    pub target: String,
    pub row_count: i64,
    /// SHA-256 over the written rows
    pub fingerprint: String,
    pub created_at: String,
}

/// A feature table read back as plain numbers, for downstream models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

pub struct AccountStore {
    accounts: Mutex<Connection>,
    features: Mutex<Connection>,
}

fn lock(conn: &Mutex<Connection>) -> MutexGuard<'_, Connection> {
    conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Table names are interpolated into SQL, so only plain identifiers pass.
pub fn validate_table_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    let reserved = name.eq_ignore_ascii_case(RUNS_TABLE) || name.to_ascii_lowercase().starts_with("sqlite_");
    if !valid || reserved {
        return Err(Error::InvalidTableName(name.to_string()));
    }
    Ok(())
}

fn fingerprint<T: Serialize>(rows: &T) -> Result<String> {
    let bytes = serde_json::to_vec(rows)?;
    let mut h = Sha256::new();
    h.update(&bytes);
    Ok(format!("{:x}", h.finalize()))
}

fn open_db(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    conn.execute_batch(RUNS_SCHEMA)?;
    Ok(conn)
}

fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![name],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

fn user_tables(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name != ?1 AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )?;
    let names = stmt
        .query_map(params![RUNS_TABLE], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(names)
}

fn columns_of(conn: &Connection, name: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote(name)))?;
    let cols = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(cols)
}

fn text_of(v: ValueRef<'_>) -> Option<String> {
    match v {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(t) | ValueRef::Blob(t) => Some(String::from_utf8_lossy(t).into_owned()),
    }
}

fn id_of(v: ValueRef<'_>) -> Result<i64> {
    match v {
        ValueRef::Integer(i) => Ok(i),
        ValueRef::Real(f) if f.fract() == 0.0 => Ok(f as i64),
        other => {
            let raw = text_of(other).unwrap_or_default();
            raw.trim().parse().map_err(|_| Error::InvalidId(raw))
        }
    }
}

fn record_run(
    tx: &rusqlite::Transaction<'_>,
    kind: &str,
    source: &str,
    target: &str,
    rows: usize,
    fingerprint: &str,
) -> Result<String> {
    let run_id = Uuid::new_v4().to_string();
    tx.execute(
        "INSERT INTO pipeline_runs (run_id, kind, source, target, row_count, fingerprint, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![run_id, kind, source, target, rows as i64, fingerprint, Utc::now().to_rfc3339()],
    )?;
    Ok(run_id)
}

fn runs_for(conn: &Connection, target: &str) -> Result<Vec<RunRecord>> {
    let mut stmt = conn.prepare(
        "SELECT run_id, kind, source, target, row_count, fingerprint, created_at FROM pipeline_runs WHERE target = ?1 ORDER BY created_at, rowid",
    )?;
    let runs = stmt
        .query_map(params![target], |row| {
            Ok(RunRecord {
                run_id: row.get(0)?,
                kind: row.get(1)?,
                source: row.get(2)?,
                target: row.get(3)?,
                row_count: row.get(4)?,
                fingerprint: row.get(5)?,
                created_at: row.get(6)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(runs)
}

impl AccountStore {
    /// Open or create both databases under `config.data_dir`.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;
        let accounts = open_db(&config.accounts_path())?;
        let features = open_db(&config.features_path())?;
        debug!(data_dir = %config.data_dir.display(), "store opened");
        Ok(Self {
            accounts: Mutex::new(accounts),
            features: Mutex::new(features),
        })
    }

    /// Raw tables currently stored, by name.
    pub fn raw_tables(&self) -> Result<Vec<String>> {
        user_tables(&lock(&self.accounts))
    }

    /// Feature tables currently stored, by name.
    pub fn feature_tables(&self) -> Result<Vec<String>> {
        user_tables(&lock(&self.features))
    }

    /// Ledger entries for writes to raw table `target`, oldest first.
    pub fn raw_runs(&self, target: &str) -> Result<Vec<RunRecord>> {
        runs_for(&lock(&self.accounts), target)
    }

    /// Ledger entries for writes to feature table `target`, oldest first.
    pub fn feature_runs(&self, target: &str) -> Result<Vec<RunRecord>> {
        runs_for(&lock(&self.features), target)
    }

    pub fn load_feature_matrix(&self, name: &str) -> Result<FeatureMatrix> {
        validate_table_name(name)?;
        let conn = lock(&self.features);
        if !table_exists(&conn, name)? {
            return Err(Error::TableNotFound(name.to_string()));
        }
        let columns = columns_of(&conn, name)?;
        let mut stmt = conn.prepare(&format!("SELECT * FROM {} ORDER BY rowid", quote(name)))?;
        let width = columns.len();
        let rows = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|i| row.get::<_, f64>(i))
                    .collect::<std::result::Result<Vec<_>, _>>()
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(FeatureMatrix { columns, rows })
    }
}

impl RecordSource for AccountStore {
    fn load_table(&self, name: &str) -> Result<RawTable> {
        validate_table_name(name)?;
        let conn = lock(&self.accounts);
        if !table_exists(&conn, name)? {
            return Err(Error::TableNotFound(name.to_string()));
        }
        let columns = columns_of(&conn, name)?;
        let width = columns.len();
        let mut stmt = conn.prepare(&format!("SELECT * FROM {} ORDER BY rowid", quote(name)))?;
        let mut rows = stmt.query([])?;
        let mut table = RawTable::new(name, columns);
        while let Some(row) = rows.next()? {
            let id = id_of(row.get_ref(0)?)?;
            let cells = (1..width)
                .map(|i| row.get_ref(i).map(text_of))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            table.rows.push(RawRow { id, cells });
        }
        debug!(table = name, rows = table.rows.len(), "raw table loaded");
        Ok(table)
    }
}

impl DatasetSink for AccountStore {
    fn replace_table(&self, table: &RawTable) -> Result<()> {
        validate_table_name(&table.name)?;
        let print = fingerprint(&table.rows)?;
        let mut conn = lock(&self.accounts);
        let tx = conn.transaction()?;
        let name = quote(&table.name);
        let defs: Vec<String> = table
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{} {}", quote(c), if i == 0 { "INTEGER" } else { "TEXT" }))
            .collect();
        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS {name}; CREATE TABLE {name} ({});",
            defs.join(", ")
        ))?;
        {
            let placeholders = vec!["?"; table.columns.len()].join(", ");
            let mut insert = tx.prepare(&format!("INSERT INTO {name} VALUES ({placeholders})"))?;
            for row in &table.rows {
                let values = std::iter::once(Value::Integer(row.id)).chain(
                    row.cells
                        .iter()
                        .map(|c| c.clone().map(Value::Text).unwrap_or(Value::Null)),
                );
                insert.execute(params_from_iter(values))?;
            }
        }
        let run_id = record_run(&tx, "dataset", &table.name, &table.name, table.rows.len(), &print)?;
        tx.commit()?;
        info!(table = %table.name, rows = table.rows.len(), run_id = %run_id, "raw table replaced");
        Ok(())
    }
}

impl FeatureSink for AccountStore {
    fn replace_features(&self, table: &FeatureTable) -> Result<()> {
        validate_table_name(&table.name)?;
        let print = fingerprint(&table.rows)?;
        let mut conn = lock(&self.features);
        let tx = conn.transaction()?;
        let name = quote(&table.name);
        let mut defs = vec![format!("{} INTEGER", quote(&table.id_column))];
        defs.extend(
            table
                .columns
                .iter()
                .map(|(col, ty)| format!("{} {}", quote(col.name()), ty.sql())),
        );
        defs.push(format!("{} INTEGER", quote(&table.label_column)));
        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS {name}; CREATE TABLE {name} ({});",
            defs.join(", ")
        ))?;
        {
            let placeholders = vec!["?"; defs.len()].join(", ");
            let mut insert = tx.prepare(&format!("INSERT INTO {name} VALUES ({placeholders})"))?;
            for row in &table.rows {
                let mut values = Vec::with_capacity(defs.len());
                values.push(Value::Integer(row.id));
                for ((_, ty), v) in table.columns.iter().zip(&row.values) {
                    values.push(match ty {
                        ColumnType::Integer => Value::Integer(v.round() as i64),
                        ColumnType::Real => Value::Real(*v),
                    });
                }
                values.push(Value::Integer(row.is_fake));
                insert.execute(params_from_iter(values))?;
            }
        }
        let run_id = record_run(&tx, "features", &table.name, &table.name, table.rows.len(), &print)?;
        tx.commit()?;
        info!(table = %table.name, rows = table.rows.len(), run_id = %run_id, "feature table replaced");
        Ok(())
    }
}
