//! Integration test: config load, CSV import, feature derivation, balancing,
//! store replace semantics.

use account_features::{
    config::{PipelineConfig, StoreConfig},
    features::{FeatureColumn, FeatureSchema},
    jobs,
    logging::StructuredLogger,
    records::{RawRow, RawTable},
    storage::{AccountStore, DatasetSink, FeatureSink, RecordSource},
    Error,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

const CSV: &str = "\
user_id,username,email,country,date_last_email,date_registered,date_last_login,is_fake
1,bob,bob@x.com,NL,2021-02-01 10:00:00,2021-01-01 10:00:00,2021-01-05 10:00:00,0
2,bob_1,bob1@x.com,,NULL,2021-01-01 10:05:00,2021-01-01 10:05:00,1
3,zz1,,,,2021-01-01 09:00:00,2021-01-01 09:30:00,1
4,alice,alice@mail.org,DE,,2021-01-03 12:00:00,2021-02-03 12:00:00,0
5,bob_2,bob2@x.com,,,2021-01-01 10:06:00,2021-01-01 10:06:00,1
6,ivan,ivan@site.ru,RU,,2021-01-02 08:00:00,2021-01-09 08:00:00,1
7,alex,alex@site.ru,,,2021-01-04 08:00:00,2021-01-04 08:00:01,1
8,dana,dana@mail.org,US,,2021-01-05 08:00:00,2021-01-06 08:00:00,1
";

fn setup(dir: &Path) -> (PipelineConfig, AccountStore) {
    let config = PipelineConfig {
        store: StoreConfig {
            data_dir: dir.join("data"),
            ..StoreConfig::default()
        },
        ..PipelineConfig::default()
    };
    let store = AccountStore::open(&config.store).unwrap();
    let csv = dir.join("accounts.csv");
    let mut f = std::fs::File::create(&csv).unwrap();
    f.write_all(CSV.as_bytes()).unwrap();
    jobs::import_file(&store, &csv, None).unwrap();
    (config, store)
}

#[test]
fn config_load_default() {
    let c = PipelineConfig::load(Path::new("nonexistent.json"));
    assert_eq!(c.features.edit_threshold, 6);
    assert_eq!(c.features.schema, FeatureSchema::Compact);
}

#[test]
fn config_defaults_match_documented_constants() {
    let c = PipelineConfig::default();
    assert_eq!(c.features.edit_threshold, 6);
    assert_eq!(c.features.radius_for(10), 3);
    assert_eq!(c.features.normalize.len(), 5);
    assert_eq!(c.balance.suffix, "_augment");
    assert_eq!(c.columns.label, "is_fake");
}

#[test]
fn config_partial_json_fills_defaults() {
    let c: PipelineConfig = serde_json::from_str(
        r#"{"features": {"schema": "extended", "radius": 4}, "columns": {"label": "fake"}}"#,
    )
    .unwrap();
    assert_eq!(c.features.schema, FeatureSchema::Extended);
    assert_eq!(c.features.radius_for(100), 4);
    assert_eq!(c.features.edit_threshold, 6);
    assert_eq!(c.columns.label, "fake");
    assert_eq!(c.columns.id, "user_id");
}

#[derive(Serialize)]
struct ReportLine<'a> {
    table: &'a str,
    rows: usize,
}

#[test]
fn report_lines_are_one_json_object_each() {
    let mut buf = Vec::new();
    StructuredLogger::emit_json(&ReportLine { table: "t", rows: 3 }, &mut buf).unwrap();
    StructuredLogger::emit_json(&ReportLine { table: "u", rows: 0 }, &mut buf).unwrap();
    let text = String::from_utf8(buf).unwrap();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines, vec![r#"{"table":"t","rows":3}"#, r#"{"table":"u","rows":0}"#]);
}

#[test]
fn import_then_load_preserves_rows_and_order() {
    let dir = tempfile::tempdir().unwrap();
    let (_, store) = setup(dir.path());
    let table = store.load_table("accounts").unwrap();
    assert_eq!(table.columns.len(), 8);
    assert_eq!(table.rows.len(), 8);
    assert_eq!(table.rows.iter().map(|r| r.id).collect::<Vec<_>>(), (1..=8).collect::<Vec<_>>());
    // Blank CSV fields come back as NULL.
    assert_eq!(table.rows[2].cells[1], None);
    assert_eq!(store.raw_tables().unwrap(), vec!["accounts".to_string()]);
}

#[test]
fn compact_features_written_and_bounded() {
    let dir = tempfile::tempdir().unwrap();
    let (config, store) = setup(dir.path());
    let table = jobs::build_features(&store, &config, "accounts").unwrap();
    assert_eq!(table.rows.len(), 8);

    let matrix = store.load_feature_matrix("accounts").unwrap();
    assert_eq!(
        matrix.columns,
        vec![
            "user_id",
            "symb_in_name",
            "symb_in_email",
            "time_difference",
            "neighbour_above",
            "neighbour_below",
            "text_neighbour_above",
            "text_neighbour_below",
            "is_fake",
        ]
    );
    for row in &matrix.rows {
        for v in &row[1..8] {
            assert!((0.0..=1.0).contains(v), "{v}");
        }
    }
    // zz1 has no email.
    let zz1 = table.row_by_id(3).unwrap();
    assert_eq!(zz1.values[1], 0.0);
    // zz1 is the earliest registration.
    assert_eq!(table.value(2, FeatureColumn::NeighbourAbove), Some(0.0));
    assert_eq!(store.feature_runs("accounts").unwrap().len(), 1);
}

#[test]
fn rerun_replaces_feature_table() {
    let dir = tempfile::tempdir().unwrap();
    let (mut config, store) = setup(dir.path());
    jobs::build_features(&store, &config, "accounts").unwrap();
    config.features.schema = FeatureSchema::Extended;
    config.features.normalize.clear();
    jobs::build_features(&store, &config, "accounts").unwrap();

    let matrix = store.load_feature_matrix("accounts").unwrap();
    assert_eq!(matrix.columns.len(), 16);
    assert_eq!(matrix.rows.len(), 8);
    let col = |name: &str| matrix.columns.iter().position(|c| c == name).unwrap();
    // bob / bob@x.com
    assert_eq!(matrix.rows[0][col("matching_names")], 1.0);
    assert_eq!(matrix.rows[0][col("pattern_email")], 1.0);
    assert_eq!(matrix.rows[0][col("country")], 1.0);
    assert_eq!(matrix.rows[0][col("date_last_email")], 1.0);
    // bob_1: "NULL" last-email, identical registration and login
    assert_eq!(matrix.rows[1][col("date_last_email")], 0.0);
    assert_eq!(matrix.rows[1][col("matching_dates")], 1.0);
    // zz1 / no email
    assert_eq!(matrix.rows[2][col("matching_names")], 0.0);
    assert_eq!(matrix.rows[2][col("pattern_email")], 0.0);
    assert_eq!(matrix.rows[2][col("email_length")], 0.0);
    // alex: one second apart rounds to different seconds
    assert_eq!(matrix.rows[6][col("matching_dates")], 0.0);
    assert_eq!(store.feature_runs("accounts").unwrap().len(), 2);
}

#[test]
fn bad_timestamp_aborts_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let (config, store) = setup(dir.path());
    let mut table = store.load_table("accounts").unwrap();
    table.name = "broken".into();
    let reg = table.cell_index("date_registered").unwrap();
    table.rows[4].cells[reg] = Some("not a date".into());
    store.replace_table(&table).unwrap();

    let err = jobs::build_features(&store, &config, "broken").unwrap_err();
    assert!(matches!(err, Error::Timestamp { id: 5, .. }));
    assert!(store.feature_tables().unwrap().is_empty());
}

#[test]
fn balance_writes_augment_table() {
    let dir = tempfile::tempdir().unwrap();
    let (config, store) = setup(dir.path());
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let report = jobs::balance_table(&store, &config, "accounts", &mut rng).unwrap();
    assert_eq!((report.fake_before, report.real_before), (6, 2));
    assert_eq!((report.fake_after, report.real_after), (6, 6));
    assert_eq!(report.target.as_deref(), Some("accounts_augment"));

    let augmented = store.load_table("accounts_augment").unwrap();
    assert_eq!(augmented.rows.len(), 12);
    assert_eq!(augmented.columns, store.load_table("accounts").unwrap().columns);
    let ids: Vec<i64> = augmented.rows[8..].iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![9, 10, 11, 12]);

    // The balanced dataset feeds straight back into the feature pipeline.
    let features = jobs::build_features(&store, &config, "accounts_augment").unwrap();
    assert_eq!(features.rows.len(), 12);
    assert_eq!(features.rows.iter().filter(|r| r.is_fake == 1).count(), 6);

    // A second pass over the balanced table has nothing to do.
    let again = jobs::balance_table(&store, &config, "accounts_augment", &mut rng).unwrap();
    assert!(again.balanced_already());
    assert!(!store.raw_tables().unwrap().contains(&"accounts_augment_augment".to_string()));
}

#[test]
fn failed_replace_keeps_previous_table() {
    let dir = tempfile::tempdir().unwrap();
    let (_, store) = setup(dir.path());
    let mut bad = RawTable::new("accounts", vec!["user_id".into(), "username".into()]);
    bad.rows.push(RawRow { id: 1, cells: vec![Some("ok".into())] });
    // Two cells for a two-column table: the insert fails mid-transaction.
    bad.rows.push(RawRow { id: 2, cells: vec![Some("x".into()), Some("extra".into())] });
    assert!(store.replace_table(&bad).is_err());

    let kept = store.load_table("accounts").unwrap();
    assert_eq!(kept.rows.len(), 8);
    assert_eq!(kept.columns.len(), 8);
}

#[test]
fn failed_feature_replace_keeps_previous_table() {
    let dir = tempfile::tempdir().unwrap();
    let (config, store) = setup(dir.path());
    let good = jobs::build_features(&store, &config, "accounts").unwrap();
    let before = store.load_feature_matrix("accounts").unwrap();

    let mut bad = good.clone();
    // Too few values for the row width: the insert of row 5 fails.
    bad.rows[5].values.truncate(3);
    assert!(store.replace_features(&bad).is_err());

    assert_eq!(store.load_feature_matrix("accounts").unwrap(), before);
    assert_eq!(store.feature_runs("accounts").unwrap().len(), 1);
}

#[test]
fn key_column_clashing_with_a_feature_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let (mut config, store) = setup(dir.path());
    config.features.schema = FeatureSchema::Extended;
    config.columns.id = "email_length".into();
    assert!(matches!(
        jobs::build_features(&store, &config, "accounts"),
        Err(Error::ColumnClash(c)) if c == "email_length"
    ));
    assert!(store.feature_tables().unwrap().is_empty());
}

#[test]
fn missing_table_and_bad_names() {
    let dir = tempfile::tempdir().unwrap();
    let (config, store) = setup(dir.path());
    assert!(matches!(store.load_table("nope"), Err(Error::TableNotFound(_))));
    assert!(matches!(
        jobs::build_features(&store, &config, "x;drop"),
        Err(Error::InvalidTableName(_))
    ));
}
