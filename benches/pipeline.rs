//! Pipeline benchmark: records → full feature table, both schemas.

use account_features::config::FeaturesConfig;
use account_features::features::{FeatureSchema, FeatureTableBuilder};
use account_features::records::{Dataset, RawAccountRecord};
use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn make_dataset(n: usize) -> Dataset {
    let records = (0..n)
        .map(|i| {
            let t = Utc.timestamp_opt(1_600_000_000 + (i as i64) * 37, 0).unwrap();
            RawAccountRecord {
                id: i as i64,
                username: format!("acct{}", i % 211),
                email: if i % 4 == 0 { None } else { Some(format!("acct{}@host.net", i)) },
                country: if i % 2 == 0 { Some("SE".to_string()) } else { None },
                registered: t,
                last_login: t + Duration::seconds((i % 1000) as i64),
                last_email: None,
                is_fake: i % 5 == 0,
            }
        })
        .collect();
    Dataset::new(records).unwrap()
}

fn bench_compact(c: &mut Criterion) {
    let ds = make_dataset(2_000);
    let builder = FeatureTableBuilder::new(FeaturesConfig::default());
    c.bench_function("features_compact_2k", |b| {
        b.iter(|| black_box(builder.build("bench", &ds, "user_id", "is_fake").unwrap()))
    });
}

fn bench_extended(c: &mut Criterion) {
    let ds = make_dataset(600);
    let builder = FeatureTableBuilder::new(FeaturesConfig {
        schema: FeatureSchema::Extended,
        ..FeaturesConfig::default()
    });
    c.bench_function("features_extended_600", |b| {
        b.iter(|| black_box(builder.build("bench", &ds, "user_id", "is_fake").unwrap()))
    });
}

criterion_group!(benches, bench_compact, bench_extended);
criterion_main!(benches);
