//! Class balancing by minority bootstrap.

use account_features::balance::ClassBalancer;
use account_features::config::BalanceConfig;
use account_features::records::{parse_label, RawRow, RawTable};
use account_features::Error;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;

fn table(rows: &[(i64, &str, &str, &str)]) -> RawTable {
    let mut t = RawTable::new(
        "signups",
        vec!["user_id".into(), "username".into(), "country".into(), "is_fake".into()],
    );
    for (id, name, country, label) in rows {
        t.rows.push(RawRow {
            id: *id,
            cells: vec![Some(name.to_string()), Some(country.to_string()), Some(label.to_string())],
        });
    }
    t
}

fn counts(t: &RawTable) -> (usize, usize) {
    let idx = t.cell_index("is_fake").unwrap();
    t.rows.iter().fold((0, 0), |(f, r), row| {
        if parse_label(row.id, row.cells[idx].as_deref()).unwrap() {
            (f + 1, r)
        } else {
            (f, r + 1)
        }
    })
}

#[test]
fn three_real_five_fake_gets_two_real() {
    let t = table(&[
        (4, "r1", "DE", "0"),
        (9, "f1", "CN", "1"),
        (2, "r2", "FR", "0"),
        (17, "f2", "CN", "1"),
        (5, "f3", "RU", "1"),
        (6, "r3", "DE", "0"),
        (8, "f4", "CN", "1"),
        (3, "f5", "US", "1"),
    ]);
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let out = ClassBalancer::new(BalanceConfig::default())
        .balance(&t, "is_fake", &mut rng)
        .unwrap();
    let balanced = out.table.unwrap();
    assert_eq!(balanced.name, "signups_augment");
    assert_eq!(balanced.rows.len(), 10);
    assert_eq!(balanced.rows[..8], t.rows[..]);
    assert_eq!(balanced.rows[8].id, 18);
    assert_eq!(balanced.rows[9].id, 19);
    assert_eq!(counts(&balanced), (5, 5));
    assert_eq!(out.report.real_after, 5);
    assert_eq!(out.report.fake_after, 5);
    assert_eq!(out.report.first_synthetic_id, Some(18));

    // Every synthetic value was observed in some real row.
    let real_names: HashSet<_> = ["r1", "r2", "r3"].into_iter().collect();
    let real_countries: HashSet<_> = ["DE", "FR"].into_iter().collect();
    for row in &balanced.rows[8..] {
        assert!(real_names.contains(row.cells[0].as_deref().unwrap()));
        assert!(real_countries.contains(row.cells[1].as_deref().unwrap()));
    }
}

#[test]
fn balanced_input_is_left_alone() {
    let t = table(&[(1, "a", "X", "1"), (2, "b", "Y", "0")]);
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    let out = ClassBalancer::new(BalanceConfig::default())
        .balance(&t, "is_fake", &mut rng)
        .unwrap();
    assert!(out.table.is_none());
    assert!(out.report.balanced_already());
    assert_eq!(out.report.target, None);
}

#[test]
fn balancing_twice_is_a_no_op() {
    let t = table(&[(1, "a", "X", "1"), (2, "b", "Y", "1"), (3, "c", "Z", "0")]);
    let balancer = ClassBalancer::new(BalanceConfig::default());
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let first = balancer.balance(&t, "is_fake", &mut rng).unwrap().table.unwrap();
    let second = balancer.balance(&first, "is_fake", &mut rng).unwrap();
    assert!(second.report.balanced_already());
}

#[test]
fn empty_minority_is_an_error() {
    let t = table(&[(1, "a", "X", "1"), (2, "b", "Y", "1")]);
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    let err = ClassBalancer::new(BalanceConfig::default())
        .balance(&t, "is_fake", &mut rng)
        .unwrap_err();
    assert!(matches!(err, Error::EmptyMinorityClass { label: "real" }));
}

#[test]
fn duplicate_ids_are_rejected() {
    let t = table(&[(1, "a", "X", "1"), (1, "b", "Y", "1"), (2, "c", "Z", "0")]);
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    let err = ClassBalancer::new(BalanceConfig::default())
        .balance(&t, "is_fake", &mut rng)
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateId(1)));
}

#[test]
fn identifiers_past_i64_max_are_refused() {
    let t = table(&[(i64::MAX, "a", "X", "1"), (3, "b", "Y", "1"), (2, "c", "Z", "0")]);
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    let err = ClassBalancer::new(BalanceConfig::default())
        .balance(&t, "is_fake", &mut rng)
        .unwrap_err();
    assert!(matches!(err, Error::IdSpaceExhausted(i64::MAX)));

    // Room for exactly one synthetic row.
    let t = table(&[(i64::MAX - 1, "a", "X", "1"), (3, "b", "Y", "1"), (2, "c", "Z", "0")]);
    let out = ClassBalancer::new(BalanceConfig::default())
        .balance(&t, "is_fake", &mut rng)
        .unwrap();
    assert_eq!(out.report.first_synthetic_id, Some(i64::MAX));
}

#[test]
fn same_seed_same_rows() {
    let t = table(&[
        (1, "a", "X", "1"),
        (2, "b", "Y", "1"),
        (3, "c", "Z", "1"),
        (4, "d", "W", "1"),
        (5, "e", "V", "0"),
        (6, "f", "U", "0"),
    ]);
    let balancer = ClassBalancer::new(BalanceConfig::default());
    let a = balancer.balance(&t, "is_fake", &mut ChaCha8Rng::seed_from_u64(9)).unwrap();
    let b = balancer.balance(&t, "is_fake", &mut ChaCha8Rng::seed_from_u64(9)).unwrap();
    assert_eq!(a.table, b.table);
}

#[test]
fn bad_label_fails() {
    let t = table(&[(1, "a", "X", "perhaps")]);
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    assert!(matches!(
        ClassBalancer::new(BalanceConfig::default()).balance(&t, "is_fake", &mut rng),
        Err(Error::Label { id: 1, .. })
    ));
}
