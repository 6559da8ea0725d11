//! Per-record signals with no cross-record dependency.

use super::distance::levenshtein;
use crate::records::RawAccountRecord;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static EMAIL_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\S+@\S+\.\S+$").expect("email pattern compiles"));

/// Any Unicode decimal digit.
static DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d").expect("digit pattern compiles"));

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScalarFeatures {
    pub username_length: usize,
    pub numbers_in_name: bool,
    pub email_length: usize,
    /// Fraction of non-alphabetic characters in the username
    pub symb_in_name: f64,
    /// Fraction of non-alphabetic characters in the email
    pub symb_in_email: f64,
    pub country_present: bool,
    pub pattern_email: bool,
    /// Username within the edit threshold of the email local part
    pub matching_names: bool,
    pub date_last_email_present: bool,
    /// Seconds from registration to last login (signed)
    pub time_difference: f64,
    /// Unix seconds
    pub date_registered: i64,
    /// Unix seconds
    pub date_last_login: i64,
    pub matching_dates: bool,
}

#[derive(Debug, Clone)]
pub struct ScalarExtractor {
    threshold: usize,
    round_dates_to_secs: bool,
}

impl ScalarExtractor {
    pub fn new(threshold: usize, round_dates_to_secs: bool) -> Self {
        Self {
            threshold,
            round_dates_to_secs,
        }
    }

    pub fn extract(&self, r: &RawAccountRecord) -> ScalarFeatures {
        let email = r.email.as_deref();
        let matching_dates = if self.round_dates_to_secs {
            round_to_secs(&r.registered) == round_to_secs(&r.last_login)
        } else {
            r.registered == r.last_login
        };

        ScalarFeatures {
            username_length: r.username.chars().count(),
            numbers_in_name: DIGIT.is_match(&r.username),
            email_length: email.map(|e| e.chars().count()).unwrap_or(0),
            symb_in_name: non_alpha_ratio(&r.username),
            symb_in_email: email.map(non_alpha_ratio).unwrap_or(0.0),
            country_present: r.country.is_some(),
            pattern_email: email.map(|e| EMAIL_SHAPE.is_match(e)).unwrap_or(false),
            matching_names: email
                .map(|e| levenshtein(&r.username, local_part(e)) <= self.threshold)
                .unwrap_or(false),
            date_last_email_present: r.last_email.is_some(),
            time_difference: seconds_between(&r.registered, &r.last_login),
            date_registered: r.registered.timestamp(),
            date_last_login: r.last_login.timestamp(),
            matching_dates,
        }
    }
}

/// Share of characters that are not alphabetic; 0 for an empty string.
pub fn non_alpha_ratio(s: &str) -> f64 {
    let (total, other) = s
        .chars()
        .fold((0usize, 0usize), |(t, o), c| (t + 1, o + usize::from(!c.is_alphabetic())));
    if total == 0 {
        return 0.0;
    }
    other as f64 / total as f64
}

fn local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

/// Signed seconds from `from` to `to`, with sub-second precision.
pub fn seconds_between(from: &DateTime<Utc>, to: &DateTime<Utc>) -> f64 {
    let d = *to - *from;
    d.num_microseconds()
        .map(|us| us as f64 / 1e6)
        .unwrap_or_else(|| d.num_seconds() as f64)
}

/// Nearest whole second, ties to even.
fn round_to_secs(t: &DateTime<Utc>) -> i64 {
    let secs = t.timestamp();
    let nanos = t.timestamp_subsec_nanos();
    if nanos > 500_000_000 || (nanos == 500_000_000 && secs % 2 != 0) {
        secs + 1
    } else {
        secs
    }
}
