//! Date keys and elapsed-day arithmetic.
//!
//! Everything here is UTC. Per-user local time only matters to the email
//! job, which converts explicitly.

use chrono::{DateTime, Utc};

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Canonical `YYYY-MM-DD` key (UTC) used to partition per-day records.
pub fn date_key(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d").to_string()
}

/// Whole days between `start` and `now`, floored.
///
/// A partial day counts as the earlier whole day, including for negative
/// spans: 12 hours before `start` is day -1, not day 0.
pub fn elapsed_days(start: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - start).num_milliseconds().div_euclid(MILLIS_PER_DAY)
}
