// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! 100-nanosecond tick conversions for date/time and time-span values.
//!
//! Date/time ticks count from 0001-01-01T00:00:00Z. Sub-tick precision is
//! truncated.

use chrono::{DateTime, TimeDelta, Utc};

/// Ticks in one second.
pub const TICKS_PER_SECOND: i64 = 10_000_000;

const NANOS_PER_TICK: i64 = 100;

/// Seconds between the tick epoch and the Unix epoch.
pub const UNIX_EPOCH_SECONDS: i64 = 62_135_596_800;

/// Convert a UTC timestamp to ticks, `None` if it does not fit an `i64`.
pub fn datetime_to_ticks(value: &DateTime<Utc>) -> Option<i64> {
    let secs = value.timestamp().checked_add(UNIX_EPOCH_SECONDS)?;
    let sub = i64::from(value.timestamp_subsec_nanos()) / NANOS_PER_TICK;
    secs.checked_mul(TICKS_PER_SECOND)?.checked_add(sub)
}

/// Convert ticks back to a UTC timestamp, `None` if out of range.
pub fn ticks_to_datetime(ticks: i64) -> Option<DateTime<Utc>> {
    let secs = ticks.div_euclid(TICKS_PER_SECOND) - UNIX_EPOCH_SECONDS;
    let nanos = ticks.rem_euclid(TICKS_PER_SECOND) * NANOS_PER_TICK;
    DateTime::from_timestamp(secs, u32::try_from(nanos).ok()?)
}

/// Convert a signed span to ticks.
pub fn timedelta_to_ticks(value: &TimeDelta) -> Option<i64> {
    // both parts carry the sign of the span
    let sub = i64::from(value.subsec_nanos()) / NANOS_PER_TICK;
    value
        .num_seconds()
        .checked_mul(TICKS_PER_SECOND)?
        .checked_add(sub)
}

/// Convert ticks back to a signed span.
pub fn ticks_to_timedelta(ticks: i64) -> Option<TimeDelta> {
    let secs = TimeDelta::try_seconds(ticks / TICKS_PER_SECOND)?;
    secs.checked_add(&TimeDelta::nanoseconds(
        (ticks % TICKS_PER_SECOND) * NANOS_PER_TICK,
    ))
}
