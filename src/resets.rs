// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reset time calculations.
//!
//! Destiny resets at 17:00 UTC every day; the weekly reset is Tuesday
//! 17:00 UTC. Both are pure wall-clock derivations with no API involved,
//! so they stay fresh even when the network is down.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use serde::Serialize;

/// Hour of day (UTC) at which daily and weekly resets occur.
pub const RESET_HOUR_UTC: u32 = 17;

/// Reset instant on a given calendar day.
fn reset_instant_on(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(RESET_HOUR_UTC, 0, 0)
        .expect("reset hour is a valid time of day")
        .and_utc()
}

/// Next daily reset strictly after `now`.
///
/// The reset instant itself is not "future": at exactly 17:00:00 UTC the
/// following day's reset is returned.
pub fn next_daily_reset(now: DateTime<Utc>) -> DateTime<Utc> {
    let candidate = reset_instant_on(now.date_naive());
    if candidate > now {
        candidate
    } else {
        candidate + Duration::days(1)
    }
}

/// Next weekly reset (Tuesday 17:00 UTC) strictly after `now`.
pub fn next_weekly_reset(now: DateTime<Utc>) -> DateTime<Utc> {
    let days_ahead = (Weekday::Tue.num_days_from_monday() as i64
        - now.weekday().num_days_from_monday() as i64)
        .rem_euclid(7);
    let candidate = reset_instant_on(now.date_naive()) + Duration::days(days_ahead);
    if candidate > now {
        candidate
    } else {
        candidate + Duration::days(7)
    }
}

/// Whole days until `target`, rounded up, floored at 0 once passed.
pub fn days_until(target: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let remaining_ms = (target - now).num_milliseconds();
    if remaining_ms <= 0 {
        return 0;
    }
    const DAY_MS: i64 = 24 * 60 * 60 * 1000;
    (remaining_ms + DAY_MS - 1) / DAY_MS
}

/// Locally computed reset schedule.
///
/// Recomputed from the current time on every request; never cached across
/// reset boundaries.
#[derive(Debug, Clone, Serialize)]
pub struct ResetSchedule {
    pub daily_reset: DateTime<Utc>,
    pub weekly_reset: DateTime<Utc>,
    pub computed_at: DateTime<Utc>,
}

impl ResetSchedule {
    pub fn compute(now: DateTime<Utc>) -> Self {
        Self {
            daily_reset: next_daily_reset(now),
            weekly_reset: next_weekly_reset(now),
            computed_at: now,
        }
    }
}
