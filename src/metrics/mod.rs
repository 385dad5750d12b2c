//! Pure aggregate computations over the activity history.
//!
//! Nothing here touches the store or the clock: callers pass the entry
//! snapshot and the reference date. Streaks walk calendar buckets backward
//! from today and stop at the first gap.
//!
//! Week buckets start on Monday; month buckets use calendar-month
//! arithmetic, not fixed 30-day windows.

use chrono::{Datelike, Days, Months, NaiveDate, NaiveDateTime};
use std::collections::BTreeSet;

use crate::db::Entry;

pub fn day_of(ts: NaiveDateTime) -> NaiveDate {
    ts.date()
}

/// Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.weekday().num_days_from_monday()))
}

pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Consecutive days with at least one entry, counting backward from `today`.
pub fn daily_streak(entries: &[Entry], today: NaiveDate) -> u32 {
    let buckets = bucket_set(entries, day_of);
    backward_streak(&buckets, |streak| {
        today.checked_sub_days(Days::new(u64::from(streak)))
    })
}

/// Consecutive Monday-start weeks with at least one entry.
pub fn weekly_streak(entries: &[Entry], today: NaiveDate) -> u32 {
    let buckets = bucket_set(entries, |ts| week_start(day_of(ts)));
    let this_week = week_start(today);
    backward_streak(&buckets, |streak| {
        this_week.checked_sub_days(Days::new(7 * u64::from(streak)))
    })
}

/// Consecutive calendar months with at least one entry.
pub fn monthly_streak(entries: &[Entry], today: NaiveDate) -> u32 {
    let buckets = bucket_set(entries, |ts| month_start(day_of(ts)));
    let this_month = month_start(today);
    backward_streak(&buckets, |streak| {
        this_month.checked_sub_months(Months::new(streak))
    })
}

/// Sum of `duration_minutes` over entries matching `predicate`.
pub fn period_total<F>(entries: &[Entry], predicate: F) -> f64
where
    F: Fn(&Entry) -> bool,
{
    entries
        .iter()
        .filter(|entry| predicate(entry))
        .map(|entry| entry.duration_minutes)
        .sum()
}

/// Progress toward a goal, capped at 1.0. A zero or negative goal means
/// "no goal configured" and always reports 0.
pub fn goal_progress(total_minutes: f64, goal_minutes: f64) -> f64 {
    if goal_minutes > 0.0 {
        (total_minutes / goal_minutes).min(1.0)
    } else {
        0.0
    }
}

fn bucket_set<F>(entries: &[Entry], bucket: F) -> BTreeSet<NaiveDate>
where
    F: Fn(NaiveDateTime) -> NaiveDate,
{
    entries.iter().map(|entry| bucket(entry.start)).collect()
}

/// Walk buckets newest-first. A bucket matching the expected position
/// extends the streak; a bucket earlier than expected is a gap and ends the
/// walk; later buckets (ahead of today) are skipped.
fn backward_streak<F>(buckets: &BTreeSet<NaiveDate>, expected_at: F) -> u32
where
    F: Fn(u32) -> Option<NaiveDate>,
{
    let mut streak = 0;
    for bucket in buckets.iter().rev() {
        let expected = match expected_at(streak) {
            Some(date) => date,
            None => break,
        };
        if *bucket == expected {
            streak += 1;
        } else if *bucket < expected {
            break;
        }
    }
    streak
}
