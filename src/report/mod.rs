//! Composes store history and metrics into the plain structures the CLI
//! renders. Grouped rows come from the filtered range; streaks and goal
//! progress always look at the full history.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::db::{Entry, EntryFilter, Goal, Store};
use crate::metrics;

/// Grouping dimension for the summary table. Single choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    Date,
    Week,
    Month,
    Category,
    Topic,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub key: String,
    pub minutes: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Streaks {
    pub daily: u32,
    pub weekly: u32,
    pub monthly: u32,
}

/// Goal progress for one category across the three period lengths.
/// Ratios are capped at 1.0; a zero goal reports 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalProgressRow {
    pub category: String,
    pub priority: i64,
    pub daily_minutes: f64,
    pub daily_goal_minutes: f64,
    pub daily_progress: f64,
    pub weekly_minutes: f64,
    pub weekly_goal_minutes: f64,
    pub weekly_progress: f64,
    pub monthly_minutes: f64,
    pub monthly_goal_minutes: f64,
    pub monthly_progress: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub rows: Vec<SummaryRow>,
    pub streaks: Streaks,
    pub goal_progress: Vec<GoalProgressRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub today_minutes: f64,
    pub daily_goal_minutes: f64,
    pub daily_goal_progress: f64,
    pub streaks: Streaks,
    pub goal_progress: Vec<GoalProgressRow>,
}

/// Fallback dashboard goal when no per-category goal is configured,
/// stored under the `daily_goal` settings key.
pub const DEFAULT_DAILY_GOAL_MINUTES: f64 = 120.0;

pub fn build_report(
    store: &Store,
    filter: &EntryFilter,
    group_by: GroupBy,
    today: NaiveDate,
) -> Result<Report> {
    let history = store.entries()?;
    let filtered = store.entries_filtered(filter)?;
    let goals = store.goals()?;

    Ok(Report {
        rows: group_rows(&filtered, group_by),
        streaks: build_streaks(&history, today),
        goal_progress: goal_progress_rows(&history, &goals, today),
    })
}

pub fn build_dashboard(store: &Store, today: NaiveDate) -> Result<Dashboard> {
    let history = store.entries()?;
    let goals = store.goals()?;

    let today_minutes = metrics::period_total(&history, |e| e.start.date() == today);
    let daily_goal_minutes = match store.setting("daily_goal")? {
        Some(raw) => raw
            .parse::<f64>()
            .with_context(|| format!("Invalid daily_goal setting: {raw}"))?,
        None => DEFAULT_DAILY_GOAL_MINUTES,
    };

    Ok(Dashboard {
        today_minutes,
        daily_goal_minutes,
        daily_goal_progress: metrics::goal_progress(today_minutes, daily_goal_minutes),
        streaks: build_streaks(&history, today),
        goal_progress: goal_progress_rows(&history, &goals, today),
    })
}

pub fn build_streaks(history: &[Entry], today: NaiveDate) -> Streaks {
    Streaks {
        daily: metrics::daily_streak(history, today),
        weekly: metrics::weekly_streak(history, today),
        monthly: metrics::monthly_streak(history, today),
    }
}

/// Per-bucket duration sums. Calendar dimensions sort ascending by bucket;
/// category/topic sort descending by minutes, name as tie-break.
pub fn group_rows(entries: &[Entry], group_by: GroupBy) -> Vec<SummaryRow> {
    match group_by {
        GroupBy::Date => calendar_rows(entries, |e| e.start.date()),
        GroupBy::Week => calendar_rows(entries, |e| metrics::week_start(e.start.date())),
        GroupBy::Month => calendar_rows(entries, |e| metrics::month_start(e.start.date())),
        GroupBy::Category => label_rows(entries, |e| e.category.clone()),
        GroupBy::Topic => label_rows(entries, |e| {
            e.topic.clone().unwrap_or_else(|| "(none)".to_string())
        }),
    }
}

pub fn goal_progress_rows(
    history: &[Entry],
    goals: &[Goal],
    today: NaiveDate,
) -> Vec<GoalProgressRow> {
    let week = metrics::week_start(today);
    let month = metrics::month_start(today);

    goals
        .iter()
        .map(|goal| {
            let daily_minutes = metrics::period_total(history, |e| {
                e.category == goal.category && e.start.date() == today
            });
            let weekly_minutes = metrics::period_total(history, |e| {
                e.category == goal.category && metrics::week_start(e.start.date()) == week
            });
            let monthly_minutes = metrics::period_total(history, |e| {
                e.category == goal.category && metrics::month_start(e.start.date()) == month
            });

            GoalProgressRow {
                category: goal.category.clone(),
                priority: goal.priority,
                daily_minutes,
                daily_goal_minutes: goal.daily_goal_minutes,
                daily_progress: metrics::goal_progress(daily_minutes, goal.daily_goal_minutes),
                weekly_minutes,
                weekly_goal_minutes: goal.weekly_goal_minutes,
                weekly_progress: metrics::goal_progress(weekly_minutes, goal.weekly_goal_minutes),
                monthly_minutes,
                monthly_goal_minutes: goal.monthly_goal_minutes,
                monthly_progress: metrics::goal_progress(
                    monthly_minutes,
                    goal.monthly_goal_minutes,
                ),
            }
        })
        .collect()
}

fn calendar_rows<F>(entries: &[Entry], bucket: F) -> Vec<SummaryRow>
where
    F: Fn(&Entry) -> NaiveDate,
{
    let totals = entries.iter().fold(BTreeMap::new(), |mut acc, entry| {
        *acc.entry(bucket(entry)).or_insert(0.0) += entry.duration_minutes;
        acc
    });

    totals
        .into_iter()
        .map(|(date, minutes)| SummaryRow {
            key: date.format("%Y-%m-%d").to_string(),
            minutes,
        })
        .collect()
}

fn label_rows<F>(entries: &[Entry], label: F) -> Vec<SummaryRow>
where
    F: Fn(&Entry) -> String,
{
    let totals = entries.iter().fold(HashMap::new(), |mut acc, entry| {
        *acc.entry(label(entry)).or_insert(0.0) += entry.duration_minutes;
        acc
    });

    let mut rows = totals
        .into_iter()
        .map(|(key, minutes)| SummaryRow { key, minutes })
        .collect::<Vec<_>>();

    rows.sort_by(|left, right| {
        right
            .minutes
            .partial_cmp(&left.minutes)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| left.key.cmp(&right.key))
    });

    rows
}
