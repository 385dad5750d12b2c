pub mod queries;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{minutes_between, validate_range, TrackerError};
use crate::timer::SessionTimer;

const ACTIVE_TIMER_KEY: &str = "active_timer";

/// A persisted activity entry. `duration_minutes` is stored redundantly and
/// kept consistent with `start`/`end` on every write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: i64,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub duration_minutes: f64,
    pub category: String,
    pub topic: Option<String>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
}

/// Input for insertion; the store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub duration_minutes: f64,
    pub category: String,
    pub topic: Option<String>,
    pub notes: Option<String>,
}

/// Partial update for an existing entry. `None` leaves a field untouched.
/// Touching `start` or `end` revalidates the range and recomputes the
/// stored duration.
#[derive(Debug, Clone, Default)]
pub struct EntryPatch {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub category: Option<String>,
    pub topic: Option<String>,
    pub notes: Option<String>,
}

/// Client-side filter over the history. Date bounds are inclusive and apply
/// to the entry's start date. `categories: Some(empty)` matches nothing;
/// `None` means no category filter.
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub categories: Option<Vec<String>>,
}

impl EntryFilter {
    pub fn matches(&self, entry: &Entry) -> bool {
        let date = entry.start.date();
        if self.from.is_some_and(|from| date < from) {
            return false;
        }
        if self.to.is_some_and(|to| date > to) {
            return false;
        }
        match &self.categories {
            Some(selected) => selected.iter().any(|c| *c == entry.category),
            None => true,
        }
    }
}

/// Per-category goal targets, overwrite semantics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Goal {
    pub category: String,
    pub daily_goal_minutes: f64,
    pub weekly_goal_minutes: f64,
    pub monthly_goal_minutes: f64,
    pub priority: i64,
}

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create DB directory: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open SQLite DB: {}", path.display()))?;

        let store = Self { conn };
        store.init_schema()?;

        Ok(store)
    }

    pub fn init_schema(&self) -> Result<()> {
        queries::schema_statements()
            .iter()
            .try_for_each(|statement| {
                self.conn
                    .execute(statement, [])
                    .context("Failed to initialize schema")
                    .map(|_| ())
            })
    }

    pub fn insert_entry(&self, entry: &NewEntry) -> Result<i64> {
        validate_range(entry.start, entry.end)?;

        self.conn
            .execute(
                "INSERT INTO entries (start_ts, end_ts, duration_minutes, category, topic, notes, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    entry.start,
                    entry.end,
                    entry.duration_minutes,
                    entry.category,
                    entry.topic,
                    entry.notes,
                    Local::now().naive_local(),
                ],
            )
            .context("Failed to insert entry")?;

        Ok(self.conn.last_insert_rowid())
    }

    pub fn entry(&self, id: i64) -> Result<Entry> {
        self.conn
            .query_row(
                "SELECT id, start_ts, end_ts, duration_minutes, category, topic, notes, created_at
                 FROM entries WHERE id = ?1",
                params![id],
                map_entry_row,
            )
            .optional()
            .context("Failed to query entry")?
            .ok_or_else(|| TrackerError::NotFound(id).into())
    }

    pub fn entries(&self) -> Result<Vec<Entry>> {
        let mut statement = self.conn.prepare(
            "SELECT id, start_ts, end_ts, duration_minutes, category, topic, notes, created_at
             FROM entries
             ORDER BY start_ts DESC",
        )?;

        let rows = statement
            .query_map([], map_entry_row)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to query entries")?;

        Ok(rows)
    }

    pub fn entries_filtered(&self, filter: &EntryFilter) -> Result<Vec<Entry>> {
        if matches!(&filter.categories, Some(selected) if selected.is_empty()) {
            return Ok(Vec::new());
        }

        let rows = self
            .entries()?
            .into_iter()
            .filter(|entry| filter.matches(entry))
            .collect();

        Ok(rows)
    }

    /// Apply a partial update. The merged range is revalidated and the
    /// stored duration recomputed from it.
    pub fn update_entry(&self, id: i64, patch: &EntryPatch) -> Result<Entry> {
        let existing = self.entry(id)?;

        let start = patch.start.unwrap_or(existing.start);
        let end = patch.end.unwrap_or(existing.end);
        validate_range(start, end)?;
        let duration_minutes = minutes_between(start, end);

        let category = patch.category.clone().unwrap_or(existing.category);
        let topic = patch.topic.clone().or(existing.topic);
        let notes = patch.notes.clone().or(existing.notes);

        self.conn
            .execute(
                "UPDATE entries
                 SET start_ts = ?1, end_ts = ?2, duration_minutes = ?3,
                     category = ?4, topic = ?5, notes = ?6
                 WHERE id = ?7",
                params![start, end, duration_minutes, category, topic, notes, id],
            )
            .context("Failed to update entry")?;

        self.entry(id)
    }

    pub fn delete_entry(&self, id: i64) -> Result<()> {
        let deleted = self
            .conn
            .execute("DELETE FROM entries WHERE id = ?1", params![id])
            .context("Failed to delete entry")?;

        if deleted == 0 {
            return Err(TrackerError::NotFound(id).into());
        }

        Ok(())
    }

    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "REPLACE INTO settings (key, value) VALUES (?1, ?2)",
                params![key, value],
            )
            .context("Failed to save setting")?;

        Ok(())
    }

    pub fn setting(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to query setting")
    }

    pub fn delete_setting(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM settings WHERE key = ?1", params![key])
            .context("Failed to delete setting")?;

        Ok(())
    }

    pub fn upsert_goal(&self, goal: &Goal) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO goals (category, daily_goal_minutes, weekly_goal_minutes, monthly_goal_minutes, priority)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(category)
                 DO UPDATE SET daily_goal_minutes=excluded.daily_goal_minutes,
                               weekly_goal_minutes=excluded.weekly_goal_minutes,
                               monthly_goal_minutes=excluded.monthly_goal_minutes,
                               priority=excluded.priority",
                params![
                    goal.category,
                    goal.daily_goal_minutes,
                    goal.weekly_goal_minutes,
                    goal.monthly_goal_minutes,
                    goal.priority,
                ],
            )
            .context("Failed to upsert goal")?;

        Ok(())
    }

    pub fn goal(&self, category: &str) -> Result<Option<Goal>> {
        self.conn
            .query_row(
                "SELECT category, daily_goal_minutes, weekly_goal_minutes, monthly_goal_minutes, priority
                 FROM goals WHERE category = ?1",
                params![category],
                map_goal_row,
            )
            .optional()
            .context("Failed to query goal")
    }

    pub fn goals(&self) -> Result<Vec<Goal>> {
        let mut statement = self.conn.prepare(
            "SELECT category, daily_goal_minutes, weekly_goal_minutes, monthly_goal_minutes, priority
             FROM goals
             ORDER BY priority DESC, category ASC",
        )?;

        let rows = statement
            .query_map([], map_goal_row)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to query goals")?;

        Ok(rows)
    }

    /// The active timer snapshot persisted between CLI invocations. Absent
    /// snapshot means an idle timer.
    pub fn load_timer(&self) -> Result<SessionTimer> {
        let Some(raw) = self.setting(ACTIVE_TIMER_KEY)? else {
            return Ok(SessionTimer::new());
        };

        serde_json::from_str(&raw).context("Failed to parse active timer snapshot")
    }

    pub fn save_timer(&self, timer: &SessionTimer) -> Result<()> {
        let raw = serde_json::to_string(timer).context("Failed to serialize timer snapshot")?;
        self.set_setting(ACTIVE_TIMER_KEY, &raw)
    }

    pub fn clear_timer(&self) -> Result<()> {
        self.delete_setting(ACTIVE_TIMER_KEY)
    }
}

fn map_entry_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Entry> {
    Ok(Entry {
        id: row.get(0)?,
        start: row.get(1)?,
        end: row.get(2)?,
        duration_minutes: row.get(3)?,
        category: row.get(4)?,
        topic: row.get(5)?,
        notes: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn map_goal_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Goal> {
    Ok(Goal {
        category: row.get(0)?,
        daily_goal_minutes: row.get(1)?,
        weekly_goal_minutes: row.get(2)?,
        monthly_goal_minutes: row.get(3)?,
        priority: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::{EntryFilter, EntryPatch, Goal, NewEntry, Store};
    use crate::error::TrackerError;
    use crate::timer::{SessionMeta, SessionTimer, TimerPhase};
    use chrono::{NaiveDate, NaiveDateTime};
    use tempfile::TempDir;

    fn open_store() -> (TempDir, Store) {
        let dir = TempDir::new().expect("temp dir");
        let store = Store::open(&dir.path().join("db").join("tracker.db")).expect("store");
        (dir, store)
    }

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn study_entry(day: u32) -> NewEntry {
        NewEntry {
            start: at(day, 9, 0),
            end: at(day, 10, 30),
            duration_minutes: 90.0,
            category: "Study".to_string(),
            topic: Some("rust".to_string()),
            notes: None,
        }
    }

    #[test]
    fn insert_then_query_round_trips() {
        let (_dir, store) = open_store();
        let new = study_entry(10);
        let id = store.insert_entry(&new).unwrap();

        let fetched = store.entry(id).unwrap();
        assert_eq!(fetched.id, id);
        assert_eq!(fetched.start, new.start);
        assert_eq!(fetched.end, new.end);
        assert_eq!(fetched.duration_minutes, new.duration_minutes);
        assert_eq!(fetched.category, new.category);
        assert_eq!(fetched.topic, new.topic);
        assert_eq!(fetched.notes, new.notes);

        // Immediately visible to list queries as well.
        let all = store.entries().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, id);
    }

    #[test]
    fn insert_rejects_inverted_range() {
        let (_dir, store) = open_store();
        let mut bad = study_entry(10);
        bad.end = bad.start;

        let error = store.insert_entry(&bad).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<TrackerError>(),
            Some(TrackerError::InvalidDuration { .. })
        ));
        assert!(store.entries().unwrap().is_empty());
    }

    #[test]
    fn entries_are_ordered_by_start_desc() {
        let (_dir, store) = open_store();
        store.insert_entry(&study_entry(10)).unwrap();
        store.insert_entry(&study_entry(12)).unwrap();
        store.insert_entry(&study_entry(11)).unwrap();

        let all = store.entries().unwrap();
        let days: Vec<u32> = all
            .iter()
            .map(|e| chrono::Datelike::day(&e.start.date()))
            .collect();
        assert_eq!(days, vec![12, 11, 10]);
    }

    #[test]
    fn update_recomputes_duration_and_merges_fields() {
        let (_dir, store) = open_store();
        let id = store.insert_entry(&study_entry(10)).unwrap();

        let updated = store
            .update_entry(
                id,
                &EntryPatch {
                    end: Some(at(10, 11, 0)),
                    category: Some("Work".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.end, at(10, 11, 0));
        assert_eq!(updated.duration_minutes, 120.0);
        assert_eq!(updated.category, "Work");
        // Untouched fields survive the patch.
        assert_eq!(updated.topic.as_deref(), Some("rust"));
    }

    #[test]
    fn update_rejects_inverted_range_and_leaves_row_unchanged() {
        let (_dir, store) = open_store();
        let id = store.insert_entry(&study_entry(10)).unwrap();

        let error = store
            .update_entry(
                id,
                &EntryPatch {
                    end: Some(at(10, 8, 0)),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(
            error.downcast_ref::<TrackerError>(),
            Some(TrackerError::InvalidDuration { .. })
        ));

        let row = store.entry(id).unwrap();
        assert_eq!(row.end, at(10, 10, 30));
        assert_eq!(row.duration_minutes, 90.0);
    }

    #[test]
    fn missing_ids_surface_not_found() {
        let (_dir, store) = open_store();

        let error = store.entry(42).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<TrackerError>(),
            Some(TrackerError::NotFound(42))
        ));

        let error = store.delete_entry(42).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<TrackerError>(),
            Some(TrackerError::NotFound(42))
        ));

        let error = store
            .update_entry(42, &EntryPatch::default())
            .unwrap_err();
        assert!(matches!(
            error.downcast_ref::<TrackerError>(),
            Some(TrackerError::NotFound(42))
        ));
    }

    #[test]
    fn delete_removes_the_row() {
        let (_dir, store) = open_store();
        let id = store.insert_entry(&study_entry(10)).unwrap();

        store.delete_entry(id).unwrap();
        assert!(store.entries().unwrap().is_empty());
    }

    #[test]
    fn filter_applies_inclusive_bounds_and_categories() {
        let (_dir, store) = open_store();
        store.insert_entry(&study_entry(9)).unwrap();
        store.insert_entry(&study_entry(10)).unwrap();
        let mut work = study_entry(11);
        work.category = "Work".to_string();
        store.insert_entry(&work).unwrap();

        let filter = EntryFilter {
            from: Some(NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()),
            to: Some(NaiveDate::from_ymd_opt(2026, 3, 11).unwrap()),
            categories: None,
        };
        assert_eq!(store.entries_filtered(&filter).unwrap().len(), 2);

        let filter = EntryFilter {
            categories: Some(vec!["Work".to_string()]),
            ..Default::default()
        };
        let rows = store.entries_filtered(&filter).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].category, "Work");

        // An empty selection is an empty result, not an error.
        let filter = EntryFilter {
            categories: Some(Vec::new()),
            ..Default::default()
        };
        assert!(store.entries_filtered(&filter).unwrap().is_empty());
    }

    #[test]
    fn settings_are_last_writer_wins() {
        let (_dir, store) = open_store();
        assert_eq!(store.setting("daily_goal").unwrap(), None);

        store.set_setting("daily_goal", "120").unwrap();
        store.set_setting("daily_goal", "90").unwrap();
        assert_eq!(store.setting("daily_goal").unwrap().as_deref(), Some("90"));
    }

    #[test]
    fn goal_upsert_overwrites() {
        let (_dir, store) = open_store();
        let mut goal = Goal {
            category: "Study".to_string(),
            daily_goal_minutes: 60.0,
            weekly_goal_minutes: 300.0,
            monthly_goal_minutes: 1200.0,
            priority: 1,
        };
        store.upsert_goal(&goal).unwrap();

        goal.daily_goal_minutes = 90.0;
        store.upsert_goal(&goal).unwrap();

        let fetched = store.goal("Study").unwrap().expect("goal row");
        assert_eq!(fetched.daily_goal_minutes, 90.0);
        assert_eq!(store.goals().unwrap().len(), 1);
        assert_eq!(store.goal("Work").unwrap(), None);
    }

    #[test]
    fn timer_snapshot_persists_across_store_handles() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("tracker.db");

        {
            let store = Store::open(&path).unwrap();
            let mut timer = store.load_timer().unwrap();
            assert_eq!(timer.phase(), TimerPhase::Idle);

            timer
                .start(
                    at(10, 9, 0),
                    SessionMeta {
                        category: "Study".to_string(),
                        topic: None,
                        notes: None,
                    },
                )
                .unwrap();
            store.save_timer(&timer).unwrap();
        }

        let store = Store::open(&path).unwrap();
        let timer = store.load_timer().unwrap();
        assert_eq!(timer.phase(), TimerPhase::Running);
        assert_eq!(timer.started_at(), Some(at(10, 9, 0)));

        store.clear_timer().unwrap();
        assert_eq!(store.load_timer().unwrap(), SessionTimer::new());
    }
}
