pub const CREATE_ENTRIES: &str = r#"
CREATE TABLE IF NOT EXISTS entries (
  id               INTEGER PRIMARY KEY AUTOINCREMENT,
  start_ts         TEXT NOT NULL,
  end_ts           TEXT NOT NULL,
  duration_minutes REAL NOT NULL DEFAULT 0,
  category         TEXT NOT NULL,
  topic            TEXT,
  notes            TEXT,
  created_at       TEXT NOT NULL
);
"#;

pub const CREATE_SETTINGS: &str = r#"
CREATE TABLE IF NOT EXISTS settings (
  key   TEXT PRIMARY KEY,
  value TEXT NOT NULL
);
"#;

pub const CREATE_GOALS: &str = r#"
CREATE TABLE IF NOT EXISTS goals (
  category             TEXT PRIMARY KEY,
  daily_goal_minutes   REAL NOT NULL DEFAULT 0,
  weekly_goal_minutes  REAL NOT NULL DEFAULT 0,
  monthly_goal_minutes REAL NOT NULL DEFAULT 0,
  priority             INTEGER NOT NULL DEFAULT 0
);
"#;

pub const INDEX_ENTRIES_START_TS: &str =
    "CREATE INDEX IF NOT EXISTS idx_entries_start_ts ON entries(start_ts);";

pub const INDEX_ENTRIES_CATEGORY: &str =
    "CREATE INDEX IF NOT EXISTS idx_entries_category ON entries(category);";

pub fn schema_statements() -> Vec<&'static str> {
    vec![
        CREATE_ENTRIES,
        CREATE_SETTINGS,
        CREATE_GOALS,
        INDEX_ENTRIES_START_TS,
        INDEX_ENTRIES_CATEGORY,
    ]
}
