//! Flat tabular export of the activity list. Columns are the entry fields;
//! timestamps keep second precision, so values round-trip well past the
//! minute granularity the rest of the tool works at.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::db::Entry;

pub fn write_csv<W: Write>(entries: &[Entry], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    for entry in entries {
        csv_writer
            .serialize(entry)
            .context("Failed to serialize entry to CSV")?;
    }

    csv_writer.flush().context("Failed to flush CSV output")?;
    Ok(())
}

pub fn export_to_file(entries: &[Entry], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create export directory: {}", parent.display())
        })?;
    }

    let file = fs::File::create(path)
        .with_context(|| format!("Failed to create export file: {}", path.display()))?;

    write_csv(entries, file)
}

pub fn default_export_path(export_dir: &Path, today: NaiveDate) -> PathBuf {
    export_dir.join(format!("time_tracker_{}.csv", today.format("%Y-%m-%d")))
}
