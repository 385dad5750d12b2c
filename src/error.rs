use chrono::NaiveDateTime;
use thiserror::Error;

use crate::timer::TimerPhase;

/// Domain failures surfaced to the caller. Store I/O failures are carried
/// separately through `anyhow` with context.
#[derive(Debug, Error, PartialEq)]
pub enum TrackerError {
    #[error("invalid timer transition: cannot {command} while {phase}")]
    InvalidTransition {
        command: &'static str,
        phase: TimerPhase,
    },

    #[error("end time must be after start time (start {start}, end {end})")]
    InvalidDuration {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    #[error("no entry with id {0}")]
    NotFound(i64),
}

/// Shared range check for manual entries and edits. A non-positive span is
/// rejected before anything reaches the store.
pub fn validate_range(start: NaiveDateTime, end: NaiveDateTime) -> Result<(), TrackerError> {
    if end <= start {
        return Err(TrackerError::InvalidDuration { start, end });
    }
    Ok(())
}

/// Minutes between two timestamps, at second resolution.
pub fn minutes_between(start: NaiveDateTime, end: NaiveDateTime) -> f64 {
    (end - start).num_seconds() as f64 / 60.0
}
