//! Session timer state machine.
//!
//! Wall-clock based: every transition takes the current time explicitly and
//! no internal thread advances state. The CLI passes `Local::now()` and polls
//! `elapsed` for display.
//!
//! ```text
//! Idle -> Running <-> Paused -> Idle (stop/cancel)
//! ```

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::db::NewEntry;
use crate::error::{minutes_between, TrackerError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerPhase {
    Idle,
    Running,
    Paused,
}

impl fmt::Display for TimerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerPhase::Idle => write!(f, "idle"),
            TimerPhase::Running => write!(f, "running"),
            TimerPhase::Paused => write!(f, "paused"),
        }
    }
}

/// Metadata captured at session start and carried into the finalized entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionMeta {
    pub category: String,
    pub topic: Option<String>,
    pub notes: Option<String>,
}

/// Outcome of `stop`. A non-positive effective duration is discarded rather
/// than saved, and the caller must be able to tell the two apart. The saved
/// entry's `duration_minutes` excludes all paused intervals, so it can be
/// smaller than the `start..end` span.
#[derive(Debug, Clone, PartialEq)]
pub enum StopOutcome {
    Saved(NewEntry),
    Discarded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionTimer {
    phase: TimerPhase,
    started_at: Option<NaiveDateTime>,
    pause_started_at: Option<NaiveDateTime>,
    accumulated_pause_secs: i64,
    meta: SessionMeta,
}

impl Default for SessionTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionTimer {
    pub fn new() -> Self {
        Self {
            phase: TimerPhase::Idle,
            started_at: None,
            pause_started_at: None,
            accumulated_pause_secs: 0,
            meta: SessionMeta::default(),
        }
    }

    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    pub fn meta(&self) -> &SessionMeta {
        &self.meta
    }

    pub fn started_at(&self) -> Option<NaiveDateTime> {
        self.started_at
    }

    pub fn start(&mut self, now: NaiveDateTime, meta: SessionMeta) -> Result<(), TrackerError> {
        if self.phase != TimerPhase::Idle {
            return Err(TrackerError::InvalidTransition {
                command: "start",
                phase: self.phase,
            });
        }

        self.phase = TimerPhase::Running;
        self.started_at = Some(now);
        self.pause_started_at = None;
        self.accumulated_pause_secs = 0;
        self.meta = meta;

        Ok(())
    }

    pub fn pause(&mut self, now: NaiveDateTime) -> Result<(), TrackerError> {
        if self.phase != TimerPhase::Running {
            return Err(TrackerError::InvalidTransition {
                command: "pause",
                phase: self.phase,
            });
        }

        self.phase = TimerPhase::Paused;
        self.pause_started_at = Some(now);

        Ok(())
    }

    pub fn resume(&mut self, now: NaiveDateTime) -> Result<(), TrackerError> {
        let pause_started_at = match (self.phase, self.pause_started_at) {
            (TimerPhase::Paused, Some(at)) => at,
            _ => {
                return Err(TrackerError::InvalidTransition {
                    command: "resume",
                    phase: self.phase,
                });
            }
        };

        self.accumulated_pause_secs += (now - pause_started_at).num_seconds().max(0);
        self.phase = TimerPhase::Running;
        self.pause_started_at = None;

        Ok(())
    }

    /// Finalize the session. When paused, the entry ends at the moment the
    /// pause began, not at the wall clock, so paused time is never counted.
    pub fn stop(&mut self, now: NaiveDateTime) -> Result<StopOutcome, TrackerError> {
        let started_at = match (self.phase, self.started_at) {
            (TimerPhase::Running | TimerPhase::Paused, Some(at)) => at,
            _ => {
                return Err(TrackerError::InvalidTransition {
                    command: "stop",
                    phase: self.phase,
                });
            }
        };

        let end = match self.phase {
            TimerPhase::Paused => self.pause_started_at.unwrap_or(now),
            _ => now,
        };
        let duration_minutes =
            minutes_between(started_at, end) - self.accumulated_pause_secs as f64 / 60.0;
        let meta = std::mem::take(&mut self.meta);
        self.reset();

        if duration_minutes <= 0.0 {
            return Ok(StopOutcome::Discarded);
        }

        Ok(StopOutcome::Saved(NewEntry {
            start: started_at,
            end,
            duration_minutes,
            category: meta.category,
            topic: meta.topic,
            notes: meta.notes,
        }))
    }

    /// Discard the session unconditionally. Safe to call in any phase.
    pub fn cancel(&mut self) {
        self.reset();
    }

    /// Live effective elapsed time; `None` while idle. Never mutates, so
    /// repeated polling is free.
    pub fn elapsed(&self, now: NaiveDateTime) -> Option<Duration> {
        let started_at = self.started_at?;
        let reference = match self.phase {
            TimerPhase::Idle => return None,
            TimerPhase::Paused => self.pause_started_at.unwrap_or(now),
            TimerPhase::Running => now,
        };

        let elapsed = reference - started_at - Duration::seconds(self.accumulated_pause_secs);
        Some(elapsed.max(Duration::zero()))
    }

    fn reset(&mut self) {
        self.phase = TimerPhase::Idle;
        self.started_at = None;
        self.pause_started_at = None;
        self.accumulated_pause_secs = 0;
        self.meta = SessionMeta::default();
    }
}

#[cfg(test)]
mod tests {
    use super::{SessionMeta, SessionTimer, StopOutcome, TimerPhase};
    use crate::error::TrackerError;
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 10)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn meta(category: &str) -> SessionMeta {
        SessionMeta {
            category: category.to_string(),
            topic: Some("reading".to_string()),
            notes: None,
        }
    }

    #[test]
    fn start_is_rejected_while_active() {
        let mut timer = SessionTimer::new();
        timer.start(at(9, 0), meta("Study")).unwrap();

        assert_eq!(
            timer.start(at(9, 5), meta("Work")),
            Err(TrackerError::InvalidTransition {
                command: "start",
                phase: TimerPhase::Running,
            })
        );

        timer.pause(at(9, 10)).unwrap();
        assert!(timer.start(at(9, 15), meta("Work")).is_err());
        // Failed commands leave the session untouched.
        assert_eq!(timer.meta().category, "Study");
    }

    #[test]
    fn pause_and_resume_guard_their_phases() {
        let mut timer = SessionTimer::new();
        assert!(timer.pause(at(9, 0)).is_err());
        assert!(timer.resume(at(9, 0)).is_err());
        assert!(timer.stop(at(9, 0)).is_err());

        timer.start(at(9, 0), meta("Study")).unwrap();
        assert!(timer.resume(at(9, 1)).is_err());
        timer.pause(at(9, 5)).unwrap();
        assert!(timer.pause(at(9, 6)).is_err());
    }

    #[test]
    fn stop_excludes_all_paused_intervals() {
        let mut timer = SessionTimer::new();
        timer.start(at(9, 0), meta("Study")).unwrap();
        timer.pause(at(9, 10)).unwrap();
        timer.resume(at(9, 15)).unwrap();
        timer.pause(at(9, 30)).unwrap();
        timer.resume(at(9, 40)).unwrap();

        let outcome = timer.stop(at(10, 0)).unwrap();
        let draft = match outcome {
            StopOutcome::Saved(draft) => draft,
            StopOutcome::Discarded => panic!("expected a saved entry"),
        };

        // 60 minutes wall clock, 15 minutes paused across two intervals.
        assert_eq!(draft.start, at(9, 0));
        assert_eq!(draft.end, at(10, 0));
        assert!((draft.duration_minutes - 45.0).abs() < 1e-9);
        assert_eq!(draft.category, "Study");
        assert_eq!(timer.phase(), TimerPhase::Idle);
    }

    #[test]
    fn stop_while_paused_ends_at_pause_start() {
        let mut timer = SessionTimer::new();
        timer.start(at(9, 0), meta("Study")).unwrap();
        timer.pause(at(9, 20)).unwrap();

        // Wall clock keeps moving during the pause; none of it counts.
        let outcome = timer.stop(at(11, 0)).unwrap();
        match outcome {
            StopOutcome::Saved(draft) => {
                assert_eq!(draft.end, at(9, 20));
                assert!((draft.duration_minutes - 20.0).abs() < 1e-9);
            }
            StopOutcome::Discarded => panic!("expected a saved entry"),
        }
    }

    #[test]
    fn zero_elapsed_stop_is_discarded() {
        let mut timer = SessionTimer::new();
        timer.start(at(9, 0), meta("Study")).unwrap();

        assert_eq!(timer.stop(at(9, 0)).unwrap(), StopOutcome::Discarded);
        assert_eq!(timer.phase(), TimerPhase::Idle);
    }

    #[test]
    fn pause_then_immediate_stop_is_discarded() {
        let mut timer = SessionTimer::new();
        timer.start(at(9, 0), meta("Study")).unwrap();
        timer.pause(at(9, 0)).unwrap();

        assert_eq!(timer.stop(at(9, 30)).unwrap(), StopOutcome::Discarded);
    }

    #[test]
    fn cancel_discards_accumulated_state() {
        let mut timer = SessionTimer::new();
        timer.start(at(9, 0), meta("Study")).unwrap();
        timer.pause(at(9, 10)).unwrap();
        timer.cancel();

        assert_eq!(timer.phase(), TimerPhase::Idle);
        assert_eq!(timer.elapsed(at(9, 30)), None);

        // A fresh session starts with no carried-over pause debt.
        timer.start(at(10, 0), meta("Work")).unwrap();
        let outcome = timer.stop(at(10, 30)).unwrap();
        match outcome {
            StopOutcome::Saved(draft) => {
                assert!((draft.duration_minutes - 30.0).abs() < 1e-9)
            }
            StopOutcome::Discarded => panic!("expected a saved entry"),
        }
    }

    #[test]
    fn elapsed_is_a_live_query() {
        let mut timer = SessionTimer::new();
        timer.start(at(9, 0), meta("Study")).unwrap();

        assert_eq!(timer.elapsed(at(9, 10)), Some(Duration::minutes(10)));
        assert_eq!(timer.elapsed(at(9, 20)), Some(Duration::minutes(20)));

        timer.pause(at(9, 30)).unwrap();
        // Frozen at the pause boundary no matter how late we poll.
        assert_eq!(timer.elapsed(at(9, 45)), Some(Duration::minutes(30)));
        assert_eq!(timer.elapsed(at(10, 45)), Some(Duration::minutes(30)));

        timer.resume(at(9, 50)).unwrap();
        assert_eq!(timer.elapsed(at(10, 0)), Some(Duration::minutes(40)));
    }

    #[test]
    fn timer_snapshot_round_trips_through_json() {
        let mut timer = SessionTimer::new();
        timer.start(at(9, 0), meta("Study")).unwrap();
        timer.pause(at(9, 10)).unwrap();
        timer.resume(at(9, 15)).unwrap();

        let json = serde_json::to_string(&timer).unwrap();
        let restored: SessionTimer = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, timer);
        assert_eq!(restored.elapsed(at(9, 30)), Some(Duration::minutes(25)));
    }
}
