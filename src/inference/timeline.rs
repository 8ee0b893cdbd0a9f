use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{
    config::InferenceConfig,
    error::InferenceError,
    pattern::Pattern,
    phase::{CycleModel, LightState},
};

const MILLIS_PER_HOUR: i64 = 3_600_000;

/// Half-open interval `[start, end)` of absolute instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, InferenceError> {
        if end <= start {
            return Err(InferenceError::EmptyWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// `[start, start + length)`.
    pub fn following(start: DateTime<Utc>, length: Duration) -> Result<Self, InferenceError> {
        let end = start
            .checked_add_signed(length)
            .ok_or(InferenceError::WindowOutOfRange {
                from: start,
                length_ms: length.num_milliseconds(),
            })?;
        Self::new(start, end)
    }

    /// `[now - length, now)`.
    pub fn lookback(now: DateTime<Utc>, length: Duration) -> Result<Self, InferenceError> {
        let start = now
            .checked_sub_signed(length)
            .ok_or(InferenceError::WindowOutOfRange {
                from: now,
                length_ms: length.num_milliseconds(),
            })?;
        Self::new(start, now)
    }

    pub fn length_ms(&self) -> i64 {
        (self.end - self.start).num_milliseconds()
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub state: LightState,
}

impl TimelineEntry {
    pub fn duration_ms(&self) -> i64 {
        (self.end_time - self.start_time).num_milliseconds()
    }
}

/// Project green/red intervals over `window`.
///
/// Entries are contiguous, alternate in state and exactly cover the window;
/// the first starts at `window.start` and the last ends at `window.end`.
/// Windows longer than `config.max_window_hours` are rejected.
pub fn compute_timeline(
    pattern: &Pattern,
    window: TimeWindow,
    config: &InferenceConfig,
) -> Result<Vec<TimelineEntry>, InferenceError> {
    let length_ms = window.length_ms();
    if length_ms > i64::from(config.max_window_hours) * MILLIS_PER_HOUR {
        return Err(InferenceError::WindowTooLong {
            length_ms,
            max_hours: config.max_window_hours,
        });
    }

    let model = CycleModel::from_pattern(pattern).ok_or(InferenceError::NoPattern)?;
    Ok(synthesize(&model, window))
}

pub(crate) fn synthesize(model: &CycleModel, window: TimeWindow) -> Vec<TimelineEntry> {
    let mut entries: Vec<TimelineEntry> = Vec::new();
    let mut cursor = window.start;

    while cursor < window.end {
        let phase = model.phase_at(cursor);
        let stop = phase.ends_at.min(window.end);

        match entries.last_mut() {
            // A light that is green the whole cycle yields back-to-back green phases.
            Some(last) if last.state == phase.state => last.end_time = stop,
            _ => entries.push(TimelineEntry {
                start_time: cursor,
                end_time: stop,
                state: phase.state,
            }),
        }

        cursor = stop;
    }

    entries
}
