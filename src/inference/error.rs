use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum InferenceError {
    #[error("observation {id} ends at or before it starts")]
    NonPositiveGreenPhase { id: String },

    #[error("observation {id} records {recorded_ms}ms but its timestamps span {measured_ms}ms")]
    DurationMismatch {
        id: String,
        recorded_ms: i64,
        measured_ms: i64,
    },

    #[error("pattern has no cycle estimate")]
    NoPattern,

    #[error("window end {end} is not after window start {start}")]
    EmptyWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("window of {length_ms}ms from {from} leaves the representable time range")]
    WindowOutOfRange { from: DateTime<Utc>, length_ms: i64 },

    #[error("window of {length_ms}ms exceeds the {max_hours}h limit")]
    WindowTooLong { length_ms: i64, max_hours: u32 },
}
