//! Schedule captures: one observed green phase of a traffic light.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Observation {
    pub id: String,
    pub traffic_light_id: String,
    pub green_start: DateTime<Utc>,
    pub green_end: DateTime<Utc>,
    pub duration_ms: i64,
    pub created_at: DateTime<Utc>,
}

impl Observation {
    /// Milliseconds between `green_start` and `green_end` as measured on the
    /// millisecond grid. This is the value `duration_ms` must equal.
    pub fn measured_span_ms(&self) -> i64 {
        span_ms(self.green_start, self.green_end)
    }
}

/// Whole-millisecond distance from `from` to `to` (negative if `to` is earlier).
pub fn span_ms(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    to.timestamp_millis() - from.timestamp_millis()
}
