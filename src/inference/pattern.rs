use chrono::{DateTime, Duration, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::db::models::Observation;

use super::{
    config::InferenceConfig,
    error::InferenceError,
    phase::CycleModel,
    stats::{coefficient_of_variation, mean_truncated, median, sample_std_dev},
};

/// How steady the gap between successive green starts is.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleRegularity {
    Consistent,
    Variable,
    Irregular,
}

impl ScheduleRegularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleRegularity::Consistent => "consistent",
            ScheduleRegularity::Variable => "variable",
            ScheduleRegularity::Irregular => "irregular",
        }
    }

    pub fn classify(variation: f64, config: &InferenceConfig) -> Self {
        if variation < config.consistent_max_variation {
            ScheduleRegularity::Consistent
        } else if variation < config.variable_max_variation {
            ScheduleRegularity::Variable
        } else {
            ScheduleRegularity::Irregular
        }
    }
}

/// Derived summary of a traffic light's capture history.
///
/// Never stored; recomputed from the raw captures on every request. Absent
/// fields mean "not enough data", never a default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pattern {
    /// True when a positive cycle length could be estimated.
    pub has_pattern: bool,
    pub total_captures: usize,

    /// Median green duration.
    pub typical_duration_ms: Option<i64>,
    pub average_duration_ms: Option<i64>,
    pub min_duration_ms: Option<i64>,
    pub max_duration_ms: Option<i64>,
    pub stddev_duration_ms: Option<f64>,

    /// Median gap between consecutive green starts.
    pub average_cycle_ms: Option<i64>,
    /// Remainder of the cycle after the typical green phase.
    pub red_duration_ms: Option<i64>,
    /// Coefficient of variation of those gaps.
    pub cycle_variation: Option<f64>,
    pub schedule_regularity: Option<ScheduleRegularity>,

    /// Latest green end seen.
    pub last_capture: Option<DateTime<Utc>>,
    /// Green start of the latest capture; projections are whole cycles from here.
    pub cycle_anchor: Option<DateTime<Utc>>,
    pub next_green_start: Option<DateTime<Utc>>,
    pub next_green_end: Option<DateTime<Utc>>,

    pub computed_at: DateTime<Utc>,
}

impl Pattern {
    fn empty(now: DateTime<Utc>) -> Self {
        Self {
            has_pattern: false,
            total_captures: 0,
            typical_duration_ms: None,
            average_duration_ms: None,
            min_duration_ms: None,
            max_duration_ms: None,
            stddev_duration_ms: None,
            average_cycle_ms: None,
            red_duration_ms: None,
            cycle_variation: None,
            schedule_regularity: None,
            last_capture: None,
            cycle_anchor: None,
            next_green_start: None,
            next_green_end: None,
            computed_at: now,
        }
    }
}

/// Reject captures whose timestamps are inverted or disagree with their
/// recorded duration.
pub(crate) fn ensure_well_formed(observations: &[Observation]) -> Result<(), InferenceError> {
    for observation in observations {
        let measured_ms = observation.measured_span_ms();
        if observation.green_end <= observation.green_start || measured_ms <= 0 {
            return Err(InferenceError::NonPositiveGreenPhase {
                id: observation.id.clone(),
            });
        }
        if measured_ms != observation.duration_ms {
            return Err(InferenceError::DurationMismatch {
                id: observation.id.clone(),
                recorded_ms: observation.duration_ms,
                measured_ms,
            });
        }
    }
    Ok(())
}

/// Summarize a capture history as of `now`.
///
/// Input order does not matter. Fails fast on the first malformed capture.
pub fn compute_pattern(
    observations: &[Observation],
    now: DateTime<Utc>,
    config: &InferenceConfig,
) -> Result<Pattern, InferenceError> {
    ensure_well_formed(observations)?;

    if observations.is_empty() {
        return Ok(Pattern::empty(now));
    }

    let mut sorted: Vec<&Observation> = observations.iter().collect();
    sorted.sort_by(|a, b| {
        a.green_start
            .cmp(&b.green_start)
            .then_with(|| a.green_end.cmp(&b.green_end))
    });

    let durations: Vec<i64> = sorted.iter().map(|o| o.duration_ms).collect();
    let gaps: Vec<i64> = sorted
        .windows(2)
        .map(|pair| {
            pair[1].green_start.timestamp_millis() - pair[0].green_start.timestamp_millis()
        })
        .collect();

    let typical_duration_ms = median(&durations);

    // Identical green starts give a zero median gap; there is no cycle to project.
    let average_cycle_ms = median(&gaps).filter(|&cycle| cycle > 0);

    let red_duration_ms = match (average_cycle_ms, typical_duration_ms) {
        (Some(cycle), Some(green)) => Some((cycle - green).max(0)),
        _ => None,
    };

    let cycle_variation = if gaps.len() >= 2 {
        coefficient_of_variation(&gaps)
    } else {
        None
    };
    let schedule_regularity =
        cycle_variation.map(|variation| ScheduleRegularity::classify(variation, config));

    let cycle_anchor = sorted.last().map(|o| o.green_start);
    let last_capture = sorted.iter().map(|o| o.green_end).max();

    let model = match (cycle_anchor, average_cycle_ms, typical_duration_ms) {
        (Some(anchor), Some(cycle), Some(green)) => CycleModel::new(anchor, cycle, green),
        _ => None,
    };
    let next_green_start = model.map(|m| m.next_green_start_after(now));
    let next_green_end = match (next_green_start, typical_duration_ms) {
        (Some(start), Some(green)) => Some(start + Duration::milliseconds(green)),
        _ => None,
    };

    let pattern = Pattern {
        has_pattern: model.is_some(),
        total_captures: sorted.len(),
        typical_duration_ms,
        average_duration_ms: mean_truncated(&durations),
        min_duration_ms: durations.iter().copied().min(),
        max_duration_ms: durations.iter().copied().max(),
        stddev_duration_ms: sample_std_dev(&durations),
        average_cycle_ms,
        red_duration_ms,
        cycle_variation,
        schedule_regularity,
        last_capture,
        cycle_anchor,
        next_green_start,
        next_green_end,
        computed_at: now,
    };

    debug!(
        "pattern over {} captures: cycle={:?}ms green={:?}ms regularity={:?}",
        pattern.total_captures,
        pattern.average_cycle_ms,
        pattern.typical_duration_ms,
        pattern.schedule_regularity.map(|r| r.as_str()),
    );

    Ok(pattern)
}
