use serde::{Deserialize, Serialize};

use crate::db::models::Observation;

use super::{
    config::InferenceConfig,
    error::InferenceError,
    pattern::{ensure_well_formed, Pattern},
    phase::{CycleModel, LightState},
    timeline::TimeWindow,
};

/// How well the cycle model explains the captures it was meant to describe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Validation {
    pub is_valid: bool,
    pub matches: usize,
    pub total: usize,
    /// `matches / total`, or 0 when nothing fell in the lookback window.
    pub match_rate: f64,
}

/// Replays every capture whose green start lies in `lookback` through the
/// state function. A capture matches when the model predicts green at its
/// recorded green start.
pub fn validate_pattern(
    observations: &[Observation],
    pattern: &Pattern,
    lookback: TimeWindow,
    config: &InferenceConfig,
) -> Result<Validation, InferenceError> {
    ensure_well_formed(observations)?;
    let model = CycleModel::from_pattern(pattern).ok_or(InferenceError::NoPattern)?;

    let (matches, total) = observations
        .iter()
        .filter(|o| lookback.contains(o.green_start))
        .fold((0usize, 0usize), |(matches, total), o| {
            let hit = model.state_at(o.green_start) == LightState::Green;
            (matches + usize::from(hit), total + 1)
        });

    let match_rate = if total == 0 {
        0.0
    } else {
        matches as f64 / total as f64
    };

    Ok(Validation {
        is_valid: total > 0 && match_rate >= config.validation_match_threshold,
        matches,
        total,
        match_rate,
    })
}
