use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    error::InferenceError,
    pattern::Pattern,
    phase::{CycleModel, LightState},
};

/// What a live display shows: the current predicted state and how long until
/// it flips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Countdown {
    pub state: LightState,
    pub phase_started_at: DateTime<Utc>,
    pub changes_at: DateTime<Utc>,
    pub remaining_ms: i64,
    pub next_green_start: DateTime<Utc>,
}

pub fn countdown(pattern: &Pattern, now: DateTime<Utc>) -> Result<Countdown, InferenceError> {
    let model = CycleModel::from_pattern(pattern).ok_or(InferenceError::NoPattern)?;
    let phase = model.phase_at(now);

    Ok(Countdown {
        state: phase.state,
        phase_started_at: phase.started_at,
        changes_at: phase.ends_at,
        remaining_ms: phase.ends_at.timestamp_millis() - now.timestamp_millis(),
        next_green_start: model.next_green_start_after(now),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Observation;
    use crate::inference::{compute_pattern, InferenceConfig};
    use chrono::TimeZone;

    fn t(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_000 + ms).unwrap()
    }

    fn regular_pattern(now: DateTime<Utc>) -> Pattern {
        let history: Vec<Observation> = (0..3)
            .map(|i| Observation {
                id: format!("c{i}"),
                traffic_light_id: "light-1".to_string(),
                green_start: t(i * 10_000),
                green_end: t(i * 10_000 + 4_000),
                duration_ms: 4_000,
                created_at: t(i * 10_000 + 4_000),
            })
            .collect();
        compute_pattern(&history, now, &InferenceConfig::default()).unwrap()
    }

    #[test]
    fn counts_down_to_end_of_green() {
        let now = t(31_500);
        let countdown = countdown(&regular_pattern(now), now).unwrap();

        assert_eq!(countdown.state, LightState::Green);
        assert_eq!(countdown.phase_started_at, t(30_000));
        assert_eq!(countdown.changes_at, t(34_000));
        assert_eq!(countdown.remaining_ms, 2_500);
        assert_eq!(countdown.next_green_start, t(40_000));
    }

    #[test]
    fn counts_down_to_next_green_while_red() {
        let now = t(25_000);
        let countdown = countdown(&regular_pattern(now), now).unwrap();

        assert_eq!(countdown.state, LightState::Red);
        assert_eq!(countdown.changes_at, t(30_000));
        assert_eq!(countdown.remaining_ms, 5_000);
        assert_eq!(countdown.next_green_start, countdown.changes_at);
    }

    #[test]
    fn agrees_with_state_function_at_any_instant() {
        let pattern = regular_pattern(t(25_000));
        for ms in [-12_345, 0, 3_999, 4_000, 77_777, 1_000_000] {
            let at = t(ms);
            assert_eq!(
                Some(countdown(&pattern, at).unwrap().state),
                crate::inference::state_at(&pattern, at)
            );
        }
    }

    #[test]
    fn requires_a_cycle() {
        let pattern = compute_pattern(&[], t(0), &InferenceConfig::default()).unwrap();
        assert_eq!(countdown(&pattern, t(0)).unwrap_err(), InferenceError::NoPattern);
    }
}
