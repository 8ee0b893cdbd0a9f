//! State-at-time-T: the cycle arithmetic shared by projection, countdown,
//! timeline synthesis and validation.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::pattern::Pattern;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LightState {
    Green,
    Red,
}

/// The phase a given instant falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Phase {
    pub state: LightState,
    /// Cycle number relative to the anchor; negative before it.
    pub cycle_index: i64,
    pub cycle_start: DateTime<Utc>,
    pub started_at: DateTime<Utc>,
    /// Next state transition. For a light that is green the whole cycle this
    /// is the start of the following cycle.
    pub ends_at: DateTime<Utc>,
}

/// A strictly periodic green/red schedule on the millisecond grid.
///
/// Cycle `k` starts at `anchor + k * cycle_ms` and is green for the first
/// `green_ms` of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleModel {
    anchor: DateTime<Utc>,
    cycle_ms: i64,
    green_ms: i64,
}

impl CycleModel {
    /// Returns `None` unless both lengths are positive. The anchor is snapped
    /// down to a whole millisecond; green longer than the cycle is clamped.
    pub fn new(anchor: DateTime<Utc>, cycle_ms: i64, green_ms: i64) -> Option<Self> {
        if cycle_ms <= 0 || green_ms <= 0 {
            return None;
        }
        let anchor = DateTime::<Utc>::from_timestamp_millis(anchor.timestamp_millis())?;
        Some(Self {
            anchor,
            cycle_ms,
            green_ms: green_ms.min(cycle_ms),
        })
    }

    /// Model described by a pattern, anchored on its projected next green start.
    pub fn from_pattern(pattern: &Pattern) -> Option<Self> {
        if !pattern.has_pattern {
            return None;
        }
        Self::new(
            pattern.next_green_start?,
            pattern.average_cycle_ms?,
            pattern.typical_duration_ms?,
        )
    }

    pub fn phase_at(&self, at: DateTime<Utc>) -> Phase {
        let offset = at.timestamp_millis() - self.anchor.timestamp_millis();
        let cycle_index = offset.div_euclid(self.cycle_ms);
        let into_cycle = offset.rem_euclid(self.cycle_ms);

        let cycle_start = self.anchor + Duration::milliseconds(cycle_index * self.cycle_ms);
        let green_end = cycle_start + Duration::milliseconds(self.green_ms);
        let next_cycle = cycle_start + Duration::milliseconds(self.cycle_ms);

        if into_cycle < self.green_ms {
            Phase {
                state: LightState::Green,
                cycle_index,
                cycle_start,
                started_at: cycle_start,
                ends_at: green_end,
            }
        } else {
            Phase {
                state: LightState::Red,
                cycle_index,
                cycle_start,
                started_at: green_end,
                ends_at: next_cycle,
            }
        }
    }

    pub fn state_at(&self, at: DateTime<Utc>) -> LightState {
        self.phase_at(at).state
    }

    /// First green start strictly after `at`.
    pub fn next_green_start_after(&self, at: DateTime<Utc>) -> DateTime<Utc> {
        self.phase_at(at).cycle_start + Duration::milliseconds(self.cycle_ms)
    }
}

/// Predicted state of the light described by `pattern` at `at`, or `None`
/// when the pattern carries no cycle.
pub fn state_at(pattern: &Pattern, at: DateTime<Utc>) -> Option<LightState> {
    CycleModel::from_pattern(pattern).map(|model| model.state_at(at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_000 + ms).unwrap()
    }

    fn model() -> CycleModel {
        CycleModel::new(t(0), 10_000, 4_000).unwrap()
    }

    #[test]
    fn rejects_non_positive_lengths() {
        assert!(CycleModel::new(t(0), 0, 4_000).is_none());
        assert!(CycleModel::new(t(0), 10_000, 0).is_none());
        assert!(CycleModel::new(t(0), -5, 4_000).is_none());
    }

    #[test]
    fn classifies_within_cycle() {
        let m = model();
        assert_eq!(m.state_at(t(0)), LightState::Green);
        assert_eq!(m.state_at(t(3_999)), LightState::Green);
        assert_eq!(m.state_at(t(4_000)), LightState::Red);
        assert_eq!(m.state_at(t(9_999)), LightState::Red);
        assert_eq!(m.state_at(t(10_000)), LightState::Green);
    }

    #[test]
    fn instants_before_anchor_use_negative_cycles() {
        let m = model();
        let phase = m.phase_at(t(-1));
        assert_eq!(phase.cycle_index, -1);
        assert_eq!(phase.state, LightState::Red);
        assert_eq!(phase.started_at, t(-6_000));
        assert_eq!(phase.ends_at, t(0));

        let phase = m.phase_at(t(-10_000));
        assert_eq!(phase.cycle_index, -1);
        assert_eq!(phase.state, LightState::Green);
        assert_eq!(phase.ends_at, t(-6_000));

        assert_eq!(m.phase_at(t(-25_000)).cycle_index, -3);
    }

    #[test]
    fn phase_boundaries_are_contiguous() {
        let m = model();
        let green = m.phase_at(t(12_000));
        assert_eq!(green.started_at, t(10_000));
        assert_eq!(green.ends_at, t(14_000));

        let red = m.phase_at(green.ends_at);
        assert_eq!(red.state, LightState::Red);
        assert_eq!(red.started_at, green.ends_at);
        assert_eq!(red.ends_at, t(20_000));
    }

    #[test]
    fn sub_millisecond_instants_stay_in_their_millisecond() {
        let m = model();
        let just_before_red = t(3_999) + Duration::microseconds(900);
        assert_eq!(m.state_at(just_before_red), LightState::Green);
        assert!(m.phase_at(just_before_red).ends_at > just_before_red);
    }

    #[test]
    fn next_green_start_is_strictly_after() {
        let m = model();
        assert_eq!(m.next_green_start_after(t(0)), t(10_000));
        assert_eq!(m.next_green_start_after(t(5_000)), t(10_000));
        assert_eq!(m.next_green_start_after(t(9_999)), t(10_000));
        assert_eq!(m.next_green_start_after(t(-25_000)), t(-20_000));
    }

    #[test]
    fn green_longer_than_cycle_is_always_green() {
        let m = CycleModel::new(t(0), 5_000, 8_000).unwrap();
        for ms in [0, 1_234, 4_999, 5_000, -1] {
            assert_eq!(m.state_at(t(ms)), LightState::Green);
        }
        assert_eq!(m.phase_at(t(1_234)).ends_at, t(5_000));
    }

    #[test]
    fn state_is_deterministic() {
        let m = model();
        let at = t(123_456);
        assert_eq!(m.phase_at(at), m.phase_at(at));
    }
}
