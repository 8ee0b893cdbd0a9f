use serde::{Deserialize, Serialize};

/// Tunable policy constants for the inference engine.
///
/// None of these are contractual; they were picked to match how the schedule
/// display behaves and can be overridden through the settings file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Cycle gaps with a coefficient of variation below this are "consistent".
    pub consistent_max_variation: f64,

    /// Below this (and not consistent) they are "variable"; anything else is "irregular".
    pub variable_max_variation: f64,

    /// Minimum fraction of historical captures the cycle model must place in
    /// a green window for validation to pass.
    pub validation_match_threshold: f64,

    /// Longest timeline window, in hours, the engine will synthesize.
    pub max_window_hours: u32,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            consistent_max_variation: 0.05,
            variable_max_variation: 0.15,
            validation_match_threshold: 0.7,
            max_window_hours: 168,
        }
    }
}
