//! Schedule inference engine.
//!
//! Everything in here is a pure function of an observation snapshot and an
//! injected `now`: no I/O, no clock reads, no shared state. The web/CLI layer
//! loads observations once per request and hands them over.

pub mod config;
pub mod countdown;
pub mod error;
pub mod pattern;
pub mod phase;
pub mod stats;
pub mod timeline;
pub mod validation;

pub use config::InferenceConfig;
pub use countdown::{countdown, Countdown};
pub use error::InferenceError;
pub use pattern::{compute_pattern, Pattern, ScheduleRegularity};
pub use phase::{state_at, CycleModel, LightState, Phase};
pub use timeline::{compute_timeline, TimeWindow, TimelineEntry};
pub use validation::{validate_pattern, Validation};
