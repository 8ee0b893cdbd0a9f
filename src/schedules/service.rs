use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::{DateTime, Duration, Utc};

use crate::{
    db::{Database, Observation},
    inference::{self, Countdown, Pattern, TimeWindow, TimelineEntry, Validation},
    settings::SettingsStore,
};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = false;

use crate::log_info;

/// Request-scoped entry point into the inference engine.
///
/// Every call reads the light's captures from the store exactly once and
/// recomputes from scratch; nothing derived is cached or written back.
#[derive(Clone)]
pub struct ScheduleService {
    db: Database,
    settings: Arc<SettingsStore>,
}

impl ScheduleService {
    pub fn new(db: Database, settings: Arc<SettingsStore>) -> Self {
        Self { db, settings }
    }

    /// All captures for a light, failing if the light itself is unknown.
    pub async fn observations(&self, traffic_light_id: &str) -> Result<Vec<Observation>> {
        if !self.db.traffic_light_exists(traffic_light_id).await? {
            bail!("Traffic light {traffic_light_id} not found");
        }
        let observations = self.db.list_observations(traffic_light_id).await?;
        log_info!(
            "loaded {} captures for traffic light {}",
            observations.len(),
            traffic_light_id
        );
        Ok(observations)
    }

    pub async fn pattern(&self, traffic_light_id: &str, now: DateTime<Utc>) -> Result<Pattern> {
        let observations = self.observations(traffic_light_id).await?;
        let pattern = inference::compute_pattern(&observations, now, &self.settings.inference())?;
        Ok(pattern)
    }

    /// Timeline over `[from, from + hours)`. `from` defaults to `now`, `hours`
    /// to the configured timeline length, capped by `inference.max_window_hours`.
    pub async fn timeline(
        &self,
        traffic_light_id: &str,
        now: DateTime<Utc>,
        from: Option<DateTime<Utc>>,
        hours: Option<u32>,
    ) -> Result<Vec<TimelineEntry>> {
        let settings = self.settings.current();
        let hours = hours.unwrap_or(settings.timeline_hours);
        let window =
            TimeWindow::following(from.unwrap_or(now), Duration::hours(i64::from(hours)))?;

        let observations = self.observations(traffic_light_id).await?;
        let pattern = inference::compute_pattern(&observations, now, &settings.inference)?;
        let entries = inference::compute_timeline(&pattern, window, &settings.inference)?;
        log_info!(
            "timeline for {}: {} entries over {}h",
            traffic_light_id,
            entries.len(),
            hours
        );
        Ok(entries)
    }

    /// Replay the captures from the last `lookback_hours` (default from
    /// settings) through the light's own cycle model.
    pub async fn validate(
        &self,
        traffic_light_id: &str,
        now: DateTime<Utc>,
        lookback_hours: Option<u32>,
    ) -> Result<Validation> {
        let settings = self.settings.current();
        let hours = lookback_hours.unwrap_or(settings.validation_lookback_hours);
        let lookback = TimeWindow::lookback(now, Duration::hours(i64::from(hours)))?;

        let observations = self.observations(traffic_light_id).await?;
        let pattern = inference::compute_pattern(&observations, now, &settings.inference)?;
        let validation =
            inference::validate_pattern(&observations, &pattern, lookback, &settings.inference)?;
        Ok(validation)
    }

    pub async fn countdown(&self, traffic_light_id: &str, now: DateTime<Utc>) -> Result<Countdown> {
        let pattern = self.pattern(traffic_light_id, now).await?;
        Ok(inference::countdown(&pattern, now)?)
    }
}
