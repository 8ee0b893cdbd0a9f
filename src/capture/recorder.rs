use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::db::{models::observation::span_ms, Database, Observation};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

/// Accepts green-phase start/end pairs and stores them as observations.
///
/// This is where capture integrity is enforced; the inference engine assumes
/// anything it reads from the store already passed through here.
#[derive(Clone)]
pub struct CaptureRecorder {
    db: Database,
}

/// Drop anything below a whole millisecond.
fn truncate_to_millis(value: DateTime<Utc>) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(value.timestamp_millis())
        .ok_or_else(|| anyhow!("timestamp {value} is out of range"))
}

impl CaptureRecorder {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn record(
        &self,
        traffic_light_id: &str,
        green_start: DateTime<Utc>,
        green_end: DateTime<Utc>,
    ) -> Result<Observation> {
        let green_start = truncate_to_millis(green_start)?;
        let green_end = truncate_to_millis(green_end)?;

        if green_end <= green_start {
            log_warn!(
                "rejected capture for {}: green_end {} is not after green_start {}",
                traffic_light_id,
                green_end,
                green_start
            );
            bail!("green_end must be after green_start");
        }

        if !self.db.traffic_light_exists(traffic_light_id).await? {
            bail!("Traffic light {traffic_light_id} not found");
        }

        let observation = Observation {
            id: Uuid::new_v4().to_string(),
            traffic_light_id: traffic_light_id.to_string(),
            green_start,
            green_end,
            duration_ms: span_ms(green_start, green_end),
            created_at: Utc::now(),
        };

        if let Err(err) = self.db.insert_observation(&observation).await {
            log_error!("failed to store capture for {}: {err:?}", traffic_light_id);
            return Err(err);
        }

        log_info!(
            "recorded {}ms green phase for traffic light {}",
            observation.duration_ms,
            traffic_light_id
        );

        Ok(observation)
    }

    /// Returns whether a capture with that id existed.
    pub async fn delete(&self, observation_id: &str) -> Result<bool> {
        let removed = self.db.delete_observation(observation_id).await?;
        if removed {
            log_info!("deleted capture {}", observation_id);
        }
        Ok(removed)
    }
}
