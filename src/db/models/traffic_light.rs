//! Traffic light records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A physical traffic light whose green phases get captured.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrafficLight {
    pub id: String,
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub notes: Option<String>,
    pub last_updated: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Input data for creating a traffic light
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrafficLightInput {
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub notes: Option<String>,
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrafficLightUpdate {
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub notes: Option<String>,
}

impl TrafficLightUpdate {
    pub fn is_empty(&self) -> bool {
        self.location.is_none()
            && self.latitude.is_none()
            && self.longitude.is_none()
            && self.notes.is_none()
    }
}
