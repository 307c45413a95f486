use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::notification::NotificationPayload;
use super::transition_type::TransitionType;
use crate::services::Geofence;

/// A caller-defined circular region of interest.
///
/// Identity is `id`; re-adding a definition with an existing id replaces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchDefinition {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Radius in meters
    pub radius: f64,
    pub transition_type: TransitionType,
    /// `None` means the region never expires
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_duration_ms: Option<u64>,
    /// Dwell delay, only meaningful with the DWELL trigger
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loitering_delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification: Option<NotificationPayload>,
}

impl WatchDefinition {
    /// Minimal definition triggering on both enter and exit
    pub fn new(id: impl Into<String>, latitude: f64, longitude: f64, radius: f64) -> Self {
        Self {
            id: id.into(),
            latitude,
            longitude,
            radius,
            transition_type: TransitionType::BOTH,
            expiration_duration_ms: None,
            loitering_delay_ms: None,
            start_time: None,
            end_time: None,
            notification: None,
        }
    }

    pub fn with_transition_type(mut self, transition_type: TransitionType) -> Self {
        self.transition_type = transition_type;
        self
    }

    pub fn with_notification(mut self, notification: NotificationPayload) -> Self {
        self.notification = Some(notification);
        self
    }

    pub fn with_active_window(
        mut self,
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
    ) -> Self {
        self.start_time = start_time;
        self.end_time = end_time;
        self
    }

    /// Whether `now` falls in `[start_time, end_time)`; open bounds always match
    pub fn is_within_time_range(&self, now: DateTime<Utc>) -> bool {
        let after_start = self.start_time.map_or(true, |start| now >= start);
        let before_end = self.end_time.map_or(true, |end| now < end);
        after_start && before_end
    }

    /// Service-facing region for registration
    pub fn to_geofence(&self) -> Geofence {
        Geofence {
            request_id: self.id.clone(),
            latitude: self.latitude,
            longitude: self.longitude,
            radius_meters: self.radius,
            transition_types: self.transition_type,
            expiration: self.expiration_duration_ms.map(Duration::from_millis),
            loitering_delay: self.loitering_delay_ms.map(Duration::from_millis),
        }
    }
}
