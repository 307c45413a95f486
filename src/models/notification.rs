use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Notification the host shows when a watch transitions.
///
/// The core never interprets these fields; they are stored with the watch and
/// handed back to the host inside transition events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub small_icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_app_on_click: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vibration: Vec<i64>,
    /// Opaque caller data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl NotificationPayload {
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }
}
