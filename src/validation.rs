//! Input validation for watch definitions
//!
//! Everything the host hands to `add_or_update` passes through here before any
//! store write. JSON payload limits guard the opaque notification data that is
//! persisted verbatim.

use crate::error::{GeofencerError, Result};
use crate::models::{NotificationPayload, WatchDefinition};
use serde_json::Value;

/// Maximum allowed size for a notification data payload (64KB)
const MAX_JSON_SIZE_BYTES: usize = 64 * 1024;

/// Maximum nesting depth for JSON objects/arrays
const MAX_JSON_DEPTH: usize = 10;

/// Maximum number of keys in a JSON object
const MAX_JSON_KEYS: usize = 1000;

/// Maximum string length for JSON string values
const MAX_JSON_STRING_LENGTH: usize = 10000;

/// Validate a whole add batch; the first invalid definition rejects all of them
pub fn validate_watch_batch(definitions: &[WatchDefinition]) -> Result<()> {
    if definitions.is_empty() {
        return Err(GeofencerError::validation(
            "At least one watch definition is required",
        ));
    }

    for definition in definitions {
        validate_watch_definition(definition)?;
    }

    Ok(())
}

/// Validate one definition's geometry, trigger mask, window and payload
pub fn validate_watch_definition(definition: &WatchDefinition) -> Result<()> {
    if definition.id.trim().is_empty() {
        return Err(GeofencerError::validation("Watch id must not be empty"));
    }

    let id = &definition.id;

    if !definition.latitude.is_finite() || !(-90.0..=90.0).contains(&definition.latitude) {
        return Err(GeofencerError::validation(format!(
            "Watch '{id}': latitude {} outside [-90, 90]",
            definition.latitude
        )));
    }

    if !definition.longitude.is_finite() || !(-180.0..=180.0).contains(&definition.longitude) {
        return Err(GeofencerError::validation(format!(
            "Watch '{id}': longitude {} outside [-180, 180]",
            definition.longitude
        )));
    }

    if !definition.radius.is_finite() || definition.radius <= 0.0 {
        return Err(GeofencerError::validation(format!(
            "Watch '{id}': radius must be a positive number of meters, got {}",
            definition.radius
        )));
    }

    if definition.transition_type.is_empty() {
        return Err(GeofencerError::validation(format!(
            "Watch '{id}': transition type must select at least one trigger"
        )));
    }

    if definition.transition_type.has_unknown_bits() {
        return Err(GeofencerError::validation(format!(
            "Watch '{id}': unknown transition type bits in {}",
            definition.transition_type.bits()
        )));
    }

    if let (Some(start), Some(end)) = (definition.start_time, definition.end_time) {
        if start >= end {
            return Err(GeofencerError::validation(format!(
                "Watch '{id}': start time {start} is not before end time {end}"
            )));
        }
    }

    if let Some(notification) = &definition.notification {
        validate_notification(id, notification)?;
    }

    Ok(())
}

fn validate_notification(id: &str, notification: &NotificationPayload) -> Result<()> {
    if let Some(negative) = notification.vibration.iter().find(|pattern| **pattern < 0) {
        return Err(GeofencerError::validation(format!(
            "Watch '{id}': vibration pattern entries must be non-negative, got {negative}"
        )));
    }

    if let Some(data) = &notification.data {
        validate_json_payload(data)
            .map_err(|e| GeofencerError::validation(format!("Watch '{id}': {e}")))?;
    }

    Ok(())
}

/// Validates a JSON payload for size and structure constraints
pub fn validate_json_payload(value: &Value) -> Result<()> {
    let serialized = serde_json::to_string(value)
        .map_err(|e| GeofencerError::validation(format!("Invalid JSON structure: {e}")))?;

    if serialized.len() > MAX_JSON_SIZE_BYTES {
        return Err(GeofencerError::validation(format!(
            "JSON payload too large: {} bytes (max: {})",
            serialized.len(),
            MAX_JSON_SIZE_BYTES
        )));
    }

    validate_json_depth(value, 0)
}

fn validate_json_depth(value: &Value, current_depth: usize) -> Result<()> {
    if current_depth > MAX_JSON_DEPTH {
        return Err(GeofencerError::validation(format!(
            "JSON nesting too deep: {current_depth} (max: {MAX_JSON_DEPTH})"
        )));
    }

    match value {
        Value::Object(map) => {
            if map.len() > MAX_JSON_KEYS {
                return Err(GeofencerError::validation(format!(
                    "Too many JSON keys: {} (max: {})",
                    map.len(),
                    MAX_JSON_KEYS
                )));
            }

            for (key, val) in map {
                if key.len() > MAX_JSON_STRING_LENGTH {
                    return Err(GeofencerError::validation(format!(
                        "JSON key too long: {} chars (max: {})",
                        key.len(),
                        MAX_JSON_STRING_LENGTH
                    )));
                }
                validate_json_depth(val, current_depth + 1)?;
            }
        }
        Value::Array(arr) => {
            if arr.len() > MAX_JSON_KEYS {
                return Err(GeofencerError::validation(format!(
                    "JSON array too large: {} items (max: {})",
                    arr.len(),
                    MAX_JSON_KEYS
                )));
            }

            for item in arr {
                validate_json_depth(item, current_depth + 1)?;
            }
        }
        Value::String(s) => {
            if s.len() > MAX_JSON_STRING_LENGTH {
                return Err(GeofencerError::validation(format!(
                    "JSON string too long: {} chars (max: {})",
                    s.len(),
                    MAX_JSON_STRING_LENGTH
                )));
            }
        }
        _ => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransitionType;
    use chrono::{Duration, Utc};
    use serde_json::json;

    fn valid() -> WatchDefinition {
        WatchDefinition::new("home", 52.52, 13.40, 150.0)
    }

    #[test]
    fn test_valid_definition() {
        assert!(validate_watch_definition(&valid()).is_ok());
        assert!(validate_watch_batch(&[valid(), WatchDefinition::new("work", -33.9, 151.2, 50.0)]).is_ok());
    }

    #[test]
    fn test_empty_batch_rejected() {
        assert!(matches!(
            validate_watch_batch(&[]),
            Err(GeofencerError::Validation(_))
        ));
    }

    #[test]
    fn test_geometry_bounds() {
        let mut blank_id = valid();
        blank_id.id = "  ".to_string();
        assert!(validate_watch_definition(&blank_id).is_err());

        let mut lat = valid();
        lat.latitude = 90.5;
        assert!(validate_watch_definition(&lat).is_err());

        let mut lon = valid();
        lon.longitude = f64::NAN;
        assert!(validate_watch_definition(&lon).is_err());

        let mut radius = valid();
        radius.radius = 0.0;
        assert!(validate_watch_definition(&radius).is_err());

        // bounds themselves are inclusive
        assert!(validate_watch_definition(&WatchDefinition::new("pole", 90.0, -180.0, 1.0)).is_ok());
    }

    #[test]
    fn test_transition_mask() {
        let none = valid().with_transition_type(TransitionType::from_bits(0).unwrap());
        assert!(validate_watch_definition(&none).is_err());

        let unknown: TransitionType = serde_json::from_value(json!(9)).unwrap();
        let err = validate_watch_definition(&valid().with_transition_type(unknown)).unwrap_err();
        assert!(err.to_string().contains("unknown transition type bits"));

        let dwell = valid().with_transition_type(TransitionType::DWELL);
        assert!(validate_watch_definition(&dwell).is_ok());
    }

    #[test]
    fn test_active_window_order() {
        let now = Utc::now();
        let inverted = valid().with_active_window(Some(now), Some(now - Duration::hours(1)));
        assert!(validate_watch_definition(&inverted).is_err());

        let open_ended = valid().with_active_window(Some(now), None);
        assert!(validate_watch_definition(&open_ended).is_ok());
    }

    #[test]
    fn test_notification_payload_limits() {
        let mut payload = NotificationPayload::with_text("Welcome home");
        payload.vibration = vec![0, 200, -1];
        assert!(validate_watch_definition(&valid().with_notification(payload)).is_err());

        let mut nested = json!("leaf");
        for _ in 0..15 {
            nested = json!({ "nested": nested });
        }
        let mut payload = NotificationPayload::with_text("deep");
        payload.data = Some(nested);
        let err = validate_watch_definition(&valid().with_notification(payload)).unwrap_err();
        assert!(err.to_string().contains("JSON nesting too deep"));
    }

    #[test]
    fn test_json_payload_string_too_long() {
        let long = "x".repeat(MAX_JSON_STRING_LENGTH + 1);
        assert!(validate_json_payload(&json!({ "text": long })).is_err());
        assert!(validate_json_payload(&json!({ "door": "front", "floor": 2 })).is_ok());
    }
}
