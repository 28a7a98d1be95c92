//! Device twin types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::device::{ConnectionState, DeviceStatus};

/// Desired and reported property trees of a twin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwinProperties {
    /// Properties the back end wants the device to adopt.
    #[serde(default = "empty_object")]
    pub desired: Value,

    /// Properties reported by the device.
    #[serde(default = "empty_object")]
    pub reported: Value,
}

impl Default for TwinProperties {
    fn default() -> Self {
        Self {
            desired: empty_object(),
            reported: empty_object(),
        }
    }
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// Server-side document pairing a device identity with its properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Twin {
    /// Device identifier.
    pub device_id: String,

    /// Opaque version tag used for optimistic concurrency.
    #[serde(default)]
    pub etag: String,

    /// Monotonic twin version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,

    /// Device status.
    #[serde(default)]
    pub status: DeviceStatus,

    /// Last known connection state.
    #[serde(default)]
    pub connection_state: ConnectionState,

    /// Time of the last activity seen by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity_time: Option<DateTime<Utc>>,

    /// Desired and reported properties.
    #[serde(default)]
    pub properties: TwinProperties,
}

impl Twin {
    /// Creates an empty twin for a device.
    #[must_use]
    pub fn new(device_id: impl Into<String>, etag: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            etag: etag.into(),
            version: None,
            status: DeviceStatus::Enabled,
            connection_state: ConnectionState::Disconnected,
            last_activity_time: None,
            properties: TwinProperties::default(),
        }
    }
}

/// Builds a patch document touching only desired properties.
///
/// # Examples
///
/// ```
/// use iothub_registry::twin::desired_properties_patch;
/// use serde_json::json;
///
/// let patch = desired_properties_patch(json!({"customKey": "customValue"}));
/// assert_eq!(patch["properties"]["desired"]["customKey"], "customValue");
/// ```
#[must_use]
pub fn desired_properties_patch(desired: Value) -> Value {
    json!({ "properties": { "desired": desired } })
}

/// Applies a JSON merge patch to `target`.
///
/// Objects merge recursively, `null` removes a key and any other value
/// replaces the target wholesale.
pub fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch_map) = patch else {
        *target = patch.clone();
        return;
    };

    if !target.is_object() {
        *target = empty_object();
    }
    if let Value::Object(target_map) = target {
        for (key, value) in patch_map {
            if value.is_null() {
                target_map.remove(key);
            } else {
                merge_patch(target_map.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}

/// One page of query results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TwinPage {
    /// Twins in this page.
    pub twins: Vec<Twin>,

    /// Token for the next page; `None` when the query is exhausted.
    pub continuation_token: Option<String>,
}
