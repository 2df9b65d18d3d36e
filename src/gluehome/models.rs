//! Glue Home lock types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::DEFAULT_MODEL;

/// Last lock event type as reported by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LockEventType {
    LocalLock,
    LocalUnlock,
    RemoteLock,
    RemoteUnlock,
    PressAndGo,
    ManualLock,
    ManualUnlock,
    #[serde(other)]
    Unknown,
}

impl LockEventType {
    /// `None` when the event says nothing about the bolt position
    pub fn is_locked(&self) -> Option<bool> {
        match self {
            LockEventType::LocalLock
            | LockEventType::RemoteLock
            | LockEventType::PressAndGo
            | LockEventType::ManualLock => Some(true),
            LockEventType::LocalUnlock
            | LockEventType::RemoteUnlock
            | LockEventType::ManualUnlock => Some(false),
            LockEventType::Unknown => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LockEventType::LocalLock => "localLock",
            LockEventType::LocalUnlock => "localUnlock",
            LockEventType::RemoteLock => "remoteLock",
            LockEventType::RemoteUnlock => "remoteUnlock",
            LockEventType::PressAndGo => "pressAndGo",
            LockEventType::ManualLock => "manualLock",
            LockEventType::ManualUnlock => "manualUnlock",
            LockEventType::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockEvent {
    pub event_type: LockEventType,
    #[serde(default)]
    pub event_time: Option<DateTime<Utc>>,
}

/// Raw lock document from `GET /v1/locks`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LockResponse {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub firmware_version: Option<String>,
    /// Kept loose; some firmware reports floats or strings
    #[serde(default)]
    pub battery_status: Option<Value>,
    #[serde(default)]
    pub connection_status: Option<String>,
    #[serde(default)]
    pub last_lock_event: Option<LockEvent>,
}

/// Immutable lock snapshot taken by one fetch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lock {
    pub id: String,
    pub description: String,
    pub model: String,
    pub firmware_version: Option<String>,
    pub serial_number: Option<String>,
    pub battery_status: Option<u8>,
    pub connection_status: Option<String>,
    pub last_lock_event: Option<LockEvent>,
}

impl Lock {
    /// Build a lock with only the required fields; optional ones resolve to defaults
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            model: DEFAULT_MODEL.to_string(),
            firmware_version: None,
            serial_number: None,
            battery_status: None,
            connection_status: None,
            last_lock_event: None,
        }
    }

    pub fn is_locked(&self) -> Option<bool> {
        self.last_lock_event
            .as_ref()
            .and_then(|e| e.event_type.is_locked())
    }

    pub fn is_offline(&self) -> bool {
        self.connection_status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("offline"))
    }
}

impl From<LockResponse> for Lock {
    fn from(raw: LockResponse) -> Self {
        let description = raw
            .description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| raw.id.clone());

        Self {
            id: raw.id,
            description,
            model: raw
                .model
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            firmware_version: raw.firmware_version,
            serial_number: raw.serial_number,
            battery_status: raw.battery_status.as_ref().and_then(battery_percent),
            connection_status: raw.connection_status,
            last_lock_event: raw.last_lock_event,
        }
    }
}

/// Battery level as a 0-100 percentage, or None when unreadable
fn battery_percent(value: &Value) -> Option<u8> {
    let level = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    level
        .is_finite()
        .then(|| level.clamp(0.0, 100.0).round() as u8)
}

/// Remote operation sent to `POST /v1/locks/{id}/operations`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LockOperation {
    Lock,
    Unlock,
}

impl LockOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            LockOperation::Lock => "lock",
            LockOperation::Unlock => "unlock",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_lock() {
        let raw: LockResponse = serde_json::from_value(serde_json::json!({
            "id": "L1",
            "serialNumber": "GL-0001",
            "description": "Front Door",
            "firmwareVersion": "2.4.1",
            "batteryStatus": 87,
            "connectionStatus": "connected",
            "lastLockEvent": {
                "eventType": "remoteLock",
                "eventTime": "2024-03-01T10:15:00Z"
            }
        }))
        .unwrap();
        let lock = Lock::from(raw);

        assert_eq!(lock.id, "L1");
        assert_eq!(lock.description, "Front Door");
        assert_eq!(lock.model, "Glue Lock");
        assert_eq!(lock.firmware_version.as_deref(), Some("2.4.1"));
        assert_eq!(lock.battery_status, Some(87));
        assert_eq!(lock.is_locked(), Some(true));
        assert!(!lock.is_offline());
    }

    #[test]
    fn test_minimal_lock_defaults() {
        let raw: LockResponse =
            serde_json::from_value(serde_json::json!({ "id": "L2" })).unwrap();
        let lock = Lock::from(raw);

        assert_eq!(lock.description, "L2");
        assert_eq!(lock.model, DEFAULT_MODEL);
        assert!(lock.firmware_version.is_none());
        assert_eq!(lock.is_locked(), None);
    }

    #[test]
    fn test_odd_battery_values_do_not_fail_the_list() {
        let raw: Vec<LockResponse> = serde_json::from_value(serde_json::json!([
            { "id": "L1", "batteryStatus": 300 },
            { "id": "L2", "batteryStatus": -5 },
            { "id": "L3", "batteryStatus": 42.6 },
            { "id": "L4", "batteryStatus": "77" },
            { "id": "L5", "batteryStatus": "low" },
            { "id": "L6", "batteryStatus": null }
        ]))
        .unwrap();
        let levels: Vec<Option<u8>> = raw
            .into_iter()
            .map(|r| Lock::from(r).battery_status)
            .collect();

        assert_eq!(
            levels,
            vec![Some(100), Some(0), Some(43), Some(77), None, None]
        );
    }

    #[test]
    fn test_unknown_event_type() {
        let event: LockEvent =
            serde_json::from_value(serde_json::json!({ "eventType": "somethingNew" })).unwrap();
        assert_eq!(event.event_type, LockEventType::Unknown);
        assert_eq!(event.event_type.is_locked(), None);
    }

    #[test]
    fn test_event_lock_state() {
        assert_eq!(LockEventType::PressAndGo.is_locked(), Some(true));
        assert_eq!(LockEventType::ManualUnlock.is_locked(), Some(false));
        assert_eq!(LockEventType::LocalUnlock.as_str(), "localUnlock");
    }

    #[test]
    fn test_operation_body() {
        let body = serde_json::json!({ "type": LockOperation::Unlock });
        assert_eq!(body.to_string(), r#"{"type":"unlock"}"#);
    }
}
