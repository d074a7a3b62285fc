//! Sensor reading types.
//!
//! A device push goes through three shapes:
//! - `IncomingReading`: payload after validation, nothing stamped yet
//! - `LiveReading`: normalized form kept in the history buffer and broadcast
//! - `Reading`: the immutable record written to the reading store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{CoreError, Result};
use crate::thresholds::Thresholds;

/// Device id used when a payload does not carry one.
pub const DEFAULT_DEVICE_ID: &str = "unknown-device";

/// Longest accepted device id, in bytes.
pub const MAX_DEVICE_ID_LEN: usize = 64;

/// Persisted sensor reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub temperature: f64,
    pub humidity: f64,
    pub light: f64,
}

impl Reading {
    /// Create a new reading with a fresh id.
    pub fn new(created_at: DateTime<Utc>, temperature: f64, humidity: f64, light: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at,
            temperature,
            humidity,
            light,
        }
    }

    /// Build the persisted record for a normalized live reading.
    pub fn from_live(live: &LiveReading) -> Self {
        Self::new(live.timestamp, live.temperature, live.humidity, live.light)
    }

    /// Whether this reading breaches the given thresholds.
    pub fn is_alert(&self, thresholds: &Thresholds) -> bool {
        thresholds.is_alert(self.temperature, self.humidity, self.light)
    }
}

/// Normalized reading held in the history buffer and pushed to live viewers.
///
/// `alert` is fixed at creation time from the threshold snapshot in effect
/// then; it is never recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveReading {
    pub device_id: String,
    pub temperature: f64,
    pub humidity: f64,
    pub light: f64,
    pub timestamp: DateTime<Utc>,
    pub alert: bool,
}

impl LiveReading {
    /// Normalize a validated payload against a threshold snapshot.
    ///
    /// The payload's own creation time wins over `now`.
    pub fn normalize(incoming: IncomingReading, thresholds: &Thresholds, now: DateTime<Utc>) -> Self {
        let alert = thresholds.is_alert(incoming.temperature, incoming.humidity, incoming.light);
        Self {
            device_id: incoming
                .device_id
                .unwrap_or_else(|| DEFAULT_DEVICE_ID.to_string()),
            temperature: incoming.temperature,
            humidity: incoming.humidity,
            light: incoming.light,
            timestamp: incoming.created_at.unwrap_or(now),
            alert,
        }
    }

    /// Project a stored record into the live shape.
    ///
    /// Stored records carry no device id and no alert flag, so the sentinel id
    /// is used and the alert is evaluated against `thresholds`.
    pub fn from_record(record: &Reading, thresholds: &Thresholds) -> Self {
        Self {
            device_id: DEFAULT_DEVICE_ID.to_string(),
            temperature: record.temperature,
            humidity: record.humidity,
            light: record.light,
            timestamp: record.created_at,
            alert: record.is_alert(thresholds),
        }
    }
}

/// Raw device payload. Accepts both the named and the generic field layout.
#[derive(Debug, Default, Deserialize)]
struct RawPayload {
    #[serde(default)]
    device_id: Option<String>,
    #[serde(default)]
    temperature: Option<Value>,
    #[serde(default)]
    humidity: Option<Value>,
    #[serde(default)]
    light: Option<Value>,
    #[serde(default)]
    field1: Option<Value>,
    #[serde(default)]
    field2: Option<Value>,
    #[serde(default)]
    field3: Option<Value>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
}

/// Device payload that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingReading {
    pub device_id: Option<String>,
    pub temperature: f64,
    pub humidity: f64,
    pub light: f64,
    pub created_at: Option<DateTime<Utc>>,
}

impl IncomingReading {
    /// Validate a JSON request body.
    ///
    /// Metrics are read from `temperature`/`humidity`/`light`, falling back to
    /// `field1`/`field2`/`field3`. Values may be JSON numbers or numeric
    /// strings. Anything missing or non-numeric is rejected.
    pub fn from_json(body: &Value) -> Result<Self> {
        if !body.is_object() {
            return Err(CoreError::Validation(
                "request body must be a JSON object".to_string(),
            ));
        }
        let raw: RawPayload = serde_json::from_value(body.clone())
            .map_err(|e| CoreError::Validation(format!("malformed payload: {e}")))?;

        let temperature = required_metric("temperature", raw.temperature.or(raw.field1))?;
        let humidity = required_metric("humidity", raw.humidity.or(raw.field2))?;
        let light = required_metric("light", raw.light.or(raw.field3))?;

        let created_at = match raw.created_at.or(raw.timestamp) {
            Some(s) => Some(parse_timestamp(&s)?),
            None => None,
        };

        let device_id = match raw.device_id.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(id) => Some(validate_device_id(id)?),
        };

        Ok(Self {
            device_id,
            temperature,
            humidity,
            light,
            created_at,
        })
    }
}

/// Coerce a JSON number or numeric string into a finite `f64`.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Device ids are short identifiers: ASCII letters, digits and `-_.:`.
fn validate_device_id(id: &str) -> Result<String> {
    if id.len() > MAX_DEVICE_ID_LEN {
        return Err(CoreError::Validation(format!(
            "device_id longer than {MAX_DEVICE_ID_LEN} characters"
        )));
    }
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':');
    if !id.chars().all(allowed) {
        return Err(CoreError::Validation(
            "device_id may only contain letters, digits and '-', '_', '.', ':'".to_string(),
        ));
    }
    Ok(id.to_string())
}

fn required_metric(name: &str, value: Option<Value>) -> Result<f64> {
    match value {
        None | Some(Value::Null) => Err(CoreError::Validation(format!("{name} is required"))),
        Some(v) => {
            coerce_number(&v).ok_or_else(|| CoreError::Validation(format!("{name} must be numeric")))
        }
    }
}

/// Parse an RFC 3339 timestamp into UTC.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CoreError::Validation(format!("invalid timestamp '{s}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_named_fields() {
        let incoming = IncomingReading::from_json(&json!({
            "device_id": "esp32-kitchen",
            "temperature": 22.5,
            "humidity": 55,
            "light": 310
        }))
        .unwrap();

        assert_eq!(incoming.device_id.as_deref(), Some("esp32-kitchen"));
        assert_eq!(incoming.temperature, 22.5);
        assert_eq!(incoming.humidity, 55.0);
        assert_eq!(incoming.light, 310.0);
        assert!(incoming.created_at.is_none());
    }

    #[test]
    fn test_generic_fields_with_numeric_strings() {
        let incoming = IncomingReading::from_json(&json!({
            "field1": "23.4",
            "field2": " 61.0 ",
            "field3": "120",
            "created_at": "2024-03-01T10:00:00Z"
        }))
        .unwrap();

        assert_eq!(incoming.temperature, 23.4);
        assert_eq!(incoming.humidity, 61.0);
        assert_eq!(incoming.light, 120.0);
        assert_eq!(
            incoming.created_at,
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_named_fields_take_precedence() {
        let incoming = IncomingReading::from_json(&json!({
            "temperature": 10,
            "field1": 99,
            "humidity": 50,
            "light": 300
        }))
        .unwrap();
        assert_eq!(incoming.temperature, 10.0);
    }

    #[test]
    fn test_rejects_non_numeric() {
        let err = IncomingReading::from_json(&json!({
            "temperature": "hot",
            "humidity": 50,
            "light": 300
        }))
        .unwrap_err();
        assert!(matches!(err, CoreError::Validation(ref m) if m.contains("temperature")));
    }

    #[test]
    fn test_rejects_missing_metric() {
        let err = IncomingReading::from_json(&json!({ "temperature": 20, "humidity": 50 }))
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(ref m) if m.contains("light")));
    }

    #[test]
    fn test_rejects_bad_timestamp_and_non_object() {
        assert!(IncomingReading::from_json(&json!({
            "temperature": 20, "humidity": 50, "light": 300, "created_at": "yesterday"
        }))
        .is_err());
        assert!(IncomingReading::from_json(&json!([1, 2, 3])).is_err());
    }

    #[test]
    fn test_device_id_is_checked() {
        let body = |id: Value| json!({"device_id": id, "temperature": 20, "humidity": 50, "light": 300});

        let ok = IncomingReading::from_json(&body(json!(" esp32:kitchen-1.b_2 "))).unwrap();
        assert_eq!(ok.device_id.as_deref(), Some("esp32:kitchen-1.b_2"));

        let blank = IncomingReading::from_json(&body(json!("   "))).unwrap();
        assert!(blank.device_id.is_none());

        let markup = IncomingReading::from_json(&body(json!("<img src=x onerror=alert(1)>")));
        assert!(matches!(markup, Err(CoreError::Validation(ref m)) if m.contains("device_id")));

        let longest = "a".repeat(MAX_DEVICE_ID_LEN);
        assert!(IncomingReading::from_json(&body(json!(longest))).is_ok());
        let too_long = "a".repeat(MAX_DEVICE_ID_LEN + 1);
        assert!(matches!(
            IncomingReading::from_json(&body(json!(too_long))),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_normalize_defaults_device_and_time() {
        let incoming = IncomingReading::from_json(&json!({
            "temperature": 35, "humidity": 50, "light": 300
        }))
        .unwrap();
        let live = LiveReading::normalize(incoming, &Thresholds::default(), fixed_now());

        assert_eq!(live.device_id, DEFAULT_DEVICE_ID);
        assert_eq!(live.timestamp, fixed_now());
        assert!(live.alert);
    }

    #[test]
    fn test_normalize_keeps_payload_time() {
        let incoming = IncomingReading::from_json(&json!({
            "temperature": 20, "humidity": 50, "light": 300,
            "timestamp": "2024-02-29T23:59:59+01:00"
        }))
        .unwrap();
        let live = LiveReading::normalize(incoming, &Thresholds::default(), fixed_now());

        assert_eq!(live.timestamp, Utc.with_ymd_and_hms(2024, 2, 29, 22, 59, 59).unwrap());
        assert!(!live.alert);
    }

    #[test]
    fn test_record_round_trip_fields() {
        let live = LiveReading {
            device_id: "a".to_string(),
            temperature: 21.0,
            humidity: 45.0,
            light: 250.0,
            timestamp: fixed_now(),
            alert: false,
        };
        let record = Reading::from_live(&live);
        assert_eq!(record.created_at, live.timestamp);

        let back = LiveReading::from_record(&record, &Thresholds::default());
        assert_eq!(back.device_id, DEFAULT_DEVICE_ID);
        assert_eq!(back.temperature, 21.0);
        assert!(!back.alert);
    }

    #[test]
    fn test_live_reading_serialization() {
        let live = LiveReading {
            device_id: "esp32".to_string(),
            temperature: 21.5,
            humidity: 45.0,
            light: 250.0,
            timestamp: fixed_now(),
            alert: true,
        };
        let json = serde_json::to_string(&live).unwrap();
        assert!(json.contains("\"device_id\":\"esp32\""));
        assert!(json.contains("\"timestamp\":\"2024-03-01T12:00:00Z\""));
        assert!(json.contains("\"alert\":true"));
    }
}
