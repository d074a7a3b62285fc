//! Alert thresholds and the process-wide registry that holds them.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CoreError, Result};
use crate::reading::coerce_number;

/// Alert boundaries.
///
/// A reading alerts when it is hotter than `temperature_max`, drier than
/// `humidity_min` or darker than `light_min`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    #[serde(default = "default_temperature_max")]
    pub temperature_max: f64,
    #[serde(default = "default_humidity_min")]
    pub humidity_min: f64,
    #[serde(default = "default_light_min")]
    pub light_min: f64,
}

fn default_temperature_max() -> f64 {
    30.0
}

fn default_humidity_min() -> f64 {
    40.0
}

fn default_light_min() -> f64 {
    200.0
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            temperature_max: default_temperature_max(),
            humidity_min: default_humidity_min(),
            light_min: default_light_min(),
        }
    }
}

impl Thresholds {
    /// Evaluate a measurement against these thresholds.
    pub fn is_alert(&self, temperature: f64, humidity: f64, light: f64) -> bool {
        temperature > self.temperature_max
            || humidity < self.humidity_min
            || light < self.light_min
    }

    /// Same values with `light_min` truncated to an integer, the way
    /// updates store it.
    pub fn normalized(self) -> Self {
        Self {
            light_min: self.light_min.trunc(),
            ..self
        }
    }

    /// Overlay the fields present in `partial`.
    pub fn merge(&self, partial: &PartialThresholds) -> Self {
        Self {
            temperature_max: partial.temperature_max.unwrap_or(self.temperature_max),
            humidity_min: partial.humidity_min.unwrap_or(self.humidity_min),
            light_min: partial.light_min.map(f64::trunc).unwrap_or(self.light_min),
        }
    }
}

/// Threshold update where every field is optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialThresholds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature_max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub light_min: Option<f64>,
}

impl PartialThresholds {
    /// Validate a JSON request body.
    ///
    /// Fields may be numbers or numeric strings; absent or `null` fields are
    /// left out of the update. `light_min` is truncated to an integer value.
    pub fn from_json(body: &Value) -> Result<Self> {
        let obj = body.as_object().ok_or_else(|| {
            CoreError::Validation("request body must be a JSON object".to_string())
        })?;

        let field = |name: &str| -> Result<Option<f64>> {
            match obj.get(name) {
                None | Some(Value::Null) => Ok(None),
                Some(v) => coerce_number(v)
                    .map(Some)
                    .ok_or_else(|| CoreError::Validation(format!("{name} must be numeric"))),
            }
        };

        Ok(Self {
            temperature_max: field("temperature_max")?,
            humidity_min: field("humidity_min")?,
            light_min: field("light_min")?.map(f64::trunc),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.temperature_max.is_none() && self.humidity_min.is_none() && self.light_min.is_none()
    }
}

/// Shared, lock-guarded threshold cell.
///
/// Readers always get a copied snapshot, never a reference into the cell.
#[derive(Debug, Clone, Default)]
pub struct ThresholdRegistry {
    inner: Arc<RwLock<Thresholds>>,
}

impl ThresholdRegistry {
    pub fn new(initial: Thresholds) -> Self {
        Self {
            inner: Arc::new(RwLock::new(initial)),
        }
    }

    /// Current snapshot.
    pub fn get(&self) -> Thresholds {
        *self.inner.read()
    }

    /// Merge `partial` into the current value and return the new snapshot.
    pub fn set(&self, partial: PartialThresholds) -> Thresholds {
        let mut guard = self.inner.write();
        *guard = guard.merge(&partial);
        *guard
    }
}
