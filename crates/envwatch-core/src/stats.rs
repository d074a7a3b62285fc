//! Rolling-window statistics over stored readings.

use serde::{Deserialize, Serialize};

use crate::reading::Reading;
use crate::thresholds::Thresholds;

/// Summary of a window of readings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub total_readings: u64,
    /// Readings that breach the thresholds passed to [`Stats::compute`].
    pub alerts: u64,
    /// Rounded to one decimal.
    pub avg_temperature: f64,
    /// Rounded to one decimal.
    pub avg_humidity: f64,
    /// Rounded to the nearest integer.
    pub avg_light: f64,
}

impl Stats {
    /// Compute statistics for `readings`.
    ///
    /// Alerts are re-evaluated against `thresholds`, not against whatever was
    /// in effect when each reading arrived. An empty slice yields all zeros.
    pub fn compute(readings: &[Reading], thresholds: &Thresholds) -> Self {
        if readings.is_empty() {
            return Self::default();
        }

        let n = readings.len() as f64;
        let (mut temp_sum, mut hum_sum, mut light_sum) = (0.0, 0.0, 0.0);
        let mut alerts = 0u64;

        for r in readings {
            temp_sum += r.temperature;
            hum_sum += r.humidity;
            light_sum += r.light;
            if r.is_alert(thresholds) {
                alerts += 1;
            }
        }

        Self {
            total_readings: readings.len() as u64,
            alerts,
            avg_temperature: round_to(temp_sum / n, 1),
            avg_humidity: round_to(hum_sum / n, 1),
            avg_light: (light_sum / n).round(),
        }
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
