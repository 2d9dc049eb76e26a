//! Pressure observations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lower bound of physically plausible sea-level pressure, in hPa
pub const MIN_PLAUSIBLE_PRESSURE_HPA: f64 = 800.0;
/// Upper bound of physically plausible sea-level pressure, in hPa
pub const MAX_PLAUSIBLE_PRESSURE_HPA: f64 = 1200.0;

/// A single air pressure observation at sea level.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PressureReading {
    /// Pressure at sea level in hPa
    pub pressure_hpa: f64,
    /// Timestamp the provider associates with the observation (UTC)
    pub timestamp: DateTime<Utc>,
}

impl PressureReading {
    /// Create a new reading
    #[must_use]
    pub fn new(pressure_hpa: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            pressure_hpa,
            timestamp,
        }
    }

    /// Whether the value lies inside the physically plausible range.
    ///
    /// Readings outside the range are still returned to the caller; the
    /// fetcher only logs a warning, since the provider is the authority on
    /// its own data.
    #[must_use]
    pub fn is_plausible(&self) -> bool {
        (MIN_PLAUSIBLE_PRESSURE_HPA..=MAX_PLAUSIBLE_PRESSURE_HPA).contains(&self.pressure_hpa)
    }
}
