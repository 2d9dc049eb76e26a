//! Latest-pressure retrieval from the KNMI EDR API
//!
//! Observations are published every 10 minutes but become visible with a
//! variable ingestion delay, so "now minus one tick" is not reliably present.
//! The fetcher queries a lookback window ending at the target time and takes
//! the most recent point in it; when a window comes back empty the window is
//! doubled, up to a configured maximum, before giving up with a no-data
//! answer.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::KnmiConfig;
use crate::models::PressureReading;
use crate::{LuchtdrukError, Result};

/// EDR parameter name for air pressure at sea level
pub const PARAMETER_PRESSURE: &str = "pp";

/// Capability to fetch the most recent pressure observation at or before a
/// given time.
#[async_trait]
pub trait PressureProvider: Send + Sync {
    /// Fetch the latest reading for `station_id` at or before `as_of`.
    ///
    /// Fails with [`LuchtdrukError::NoData`] when even the widest lookback
    /// window holds no observation.
    async fn fetch_latest(
        &self,
        station_id: &str,
        as_of: DateTime<Utc>,
    ) -> Result<PressureReading>;
}

/// Pressure provider backed by the KNMI EDR API
pub struct EdrClient {
    client: ClientWithMiddleware,
    api_key: String,
    base_url: String,
    collection: String,
    initial_window: TimeDelta,
    max_window: TimeDelta,
}

impl EdrClient {
    /// Create a new EDR client
    pub fn new(config: &KnmiConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| LuchtdrukError::config("KNMI API key is not configured"))?;

        let inner = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.into()))
            .build()
            .map_err(|e| LuchtdrukError::config(format!("Failed to create HTTP client: {e}")))?;

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
        let client = ClientBuilder::new(inner)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.clone(),
            collection: config.collection.clone(),
            initial_window: TimeDelta::minutes(config.initial_window_minutes),
            max_window: TimeDelta::minutes(config.max_window_minutes),
        })
    }

    /// Build the middleware client used for other calls against the same API
    /// surface, sharing timeout and retry policy with this one.
    #[must_use]
    pub fn http_client(&self) -> &ClientWithMiddleware {
        &self.client
    }

    /// Query one window and return every usable reading in it
    async fn query_window(
        &self,
        station_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PressureReading>> {
        let url = format!(
            "{}/collections/{}/locations/{}?datetime={}/{}&parameter-name={}",
            self.base_url,
            self.collection,
            urlencoding::encode(station_id),
            format_edr_datetime(start),
            format_edr_datetime(end),
            PARAMETER_PRESSURE,
        );
        debug!("EDR request URL: {}", url);

        let response = self
            .client
            .get(&url)
            .header("Authorization", &self.api_key)
            .send()
            .await
            .map_err(|e| LuchtdrukError::upstream(format!("EDR request failed: {e}")))?;

        let response = response.error_for_status().map_err(|e| {
            LuchtdrukError::upstream(format!("EDR returned an error status: {e}"))
        })?;

        let payload: coverage::CoverageResponse = response.json().await.map_err(|e| {
            LuchtdrukError::upstream_payload(format!("failed to parse EDR response: {e}"))
        })?;

        payload.into_readings(PARAMETER_PRESSURE)
    }
}

#[async_trait]
impl PressureProvider for EdrClient {
    async fn fetch_latest(
        &self,
        station_id: &str,
        as_of: DateTime<Utc>,
    ) -> Result<PressureReading> {
        info!(
            "Fetching latest pressure for station {} as of {}",
            station_id, as_of
        );

        let windows = widening_windows(self.initial_window, self.max_window);
        let widest_minutes = windows.last().map_or(0, TimeDelta::num_minutes);

        for window in windows {
            debug!(
                "Querying a {}-minute window for station {}",
                window.num_minutes(),
                station_id
            );

            let readings = self.query_window(station_id, as_of - window, as_of).await?;
            let count = readings.len();

            if let Some(latest) = latest_reading(readings) {
                if !latest.is_plausible() {
                    warn!(
                        "Pressure {} hPa at station {} is outside the plausible range",
                        latest.pressure_hpa, station_id
                    );
                }
                info!(
                    "Latest of {} reading(s) for station {}: {} hPa at {}",
                    count, station_id, latest.pressure_hpa, latest.timestamp
                );
                return Ok(latest);
            }

            debug!(
                "No observations for station {} in the last {} minutes",
                station_id,
                window.num_minutes()
            );
        }

        warn!(
            "No observations for station {} within the widest window ({} minutes)",
            station_id, widest_minutes
        );
        Err(LuchtdrukError::no_data(station_id, widest_minutes))
    }
}

/// Lookback windows to try, narrowest first: the initial window, doubling
/// each attempt, capped at and ending with the maximum.
fn widening_windows(initial: TimeDelta, max: TimeDelta) -> Vec<TimeDelta> {
    let mut windows = vec![initial];
    let mut window = initial;
    while window < max {
        window = std::cmp::min(window * 2, max);
        windows.push(window);
    }
    windows
}

/// Pick the reading with the greatest timestamp.
///
/// The provider's array order is not trusted to be chronological.
fn latest_reading(readings: Vec<PressureReading>) -> Option<PressureReading> {
    readings.into_iter().max_by_key(|reading| reading.timestamp)
}

/// Format a timestamp the way the EDR `datetime` parameter expects
fn format_edr_datetime(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// CoverageJSON structures for the EDR observation payload
mod coverage {
    use chrono::{DateTime, Utc};
    use serde::Deserialize;
    use std::collections::HashMap;

    use crate::models::PressureReading;
    use crate::{LuchtdrukError, Result};

    #[derive(Debug, Deserialize)]
    pub struct CoverageResponse {
        #[serde(default)]
        pub coverages: Vec<Coverage>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Coverage {
        pub domain: Domain,
        pub ranges: HashMap<String, ValueRange>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Domain {
        pub axes: Axes,
    }

    #[derive(Debug, Deserialize)]
    pub struct Axes {
        pub t: TimeAxis,
    }

    #[derive(Debug, Deserialize)]
    pub struct TimeAxis {
        pub values: Vec<String>,
    }

    #[derive(Debug, Deserialize)]
    pub struct ValueRange {
        pub values: Vec<Option<f64>>,
    }

    impl CoverageResponse {
        /// Pair the time axis with the requested parameter's values,
        /// dropping unpublished (null) points.
        ///
        /// An absent coverage or an absent parameter range both mean the
        /// window holds no data for this station; only a shape the API
        /// contract rules out is treated as a payload error.
        pub fn into_readings(self, parameter: &str) -> Result<Vec<PressureReading>> {
            let Some(mut coverage) = self.coverages.into_iter().next() else {
                return Ok(vec![]);
            };

            let times = coverage.domain.axes.t.values;
            let Some(range) = coverage.ranges.remove(parameter) else {
                return Ok(vec![]);
            };

            if times.len() != range.values.len() {
                return Err(LuchtdrukError::upstream_payload(format!(
                    "time axis has {} entries but '{}' has {} values",
                    times.len(),
                    parameter,
                    range.values.len()
                )));
            }

            times
                .into_iter()
                .zip(range.values)
                .filter_map(|(time, value)| value.map(|v| (time, v)))
                .map(|(time, value)| {
                    let timestamp = DateTime::parse_from_rfc3339(&time)
                        .map(|dt| dt.with_timezone(&Utc))
                        .map_err(|_| {
                            LuchtdrukError::upstream_payload(format!(
                                "unparseable observation timestamp: {time}"
                            ))
                        })?;
                    Ok(PressureReading::new(value, timestamp))
                })
                .collect()
        }
    }
}
