//! Station registry for the KNMI 10-minute observation collection
//!
//! The registry is the single source of truth for station identifiers, names
//! and positions. It is fetched once at startup from the EDR collection's
//! locations endpoint and injected as an immutable resource; all lookups
//! reference stations from here.

use reqwest_middleware::ClientWithMiddleware;
use tracing::info;

use crate::config::KnmiConfig;
use crate::models::{Coordinates, Station};
use crate::{LuchtdrukError, Result};

/// Immutable set of known weather stations.
///
/// Guaranteed non-empty with well-formed coordinates; both are enforced at
/// construction, so `nearest` always has an answer.
#[derive(Debug, Clone)]
pub struct StationRegistry {
    stations: Vec<Station>,
}

impl StationRegistry {
    /// Build a registry from an already-loaded station list
    pub fn new(stations: Vec<Station>) -> Result<Self> {
        if stations.is_empty() {
            return Err(LuchtdrukError::upstream_payload(
                "station registry is empty",
            ));
        }
        for station in &stations {
            if !station.coordinates.is_well_formed() {
                return Err(LuchtdrukError::upstream_payload(format!(
                    "station {} has malformed coordinates: {}",
                    station.id,
                    station.coordinates.format()
                )));
            }
        }
        Ok(Self { stations })
    }

    /// Fetch the station list from the EDR locations endpoint
    pub async fn fetch(client: &ClientWithMiddleware, config: &KnmiConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .ok_or_else(|| LuchtdrukError::config("KNMI API key is not configured"))?;

        let url = format!(
            "{}/collections/{}/locations",
            config.base_url, config.collection
        );
        info!("Fetching station registry from {}", url);

        let response = client
            .get(&url)
            .header("Authorization", api_key)
            .send()
            .await
            .map_err(|e| {
                LuchtdrukError::upstream(format!("station registry request failed: {e}"))
            })?;

        let response = response.error_for_status().map_err(|e| {
            LuchtdrukError::upstream(format!("station registry returned an error status: {e}"))
        })?;

        let payload: geojson::LocationsResponse = response.json().await.map_err(|e| {
            LuchtdrukError::upstream_payload(format!(
                "failed to parse station registry response: {e}"
            ))
        })?;

        let stations = payload
            .features
            .into_iter()
            .map(geojson::Feature::into_station)
            .collect::<Result<Vec<_>>>()?;

        info!("Loaded {} stations", stations.len());
        Self::new(stations)
    }

    /// Number of stations in the registry
    #[must_use]
    pub fn len(&self) -> usize {
        self.stations.len()
    }

    /// Always false; kept for the conventional pairing with `len`
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// Iterate over all stations
    pub fn iter(&self) -> impl Iterator<Item = &Station> {
        self.stations.iter()
    }

    /// Find the station nearest to the given point, and the distance to it in
    /// kilometers.
    ///
    /// Linear scan over the registry. At exactly equal distances the station
    /// with the smaller id wins, so the result does not depend on registry
    /// order.
    #[must_use]
    pub fn nearest(&self, point: &Coordinates) -> (&Station, f64) {
        let mut best = &self.stations[0];
        let mut best_distance = point.distance_km(&best.coordinates);

        for station in &self.stations[1..] {
            let distance = point.distance_km(&station.coordinates);
            if distance < best_distance || (distance == best_distance && station.id < best.id) {
                best = station;
                best_distance = distance;
            }
        }

        (best, best_distance)
    }
}

/// GeoJSON structures for the EDR locations payload
mod geojson {
    use serde::Deserialize;

    use crate::models::{Coordinates, Station};
    use crate::{LuchtdrukError, Result};

    #[derive(Debug, Deserialize)]
    pub struct LocationsResponse {
        #[serde(default)]
        pub features: Vec<Feature>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Feature {
        pub id: String,
        pub geometry: Geometry,
        pub properties: Properties,
    }

    #[derive(Debug, Deserialize)]
    pub struct Geometry {
        /// `[lon, lat]`, with an optional trailing elevation
        pub coordinates: Vec<f64>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Properties {
        pub name: String,
    }

    impl Feature {
        pub fn into_station(self) -> Result<Station> {
            let [longitude, latitude, ..] = self.geometry.coordinates[..] else {
                return Err(LuchtdrukError::upstream_payload(format!(
                    "station {} has {} coordinate components, expected at least 2",
                    self.id,
                    self.geometry.coordinates.len()
                )));
            };
            Ok(Station::new(
                self.id,
                self.properties.name,
                Coordinates::new(longitude, latitude),
            ))
        }
    }
}
