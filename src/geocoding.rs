//! City name resolution via Nominatim
//!
//! Resolves free-text city names to coordinates, restricted to the configured
//! country. The geocoder is queried twice per lookup: once without a country
//! filter to distinguish an unknown name from a known name abroad, then with
//! the filter applied.

use async_trait::async_trait;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::GeocodingConfig;
use crate::models::Coordinates;
use crate::{LuchtdrukError, Result};

/// Capability to turn a city name into coordinates inside the target country.
///
/// The geocoder is best-effort: which inputs count as a "city" is decided by
/// the provider and is known to be inconsistent on edge-case names.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve a city name to coordinates.
    ///
    /// Fails with [`LuchtdrukError::CityNotFound`] when the name does not
    /// resolve at all, and with [`LuchtdrukError::OutOfRegion`] when it
    /// resolves only outside the target country.
    async fn geocode_city(&self, city_name: &str) -> Result<Coordinates>;
}

/// Geocoder backed by a Nominatim instance
pub struct NominatimClient {
    client: ClientWithMiddleware,
    config: GeocodingConfig,
}

impl NominatimClient {
    /// Create a new Nominatim client
    pub fn new(config: GeocodingConfig) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.into()))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| LuchtdrukError::config(format!("Failed to create HTTP client: {e}")))?;

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
        let client = ClientBuilder::new(inner)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self { client, config })
    }

    fn search_url(&self, city_name: &str, country_code: Option<&str>) -> String {
        let mut url = format!(
            "{}/search?q={}&format=jsonv2&featuretype=city&limit=1",
            self.config.base_url,
            urlencoding::encode(city_name)
        );
        if let Some(code) = country_code {
            url.push_str("&countrycodes=");
            url.push_str(code);
        }
        url
    }

    /// Run a single search and return the best hit, if any
    async fn search(
        &self,
        city_name: &str,
        country_code: Option<&str>,
    ) -> Result<Option<Coordinates>> {
        let url = self.search_url(city_name, country_code);
        debug!("Nominatim request URL: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LuchtdrukError::upstream(format!("geocoder request failed: {e}")))?;

        let response = response.error_for_status().map_err(|e| {
            LuchtdrukError::upstream(format!("geocoder returned an error status: {e}"))
        })?;

        let results: Vec<nominatim::SearchResult> = response.json().await.map_err(|e| {
            LuchtdrukError::upstream_payload(format!("failed to parse geocoder response: {e}"))
        })?;

        match results.into_iter().next() {
            None => Ok(None),
            Some(hit) => {
                if let Some(name) = &hit.display_name {
                    debug!("Best geocoder hit: {}", name);
                }
                hit.coordinates().map(Some)
            }
        }
    }
}

#[async_trait]
impl Geocoder for NominatimClient {
    async fn geocode_city(&self, city_name: &str) -> Result<Coordinates> {
        info!("Geocoding city: '{}'", city_name);

        if self.search(city_name, None).await?.is_none() {
            warn!("No geocoding results for '{}'", city_name);
            return Err(LuchtdrukError::city_not_found(city_name));
        }

        match self
            .search(city_name, Some(&self.config.country_code))
            .await?
        {
            Some(coordinates) => {
                debug!("Resolved '{}' to ({})", city_name, coordinates.format());
                Ok(coordinates)
            }
            None => {
                warn!(
                    "'{}' resolves, but not within '{}'",
                    city_name, self.config.country_code
                );
                Err(LuchtdrukError::out_of_region(
                    city_name,
                    &self.config.country_code,
                ))
            }
        }
    }
}

/// Nominatim response structures and conversion
mod nominatim {
    use serde::Deserialize;

    use crate::models::Coordinates;
    use crate::{LuchtdrukError, Result};

    /// A single hit from the `/search` endpoint. Nominatim serializes
    /// coordinates as strings.
    #[derive(Debug, Deserialize)]
    pub struct SearchResult {
        pub lat: String,
        pub lon: String,
        pub display_name: Option<String>,
    }

    impl SearchResult {
        pub fn coordinates(&self) -> Result<Coordinates> {
            let latitude: f64 = self.lat.parse().map_err(|_| {
                LuchtdrukError::upstream_payload(format!(
                    "geocoder returned a non-numeric latitude: {}",
                    self.lat
                ))
            })?;
            let longitude: f64 = self.lon.parse().map_err(|_| {
                LuchtdrukError::upstream_payload(format!(
                    "geocoder returned a non-numeric longitude: {}",
                    self.lon
                ))
            })?;

            let coordinates = Coordinates::new(longitude, latitude);
            if !coordinates.is_well_formed() {
                return Err(LuchtdrukError::upstream_payload(format!(
                    "geocoder returned out-of-range coordinates: {}",
                    coordinates.format()
                )));
            }
            Ok(coordinates)
        }
    }
}
