//! Error types and handling for the `luchtdruk` service

use thiserror::Error;

/// Main error type for the `luchtdruk` service
#[derive(Error, Debug)]
pub enum LuchtdrukError {
    /// The geocoder returned nothing for the given name
    #[error("could not find coordinates for city: {city}")]
    CityNotFound { city: String },

    /// The name resolved, but outside the target country
    #[error("the city of {city} is not in the target country ({country_code})")]
    OutOfRegion { city: String, country_code: String },

    /// No observation inside the widest query window
    #[error("no pressure data for station {station_id} within the last {window_minutes} minutes")]
    NoData {
        station_id: String,
        window_minutes: i64,
    },

    /// Transport failure, timeout, or non-success status from a collaborator
    #[error("upstream request failed: {message}")]
    Upstream { message: String },

    /// The collaborator answered, but not in the shape we expect
    #[error("unexpected upstream payload: {message}")]
    UpstreamPayload { message: String },

    /// Startup-time misconfiguration
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl LuchtdrukError {
    /// Create a new city-not-found error
    pub fn city_not_found<S: Into<String>>(city: S) -> Self {
        Self::CityNotFound { city: city.into() }
    }

    /// Create a new out-of-region error
    pub fn out_of_region<S: Into<String>, C: Into<String>>(city: S, country_code: C) -> Self {
        Self::OutOfRegion {
            city: city.into(),
            country_code: country_code.into(),
        }
    }

    /// Create a new no-data error
    pub fn no_data<S: Into<String>>(station_id: S, window_minutes: i64) -> Self {
        Self::NoData {
            station_id: station_id.into(),
            window_minutes,
        }
    }

    /// Create a new upstream error
    pub fn upstream<S: Into<String>>(message: S) -> Self {
        Self::Upstream {
            message: message.into(),
        }
    }

    /// Create a new upstream-payload error
    pub fn upstream_payload<S: Into<String>>(message: S) -> Self {
        Self::UpstreamPayload {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Get a message safe to hand to an untrusted caller.
    ///
    /// Recoverable conditions carry their full text; transport and payload
    /// failures are reduced to a generic line so provider details and
    /// internals stay out of responses.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            LuchtdrukError::CityNotFound { .. }
            | LuchtdrukError::OutOfRegion { .. }
            | LuchtdrukError::NoData { .. } => self.to_string(),
            LuchtdrukError::Upstream { .. } => {
                "Unable to reach the weather data provider. Please try again later.".to_string()
            }
            LuchtdrukError::UpstreamPayload { .. } => {
                "The weather data provider returned an unexpected response.".to_string()
            }
            LuchtdrukError::Config { .. } => {
                "The service is misconfigured. Please contact the operator.".to_string()
            }
        }
    }
}
