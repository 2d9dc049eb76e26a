//! `luchtdruk` - air pressure lookup for Dutch cities
//!
//! This library resolves a city name to the nearest KNMI weather station and
//! retrieves the most recent air pressure observation for that station from
//! the KNMI EDR API.

pub mod api;
pub mod config;
pub mod error;
pub mod geocoding;
pub mod models;
pub mod pressure;
pub mod stations;
pub mod web;

// Re-export core types for public API
pub use config::LuchtdrukConfig;
pub use error::LuchtdrukError;
pub use geocoding::{Geocoder, NominatimClient};
pub use models::{Coordinates, PressureReading, Station};
pub use pressure::{EdrClient, PressureProvider};
pub use stations::StationRegistry;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, LuchtdrukError>;
