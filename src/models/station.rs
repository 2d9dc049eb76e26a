//! Weather station metadata

use serde::{Deserialize, Serialize};

use crate::models::Coordinates;

/// A single KNMI weather station.
///
/// Loaded once from the EDR collection's locations endpoint and treated as
/// read-only for the lifetime of the process.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Station {
    /// Provider-assigned stable identifier (WIGOS id, e.g. "0-20000-0-06260")
    pub id: String,
    /// Display name (e.g. "De Bilt")
    pub name: String,
    /// Station position
    pub coordinates: Coordinates,
}

impl Station {
    /// Create a new station
    #[must_use]
    pub fn new<I: Into<String>, N: Into<String>>(
        id: I,
        name: N,
        coordinates: Coordinates,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            coordinates,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_station_distance_to_own_coordinates_is_zero() {
        let station = Station::new(
            "0-20000-0-06260",
            "De Bilt",
            Coordinates::new(5.1797, 52.0989),
        );
        assert_eq!(station.coordinates.distance_km(&station.coordinates), 0.0);
    }
}
