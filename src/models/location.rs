//! Geographic coordinates shared by cities and stations

use haversine::{Location as HaversineLocation, Units, distance};
use serde::{Deserialize, Serialize};

/// A point on the globe in decimal degrees.
///
/// Longitude comes first to match the axis order of the EDR GeoJSON payloads;
/// both city and station positions use this type so the two never disagree on
/// axis order.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Coordinates {
    /// Longitude in decimal degrees (positive for East)
    pub longitude: f64,
    /// Latitude in decimal degrees (positive for North)
    pub latitude: f64,
}

impl Coordinates {
    /// Create new coordinates
    #[must_use]
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    /// Great-circle distance to another point, in kilometers
    #[must_use]
    pub fn distance_km(&self, other: &Coordinates) -> f64 {
        let from = HaversineLocation {
            latitude: self.latitude,
            longitude: self.longitude,
        };
        let to = HaversineLocation {
            latitude: other.latitude,
            longitude: other.longitude,
        };
        distance(from, to, Units::Kilometers)
    }

    /// Whether both components are finite, ordinary numbers
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.longitude.is_finite()
            && self.latitude.is_finite()
            && (-180.0..=180.0).contains(&self.longitude)
            && (-90.0..=90.0).contains(&self.latitude)
    }

    /// Format as "lon, lat" with four decimals
    #[must_use]
    pub fn format(&self) -> String {
        format!("{:.4}, {:.4}", self.longitude, self.latitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_to_self_is_zero() {
        let de_bilt = Coordinates::new(5.1797, 52.0989);
        assert_eq!(de_bilt.distance_km(&de_bilt), 0.0);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let amsterdam = Coordinates::new(4.8945, 52.3732);
        let schiphol = Coordinates::new(4.7900, 52.3180);
        let there = amsterdam.distance_km(&schiphol);
        let back = schiphol.distance_km(&amsterdam);
        assert!((there - back).abs() < 1e-9);
    }

    #[test]
    fn test_amsterdam_schiphol_distance_is_about_nine_km() {
        let amsterdam = Coordinates::new(4.8945, 52.3732);
        let schiphol = Coordinates::new(4.7900, 52.3180);
        let d = amsterdam.distance_km(&schiphol);
        assert!(d > 5.0 && d < 15.0, "expected roughly 9 km, got {d}");
    }

    #[test]
    fn test_well_formed_rejects_nan_and_out_of_range() {
        assert!(Coordinates::new(5.0, 52.0).is_well_formed());
        assert!(!Coordinates::new(f64::NAN, 52.0).is_well_formed());
        assert!(!Coordinates::new(5.0, f64::INFINITY).is_well_formed());
        assert!(!Coordinates::new(181.0, 52.0).is_well_formed());
        assert!(!Coordinates::new(5.0, -91.0).is_well_formed());
    }
}
