//! Data models for the pressure lookup service

pub mod location;
pub mod reading;
pub mod station;

pub use location::Coordinates;
pub use reading::PressureReading;
pub use station::Station;
