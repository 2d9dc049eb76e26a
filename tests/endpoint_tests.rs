//! Endpoint tests for the pressure lookup service
//!
//! Drives the full router in-process with stub collaborators, so no network
//! access or API key is needed.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, TimeZone, Utc};
use http_body_util::BodyExt;
use tower::ServiceExt;

use luchtdruk::api::AppState;
use luchtdruk::{
    Coordinates, Geocoder, LuchtdrukError, PressureProvider, PressureReading, Station,
    StationRegistry, web,
};

/// Geocoder with a fixed answer set; no network
struct StubGeocoder;

#[async_trait]
impl Geocoder for StubGeocoder {
    async fn geocode_city(&self, city_name: &str) -> luchtdruk::Result<Coordinates> {
        match city_name {
            "Amsterdam" => Ok(Coordinates::new(4.8945, 52.3732)),
            "Groningen" => Ok(Coordinates::new(6.567, 53.219)),
            "Berlin" => Err(LuchtdrukError::out_of_region("Berlin", "nl")),
            other => Err(LuchtdrukError::city_not_found(other)),
        }
    }
}

/// Pressure provider that answers from memory, with optional data gaps
struct StubPressureProvider {
    /// Stations that answer with a data gap instead of a reading
    gap_stations: Vec<String>,
}

impl StubPressureProvider {
    fn healthy() -> Self {
        Self {
            gap_stations: vec![],
        }
    }

    fn with_gap(station_id: &str) -> Self {
        Self {
            gap_stations: vec![station_id.to_string()],
        }
    }

    fn reading_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 50, 0).unwrap()
    }
}

#[async_trait]
impl PressureProvider for StubPressureProvider {
    async fn fetch_latest(
        &self,
        station_id: &str,
        _as_of: DateTime<Utc>,
    ) -> luchtdruk::Result<PressureReading> {
        if self.gap_stations.iter().any(|id| id == station_id) {
            return Err(LuchtdrukError::no_data(station_id, 2880));
        }
        Ok(PressureReading::new(1012.9, Self::reading_time()))
    }
}

/// Pressure provider whose upstream is down
struct UnavailablePressureProvider;

#[async_trait]
impl PressureProvider for UnavailablePressureProvider {
    async fn fetch_latest(
        &self,
        _station_id: &str,
        _as_of: DateTime<Utc>,
    ) -> luchtdruk::Result<PressureReading> {
        Err(LuchtdrukError::upstream(
            "tcp connect to 10.0.0.3:443 timed out",
        ))
    }
}

fn fixture_registry() -> StationRegistry {
    let station = |id: &str, name: &str, lon: f64, lat: f64| {
        Station::new(id, name, Coordinates::new(lon, lat))
    };
    StationRegistry::new(vec![
        station("0-20000-0-06235", "De Kooy", 4.781, 52.928),
        station("0-20000-0-06240", "Schiphol", 4.790, 52.318),
        station("0-20000-0-06260", "De Bilt", 5.180, 52.100),
        station("0-20000-0-06280", "Eelde", 6.585, 53.125),
        station("0-20000-0-06344", "Rotterdam", 4.447, 51.962),
        station("0-20000-0-06380", "Maastricht", 5.762, 50.906),
    ])
    .expect("fixture registry should be valid")
}

fn app_with(pressure: Arc<dyn PressureProvider>) -> Router {
    let state = Arc::new(AppState {
        geocoder: Arc::new(StubGeocoder),
        pressure,
        stations: Arc::new(fixture_registry()),
    });
    web::app(state, Duration::from_secs(5))
}

async fn get(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).expect("response body should be JSON");
    (status, json)
}

#[tokio::test]
async fn amsterdam_maps_to_schiphol_with_plausible_pressure() {
    let app = app_with(Arc::new(StubPressureProvider::healthy()));
    let (status, body) = get(app, "/pressure?city_name=Amsterdam").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["city"], "Amsterdam");
    assert_eq!(body["station"], "Schiphol");
    assert_eq!(body["station_id"], "0-20000-0-06240");

    let distance = body["distance_km"].as_f64().unwrap();
    assert!(distance > 0.0, "Amsterdam is not on top of the station");
    assert!(distance < 10.0, "Schiphol should be within ~10 km, got {distance}");

    let pressure = body["pressure_hpa"].as_f64().unwrap();
    assert!((800.0..=1200.0).contains(&pressure));
    assert!(body["timestamp"].as_str().unwrap().starts_with("2025-06-01T12:50"));
}

#[tokio::test]
async fn unknown_city_is_a_json_not_found() {
    let app = app_with(Arc::new(StubPressureProvider::healthy()));
    let (status, body) = get(app, "/pressure?city_name=!!!").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("!!!"));
}

#[tokio::test]
async fn empty_city_name_is_a_json_not_found() {
    let app = app_with(Arc::new(StubPressureProvider::healthy()));
    let (status, body) = get(app, "/pressure?city_name=").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn missing_city_name_parameter_is_a_json_not_found() {
    let app = app_with(Arc::new(StubPressureProvider::healthy()));
    let (status, body) = get(app, "/pressure").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn city_outside_the_netherlands_is_unprocessable() {
    let app = app_with(Arc::new(StubPressureProvider::healthy()));
    let (status, body) = get(app, "/pressure?city_name=Berlin").await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("Berlin"));
}

#[tokio::test]
async fn station_data_gap_is_a_json_not_found_not_a_crash() {
    // Groningen's nearest station is Eelde; give Eelde a data gap.
    let app = app_with(Arc::new(StubPressureProvider::with_gap("0-20000-0-06280")));
    let (status, body) = get(app, "/pressure?city_name=Groningen").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("no pressure data"));
    assert!(message.contains("0-20000-0-06280"));
}

#[tokio::test]
async fn upstream_outage_is_a_bad_gateway_without_internal_detail() {
    let app = app_with(Arc::new(UnavailablePressureProvider));
    let (status, body) = get(app, "/pressure?city_name=Amsterdam").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let message = body["error"].as_str().unwrap();
    assert!(!message.contains("10.0.0.3"), "internal detail leaked: {message}");
    assert!(!message.is_empty());
}

#[tokio::test]
async fn index_serves_the_query_form() {
    let app = app_with(Arc::new(StubPressureProvider::healthy()));
    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains(r#"form action="/pressure""#));
    assert!(html.contains(r#"name="city_name""#));
}
