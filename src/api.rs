//! HTTP API for the pressure lookup service
//!
//! Two routes: the index form and `GET /pressure?city_name=<string>`. Every
//! outcome, success or failure, is a JSON object; callers never see an HTML
//! error page from this service.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::geocoding::Geocoder;
use crate::pressure::PressureProvider;
use crate::stations::StationRegistry;
use crate::{LuchtdrukError, Result};

/// Shared state for request handlers.
///
/// The station registry is immutable after startup; the two providers are
/// stateless clients, so concurrent requests need no coordination.
pub struct AppState {
    pub geocoder: Arc<dyn Geocoder>,
    pub pressure: Arc<dyn PressureProvider>,
    pub stations: Arc<StationRegistry>,
}

#[derive(Debug, Deserialize)]
pub struct PressureQuery {
    #[serde(default)]
    pub city_name: String,
}

/// Successful lookup result
#[derive(Debug, Serialize, Deserialize)]
pub struct PressureResponse {
    /// City name as supplied by the caller (trimmed)
    pub city: String,
    /// Display name of the matched station
    pub station: String,
    /// Identifier of the matched station
    pub station_id: String,
    /// Distance from the city to the station, rounded to 0.1 km
    pub distance_km: f64,
    /// Timestamp the provider associates with the measurement (UTC)
    pub timestamp: DateTime<Utc>,
    /// Air pressure at sea level in hPa
    pub pressure_hpa: f64,
}

/// Failure body, uniform across all error conditions
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Build the service router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/pressure", get(pressure_endpoint))
        .with_state(state)
}

/// Render the main page with a form to input a city name
async fn index() -> Html<&'static str> {
    Html(
        r#"<html>
    <body>
        <h2>City in the Netherlands:</h2>
        <form action="/pressure">
            <input type="text" name="city_name" />
            <input type="submit" value="Submit" />
        </form>
    </body>
</html>"#,
    )
}

/// Return the latest air pressure for the station nearest to the given city
async fn pressure_endpoint(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PressureQuery>,
) -> Response {
    // A missing parameter gets the same JSON treatment as an empty one,
    // keeping the failure contract uniform.
    let city_name = query.city_name;

    match lookup_pressure(&state, &city_name).await {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(error) => {
            // Full detail stays in the log; the response carries the
            // caller-safe message only.
            warn!("Pressure lookup for '{}' failed: {}", city_name, error);
            (
                status_for(&error),
                Json(ErrorResponse {
                    error: error.user_message(),
                }),
            )
                .into_response()
        }
    }
}

async fn lookup_pressure(state: &AppState, city_name: &str) -> Result<PressureResponse> {
    let city = city_name.trim();
    if city.is_empty() {
        return Err(LuchtdrukError::city_not_found(city_name));
    }

    let coordinates = state.geocoder.geocode_city(city).await?;
    let (station, distance_km) = state.stations.nearest(&coordinates);
    let reading = state.pressure.fetch_latest(&station.id, Utc::now()).await?;

    info!(
        "'{}' -> {} ({}) at {:.1} km: {} hPa at {}",
        city, station.name, station.id, distance_km, reading.pressure_hpa, reading.timestamp
    );

    Ok(PressureResponse {
        city: city.to_string(),
        station: station.name.clone(),
        station_id: station.id.clone(),
        distance_km: round_to_tenth(distance_km),
        timestamp: reading.timestamp,
        pressure_hpa: reading.pressure_hpa,
    })
}

fn status_for(error: &LuchtdrukError) -> StatusCode {
    match error {
        LuchtdrukError::CityNotFound { .. } | LuchtdrukError::NoData { .. } => {
            StatusCode::NOT_FOUND
        }
        LuchtdrukError::OutOfRegion { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        LuchtdrukError::Upstream { .. } => StatusCode::BAD_GATEWAY,
        LuchtdrukError::UpstreamPayload { .. } | LuchtdrukError::Config { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(9.4425, 9.4)]
    #[case(9.45, 9.5)]
    #[case(0.0, 0.0)]
    #[case(100.04, 100.0)]
    fn test_round_to_tenth(#[case] input: f64, #[case] expected: f64) {
        assert_eq!(round_to_tenth(input), expected);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&LuchtdrukError::city_not_found("x")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&LuchtdrukError::out_of_region("Berlin", "nl")),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(&LuchtdrukError::no_data("0-20000-0-06260", 2880)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&LuchtdrukError::upstream("timeout")),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&LuchtdrukError::upstream_payload("bad shape")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_pressure_response_serializes_expected_fields() {
        use chrono::TimeZone;

        let body = PressureResponse {
            city: "Amsterdam".to_string(),
            station: "Schiphol".to_string(),
            station_id: "0-20000-0-06240".to_string(),
            distance_km: 9.4,
            timestamp: Utc.with_ymd_and_hms(2025, 6, 1, 12, 50, 0).unwrap(),
            pressure_hpa: 1012.9,
        };
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["city"], "Amsterdam");
        assert_eq!(json["station"], "Schiphol");
        assert_eq!(json["station_id"], "0-20000-0-06240");
        assert_eq!(json["distance_km"], 9.4);
        assert_eq!(json["pressure_hpa"], 1012.9);
        assert!(json["timestamp"].as_str().unwrap().starts_with("2025-06-01T12:50"));
    }
}
