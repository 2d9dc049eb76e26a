use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use luchtdruk::api::AppState;
use luchtdruk::{EdrClient, LuchtdrukConfig, NominatimClient, StationRegistry, web};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = LuchtdrukConfig::load().context("Failed to load configuration")?;

    let geocoder =
        NominatimClient::new(config.geocoding.clone()).context("Failed to create geocoder")?;
    let pressure = EdrClient::new(&config.knmi).context("Failed to create EDR client")?;

    // The registry is loaded once here and never mutated afterwards.
    let stations = StationRegistry::fetch(pressure.http_client(), &config.knmi)
        .await
        .context("Failed to load the station registry")?;
    tracing::info!("Station registry ready with {} stations", stations.len());

    let state = Arc::new(AppState {
        geocoder: Arc::new(geocoder),
        pressure: Arc::new(pressure),
        stations: Arc::new(stations),
    });

    web::run(
        state,
        config.server.port,
        Duration::from_secs(config.server.request_timeout_seconds.into()),
    )
    .await
}
