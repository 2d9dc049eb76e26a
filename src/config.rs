//! Configuration management for the `luchtdruk` service
//!
//! Handles loading configuration from an optional TOML file and environment
//! variables, and provides validation for all configuration settings. The
//! KNMI API key is a secret and only ever enters the process through these
//! sources.

use crate::LuchtdrukError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure for the `luchtdruk` service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LuchtdrukConfig {
    /// KNMI EDR API configuration
    #[serde(default)]
    pub knmi: KnmiConfig,
    /// Geocoder configuration
    #[serde(default)]
    pub geocoding: GeocodingConfig,
    /// Web server configuration
    #[serde(default)]
    pub server: ServerConfig,
}

/// KNMI EDR API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnmiConfig {
    /// Bearer token for the KNMI data platform. Required at startup; there
    /// is deliberately no default.
    pub api_key: Option<String>,
    /// Base URL of the EDR API
    #[serde(default = "default_knmi_base_url")]
    pub base_url: String,
    /// EDR collection holding the 10-minute observations
    #[serde(default = "default_knmi_collection")]
    pub collection: String,
    /// Request timeout in seconds
    #[serde(default = "default_upstream_timeout")]
    pub timeout_seconds: u32,
    /// Maximum number of retries for transient upstream failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// First lookback window when querying for the latest observation, in
    /// minutes. One 10-minute publication interval plus ingestion delay.
    #[serde(default = "default_initial_window_minutes")]
    pub initial_window_minutes: i64,
    /// Widest lookback window before giving up with a no-data answer, in
    /// minutes
    #[serde(default = "default_max_window_minutes")]
    pub max_window_minutes: i64,
}

/// Geocoder settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingConfig {
    /// Base URL of the Nominatim instance
    #[serde(default = "default_geocoding_base_url")]
    pub base_url: String,
    /// User agent sent with every geocoding request; Nominatim's usage
    /// policy requires a distinctive one
    #[serde(default = "default_geocoding_user_agent")]
    pub user_agent: String,
    /// ISO 3166-1 alpha-2 code of the country queries are restricted to
    #[serde(default = "default_country_code")]
    pub country_code: String,
    /// Request timeout in seconds
    #[serde(default = "default_upstream_timeout")]
    pub timeout_seconds: u32,
    /// Maximum number of retries for transient geocoder failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

/// Web server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// TCP port to listen on
    #[serde(default = "default_server_port")]
    pub port: u16,
    /// Whole-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u32,
}

// Default value functions
fn default_knmi_base_url() -> String {
    "https://api.dataplatform.knmi.nl/edr/v1".to_string()
}

fn default_knmi_collection() -> String {
    "10-minute-in-situ-meteorological-observations".to_string()
}

fn default_upstream_timeout() -> u32 {
    20
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_window_minutes() -> i64 {
    20
}

fn default_max_window_minutes() -> i64 {
    48 * 60
}

fn default_geocoding_base_url() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}

fn default_geocoding_user_agent() -> String {
    format!("luchtdruk/{} (knmi city lookup)", env!("CARGO_PKG_VERSION"))
}

fn default_country_code() -> String {
    "nl".to_string()
}

fn default_server_port() -> u16 {
    8000
}

fn default_request_timeout() -> u32 {
    30
}

impl Default for KnmiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_knmi_base_url(),
            collection: default_knmi_collection(),
            timeout_seconds: default_upstream_timeout(),
            max_retries: default_max_retries(),
            initial_window_minutes: default_initial_window_minutes(),
            max_window_minutes: default_max_window_minutes(),
        }
    }
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            base_url: default_geocoding_base_url(),
            user_agent: default_geocoding_user_agent(),
            country_code: default_country_code(),
            timeout_seconds: default_upstream_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_server_port(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

impl Default for LuchtdrukConfig {
    fn default() -> Self {
        Self {
            knmi: KnmiConfig::default(),
            geocoding: GeocodingConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl LuchtdrukConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from a specific path.
    ///
    /// Environment variables use the `LUCHTDRUK_` prefix with `__` as the
    /// nesting separator, e.g. `LUCHTDRUK_KNMI__API_KEY`.
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        builder = builder.add_source(
            Environment::with_prefix("LUCHTDRUK")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let config: LuchtdrukConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("luchtdruk").join("config.toml"))
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_api_key()?;
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate the KNMI API key
    pub fn validate_api_key(&self) -> Result<()> {
        let Some(api_key) = &self.knmi.api_key else {
            return Err(LuchtdrukError::config(
                "KNMI API key is missing. Set LUCHTDRUK_KNMI__API_KEY or add knmi.api_key to the config file.",
            )
            .into());
        };

        if api_key.is_empty() {
            return Err(LuchtdrukError::config(
                "KNMI API key cannot be empty. Please provide a valid key.",
            )
            .into());
        }

        if api_key.len() < 8 {
            return Err(LuchtdrukError::config(
                "KNMI API key appears to be invalid (too short). Please check your API key.",
            )
            .into());
        }

        if api_key.len() > 512 {
            return Err(LuchtdrukError::config(
                "KNMI API key appears to be invalid (too long). Please check your API key.",
            )
            .into());
        }

        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.knmi.timeout_seconds == 0 || self.knmi.timeout_seconds > 300 {
            return Err(LuchtdrukError::config(
                "KNMI request timeout must be between 1 and 300 seconds",
            )
            .into());
        }

        if self.geocoding.timeout_seconds == 0 || self.geocoding.timeout_seconds > 300 {
            return Err(LuchtdrukError::config(
                "Geocoding request timeout must be between 1 and 300 seconds",
            )
            .into());
        }

        if self.knmi.max_retries > 10 || self.geocoding.max_retries > 10 {
            return Err(LuchtdrukError::config("Upstream max retries cannot exceed 10").into());
        }

        if self.knmi.initial_window_minutes < 10 {
            return Err(LuchtdrukError::config(
                "Initial lookback window must cover at least one 10-minute publication interval",
            )
            .into());
        }

        if self.knmi.max_window_minutes < self.knmi.initial_window_minutes {
            return Err(LuchtdrukError::config(
                "Maximum lookback window cannot be narrower than the initial window",
            )
            .into());
        }

        if self.knmi.max_window_minutes > 7 * 24 * 60 {
            return Err(
                LuchtdrukError::config("Maximum lookback window cannot exceed 7 days").into(),
            );
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        for (label, url) in [
            ("KNMI", &self.knmi.base_url),
            ("Geocoding", &self.geocoding.base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(LuchtdrukError::config(format!(
                    "{label} base URL must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        let cc = &self.geocoding.country_code;
        if cc.len() != 2 || !cc.chars().all(|c| c.is_ascii_lowercase()) {
            return Err(LuchtdrukError::config(format!(
                "Country code must be a two-letter lowercase ISO code, got '{cc}'"
            ))
            .into());
        }

        if self.geocoding.user_agent.trim().is_empty() {
            return Err(LuchtdrukError::config(
                "Geocoding user agent cannot be empty; Nominatim requires one",
            )
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_key() -> LuchtdrukConfig {
        let mut config = LuchtdrukConfig::default();
        config.knmi.api_key = Some("valid_api_key_123".to_string());
        config
    }

    #[test]
    fn test_default_config() {
        let config = LuchtdrukConfig::default();
        assert_eq!(config.knmi.base_url, "https://api.dataplatform.knmi.nl/edr/v1");
        assert_eq!(
            config.knmi.collection,
            "10-minute-in-situ-meteorological-observations"
        );
        assert_eq!(config.knmi.timeout_seconds, 20);
        assert_eq!(config.knmi.initial_window_minutes, 20);
        assert_eq!(config.knmi.max_window_minutes, 2880);
        assert_eq!(config.geocoding.country_code, "nl");
        assert_eq!(config.server.port, 8000);
        assert!(config.knmi.api_key.is_none());
    }

    #[test]
    fn test_validation_requires_api_key() {
        let config = LuchtdrukConfig::default();
        let result = config.validate_api_key();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key is missing"));
    }

    #[test]
    fn test_validation_accepts_valid_config() {
        assert!(config_with_key().validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_short_api_key() {
        let mut config = LuchtdrukConfig::default();
        config.knmi.api_key = Some("short".to_string());
        let result = config.validate_api_key();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("too short"));
    }

    #[test]
    fn test_validation_rejects_zero_timeout() {
        let mut config = config_with_key();
        config.knmi.timeout_seconds = 0;
        let result = config.validate();
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("between 1 and 300 seconds")
        );
    }

    #[test]
    fn test_validation_rejects_inverted_windows() {
        let mut config = config_with_key();
        config.knmi.initial_window_minutes = 120;
        config.knmi.max_window_minutes = 60;
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("narrower"));
    }

    #[test]
    fn test_validation_rejects_tiny_initial_window() {
        let mut config = config_with_key();
        config.knmi.initial_window_minutes = 5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_bad_country_code() {
        let mut config = config_with_key();
        config.geocoding.country_code = "NLD".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("two-letter"));
    }

    #[test]
    fn test_validation_rejects_bad_base_url() {
        let mut config = config_with_key();
        config.knmi.base_url = "ftp://api.dataplatform.knmi.nl".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_path_generation() {
        let path = LuchtdrukConfig::get_config_path();
        assert!(path.is_some());
        let path = path.unwrap();
        assert!(path.to_string_lossy().contains("luchtdruk"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }
}
