//! Configuration management

use anyhow::{self, Context, Result};

/// Which geocoder implementation to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeocoderBackend {
    /// Deterministic fake coordinates, no lookups at all
    Mock,
    /// Built-in table of major cities only
    Table,
    /// City table first, then Nominatim
    Nominatim,
}

impl std::str::FromStr for GeocoderBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mock" => Ok(Self::Mock),
            "table" => Ok(Self::Table),
            "nominatim" => Ok(Self::Nominatim),
            other => anyhow::bail!(
                "unknown GEOCODER_BACKEND '{}' (expected mock, table or nominatim)",
                other
            ),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// NATS server URL
    pub nats_url: String,

    /// Nominatim API URL (for geocoding)
    pub nominatim_url: String,

    /// OSRM routing engine URL (optional, falls back to estimation if unavailable)
    pub osrm_url: Option<String>,

    /// Geocoder implementation
    pub geocoder_backend: GeocoderBackend,

    /// Minimum delay between Nominatim requests in milliseconds
    pub nominatim_rate_limit_ms: u64,
}

const DEFAULT_NATS_URL: &str = "nats://localhost:4222";
const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";
const DEFAULT_NOMINATIM_RATE_LIMIT_MS: u64 = 1500;

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let nats_url = var("NATS_URL").unwrap_or_else(|| DEFAULT_NATS_URL.to_string());

        let nominatim_url = var("NOMINATIM_URL")
            .unwrap_or_else(|| DEFAULT_NOMINATIM_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let osrm_url = var("OSRM_URL").map(|url| url.trim_end_matches('/').to_string());

        let geocoder_backend = match var("GEOCODER_BACKEND") {
            Some(raw) => raw.parse()?,
            None => GeocoderBackend::Table,
        };

        let nominatim_rate_limit_ms = match var("NOMINATIM_RATE_LIMIT_MS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("NOMINATIM_RATE_LIMIT_MS must be an integer, got '{}'", raw))?,
            None => DEFAULT_NOMINATIM_RATE_LIMIT_MS,
        };

        Ok(Self {
            nats_url,
            nominatim_url,
            osrm_url,
            geocoder_backend,
            nominatim_rate_limit_ms,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            nats_url: DEFAULT_NATS_URL.to_string(),
            nominatim_url: DEFAULT_NOMINATIM_URL.to_string(),
            osrm_url: None,
            geocoder_backend: GeocoderBackend::Table,
            nominatim_rate_limit_ms: DEFAULT_NOMINATIM_RATE_LIMIT_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_config_defaults_when_nothing_set() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.nats_url, "nats://localhost:4222");
        assert_eq!(config.nominatim_url, "https://nominatim.openstreetmap.org");
        assert!(config.osrm_url.is_none());
        assert_eq!(config.geocoder_backend, GeocoderBackend::Table);
        assert_eq!(config.nominatim_rate_limit_ms, 1500);
    }

    #[test]
    fn test_config_osrm_url_some_when_set() {
        let config = config_from(&[("OSRM_URL", "http://localhost:5000/")]).unwrap();
        assert_eq!(config.osrm_url, Some("http://localhost:5000".to_string()));
    }

    #[test]
    fn test_config_blank_osrm_url_is_none() {
        let config = config_from(&[("OSRM_URL", "  ")]).unwrap();
        assert!(config.osrm_url.is_none());
    }

    #[test]
    fn test_config_nominatim_url_uses_local_when_set() {
        let config = config_from(&[("NOMINATIM_URL", "http://localhost:8080")]).unwrap();
        assert_eq!(config.nominatim_url, "http://localhost:8080");
    }

    #[test]
    fn test_config_geocoder_backend_parses_case_insensitively() {
        let config = config_from(&[("GEOCODER_BACKEND", "Nominatim")]).unwrap();
        assert_eq!(config.geocoder_backend, GeocoderBackend::Nominatim);
        let config = config_from(&[("GEOCODER_BACKEND", "mock")]).unwrap();
        assert_eq!(config.geocoder_backend, GeocoderBackend::Mock);
    }

    #[test]
    fn test_config_rejects_unknown_backend() {
        let err = config_from(&[("GEOCODER_BACKEND", "google")]).unwrap_err();
        assert!(err.to_string().contains("google"));
    }

    #[test]
    fn test_config_rejects_non_numeric_rate_limit() {
        assert!(config_from(&[("NOMINATIM_RATE_LIMIT_MS", "fast")]).is_err());
        let config = config_from(&[("NOMINATIM_RATE_LIMIT_MS", "250")]).unwrap();
        assert_eq!(config.nominatim_rate_limit_ms, 250);
    }
}
