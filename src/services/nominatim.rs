//! Nominatim geocoding client

use anyhow::{Context, Result};
use serde::Deserialize;
use crate::types::Coordinates;

/// Nominatim API response
#[derive(Debug, Deserialize)]
pub struct NominatimResult {
    pub lat: String,
    pub lon: String,
    pub display_name: String,
}

/// A resolved place
#[derive(Debug, Clone, PartialEq)]
pub struct NominatimPlace {
    pub coordinates: Coordinates,
    pub display_name: String,
}

/// Nominatim geocoding client
pub struct NominatimClient {
    base_url: String,
    client: reqwest::Client,
}

impl NominatimClient {
    /// Create a new client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("hos-worker/0.1 (trip planner)")
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Search URL for a free-text place name, restricted to India
    pub fn search_url(&self, place: &str) -> String {
        let query = format!("{}, India", place.trim());
        format!(
            "{}/search?q={}&format=json&countrycodes=in&limit=1",
            self.base_url,
            urlencoding::encode(&query)
        )
    }

    /// Look up a place name
    pub async fn search(&self, place: &str) -> Result<Option<NominatimPlace>> {
        let url = self.search_url(place);

        let response = self.client
            .get(&url)
            .send()
            .await
            .context("Failed to send geocoding request")?;

        if !response.status().is_success() {
            return Ok(None);
        }

        let results: Vec<NominatimResult> = response
            .json()
            .await
            .context("Failed to parse geocoding response")?;

        match results.into_iter().next() {
            Some(result) => Ok(Some(parse_result(result)?)),
            None => Ok(None),
        }
    }
}

fn parse_result(result: NominatimResult) -> Result<NominatimPlace> {
    let lat: f64 = result.lat.parse().context("Invalid latitude")?;
    let lng: f64 = result.lon.parse().context("Invalid longitude")?;

    Ok(NominatimPlace {
        coordinates: Coordinates { lat, lng },
        display_name: result.display_name,
    })
}
