use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::time::Duration;

use super::{AddressLookup, http_client, non_empty};
use crate::config::NominatimConfig;
use crate::domain::Point;

#[derive(Debug, Default, Deserialize)]
struct ReverseResult {
    #[serde(default)]
    display_name: Option<String>,
}

/// Nominatim reverse geocoding, the fallback address tier
pub struct NominatimClient {
    client: reqwest::blocking::Client,
    url: String,
}

impl NominatimClient {
    pub fn new(config: &NominatimConfig, user_agent: &str) -> Result<Self> {
        let client = http_client(user_agent, Duration::from_secs(config.timeout_secs))?;
        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }
}

/// Reverse query parameters; zoom 18 asks for building-level detail.
fn query_params(point: Point) -> [(&'static str, String); 5] {
    [
        ("format", "jsonv2".to_string()),
        ("lat", format!("{:.7}", point.lat)),
        ("lon", format!("{:.7}", point.lon)),
        ("zoom", "18".to_string()),
        ("addressdetails", "1".to_string()),
    ]
}

impl AddressLookup for NominatimClient {
    fn name(&self) -> &str {
        "nominatim"
    }

    fn reverse_geocode(&self, point: Point) -> Result<Option<String>> {
        let response = self
            .client
            .get(&self.url)
            .query(&query_params(point))
            .send()
            .context("Failed to send request to Nominatim API")?;

        if !response.status().is_success() {
            bail!("Nominatim API returned error status: {}", response.status());
        }

        let payload: serde_json::Value = response
            .json()
            .context("Failed to parse Nominatim JSON response")?;

        // Nominatim answers {"error": "Unable to geocode"} for empty areas
        let result: ReverseResult = serde_json::from_value(payload).unwrap_or_default();
        Ok(non_empty(result.display_name.as_deref()))
    }
}
