use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::time::Duration;

use super::{AddressLookup, http_client, non_empty};
use crate::config::YandexConfig;
use crate::domain::Point;

#[derive(Debug, Default, Deserialize)]
struct GeocoderResponse {
    #[serde(default)]
    response: Option<ResponseBody>,
}

#[derive(Debug, Deserialize)]
struct ResponseBody {
    #[serde(rename = "GeoObjectCollection", default)]
    collection: Option<GeoObjectCollection>,
}

#[derive(Debug, Deserialize)]
struct GeoObjectCollection {
    #[serde(rename = "featureMember", default)]
    feature_member: Vec<FeatureMember>,
}

#[derive(Debug, Deserialize)]
struct FeatureMember {
    #[serde(rename = "GeoObject", default)]
    geo_object: Option<GeoObject>,
}

#[derive(Debug, Deserialize)]
struct GeoObject {
    #[serde(rename = "metaDataProperty", default)]
    meta_data_property: Option<MetaDataProperty>,
}

#[derive(Debug, Deserialize)]
struct MetaDataProperty {
    #[serde(rename = "GeocoderMetaData", default)]
    geocoder_meta_data: Option<GeocoderMetaData>,
}

#[derive(Debug, Deserialize)]
struct GeocoderMetaData {
    #[serde(default)]
    text: Option<String>,
    #[serde(rename = "Address", default)]
    address: Option<Address>,
}

#[derive(Debug, Deserialize)]
struct Address {
    #[serde(default)]
    formatted: Option<String>,
}

impl GeocoderResponse {
    /// Best-effort formatted address of the first feature
    fn address(&self) -> Option<String> {
        let metadata = self
            .response
            .as_ref()?
            .collection
            .as_ref()?
            .feature_member
            .first()?
            .geo_object
            .as_ref()?
            .meta_data_property
            .as_ref()?
            .geocoder_meta_data
            .as_ref()?;

        non_empty(metadata.text.as_deref()).or_else(|| {
            non_empty(
                metadata
                    .address
                    .as_ref()
                    .and_then(|a| a.formatted.as_deref()),
            )
        })
    }
}

/// Yandex Geocoder reverse lookup, the primary address tier
pub struct YandexClient {
    client: reqwest::blocking::Client,
    config: YandexConfig,
}

impl YandexClient {
    pub fn new(config: &YandexConfig, user_agent: &str) -> Result<Self> {
        let client = http_client(user_agent, Duration::from_secs(config.timeout_secs))?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    fn query_params(&self, point: Point) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("format", "json".to_string()),
            ("kind", "house".to_string()),
            ("results", "1".to_string()),
            ("lang", self.config.lang.clone()),
            ("sco", "latlong".to_string()),
            // Yandex takes "lon,lat" even with sco=latlong
            ("geocode", format!("{},{}", point.lon, point.lat)),
        ];
        if let Some(key) = &self.config.api_key {
            params.push(("apikey", key.clone()));
        }
        params
    }
}

impl AddressLookup for YandexClient {
    fn name(&self) -> &str {
        "yandex"
    }

    fn reverse_geocode(&self, point: Point) -> Result<Option<String>> {
        let response = self
            .client
            .get(&self.config.url)
            .header(reqwest::header::ACCEPT_LANGUAGE, "ru,en;q=0.5")
            .query(&self.query_params(point))
            .send()
            .context("Failed to send request to Yandex Geocoder")?;

        if !response.status().is_success() {
            bail!("Yandex Geocoder returned error status: {}", response.status());
        }

        let payload: serde_json::Value = response
            .json()
            .context("Failed to parse Yandex Geocoder JSON response")?;

        // Valid JSON of an unexpected shape is "no address", not a failure
        let parsed: GeocoderResponse = serde_json::from_value(payload).unwrap_or_default();
        Ok(parsed.address())
    }
}
