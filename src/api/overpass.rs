use anyhow::{Context, Result, bail};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::time::Duration;
use tracing::{debug, warn};

use super::{GeodataSource, http_client};
use crate::config::OverpassConfig;
use crate::domain::{Point, RawElement};
use crate::osm::parse_elements;

/// Raw Overpass API response
///
/// Decoding is per entry: an element, member or node that does not fit the
/// expected shape is dropped or blanked instead of failing the whole body.
#[derive(Debug, Deserialize)]
pub struct OverpassResponse {
    #[serde(default, deserialize_with = "lenient_seq")]
    pub elements: Vec<Element>,
}

/// A single element from an `out geom` query (way or relation)
#[derive(Debug, Deserialize)]
pub struct Element {
    #[serde(rename = "type", default)]
    pub type_: Option<String>,
    #[serde(default, deserialize_with = "lenient_nodes")]
    pub geometry: Vec<GeomNode>,
    #[serde(default, deserialize_with = "lenient_seq")]
    pub members: Vec<Member>,
}

/// Relation member with inlined geometry
#[derive(Debug, Deserialize)]
pub struct Member {
    #[serde(rename = "type", default)]
    pub type_: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default, deserialize_with = "lenient_nodes")]
    pub geometry: Vec<GeomNode>,
}

/// Node coordinate; unusable values deserialize to `None`
#[derive(Debug, Default, Deserialize)]
pub struct GeomNode {
    #[serde(default, deserialize_with = "lenient_coord")]
    pub lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient_coord")]
    pub lon: Option<f64>,
}

fn lenient_coord<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let coord = match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    Ok(coord.filter(|v| v.is_finite()))
}

/// Decode a list entry by entry, dropping entries of the wrong shape
fn lenient_seq<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(raw_entries(deserializer)?
        .into_iter()
        .filter_map(|value| serde_json::from_value(value).ok())
        .collect())
}

/// Node lists keep their positions; a malformed node becomes coordinate-less
fn lenient_nodes<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<GeomNode>, D::Error> {
    Ok(raw_entries(deserializer)?
        .into_iter()
        .map(|value| serde_json::from_value(value).unwrap_or_default())
        .collect())
}

fn raw_entries<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<serde_json::Value>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Array(entries)) => entries,
        _ => Vec::new(),
    })
}

/// Overpass QL for building ways and relations within `radius_m` of the point
pub fn building_query(point: Point, radius_m: u32) -> String {
    format!(
        r#"[out:json][timeout:25];(way["building"](around:{radius},{lat},{lon});relation["building"](around:{radius},{lat},{lon}););out geom;"#,
        radius = radius_m,
        lat = point.lat,
        lon = point.lon
    )
}

/// Blocking Overpass client with mirror fallback and 429/504 retries
pub struct OverpassClient {
    client: reqwest::blocking::Client,
    config: OverpassConfig,
}

impl OverpassClient {
    pub fn new(config: &OverpassConfig, user_agent: &str) -> Result<Self> {
        let client = http_client(user_agent, Duration::from_secs(config.timeout_secs))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Fetch buildings around `point`, trying each mirror in order
    pub fn fetch_buildings(&self, point: Point) -> Result<OverpassResponse> {
        if self.config.urls.is_empty() {
            bail!("No Overpass API URLs configured");
        }

        let query = building_query(point, self.config.radius_m);
        debug!(
            "Requesting Overpass data for lat={} lon={} radius={}m",
            point.lat, point.lon, self.config.radius_m
        );

        let mut last_error = None;
        for url in &self.config.urls {
            match self.execute_query(url, &query) {
                Ok(response) => return Ok(response),
                Err(e) => {
                    warn!("Overpass mirror {} failed: {:#}", url, e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) => Err(e.context("All Overpass mirrors failed")),
            None => bail!("All Overpass mirrors failed"),
        }
    }

    fn execute_query(&self, url: &str, query: &str) -> Result<OverpassResponse> {
        let attempts = self.config.max_retries + 1;
        let mut last_status = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                let wait = Duration::from_secs(self.config.retry_backoff_secs * attempt as u64);
                debug!(
                    "Overpass busy, retrying in {:?} (attempt {}/{})",
                    wait,
                    attempt + 1,
                    attempts
                );
                std::thread::sleep(wait);
            }

            // Overpass expects form-encoded `data=<query>`
            let response = self
                .client
                .post(url)
                .form(&[("data", query)])
                .send()
                .context("Failed to send request to Overpass API")?;

            match response.status().as_u16() {
                200 => {
                    return response
                        .json()
                        .context("Failed to parse Overpass JSON response");
                }
                429 | 504 => {
                    last_status = Some(response.status());
                    continue;
                }
                _ => bail!("Overpass API returned error status: {}", response.status()),
            }
        }

        bail!(
            "Overpass API still busy after {} attempts (last status {})",
            attempts,
            last_status.map(|s| s.to_string()).unwrap_or_else(|| "unknown".to_string())
        )
    }
}

impl GeodataSource for OverpassClient {
    fn fetch_elements(&self, point: Point) -> Result<Vec<RawElement>> {
        let response = self.fetch_buildings(point)?;
        Ok(parse_elements(&response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_server;

    fn config_for(url: String, timeout_secs: u64) -> OverpassConfig {
        OverpassConfig {
            urls: vec![url],
            timeout_secs,
            ..OverpassConfig::default()
        }
    }

    #[test]
    fn test_building_query() {
        let query = building_query(Point::new(55.75, 37.62), 30);
        assert!(query.starts_with("[out:json][timeout:25];"));
        assert!(query.contains(r#"way["building"](around:30,55.75,37.62);"#));
        assert!(query.contains(r#"relation["building"](around:30,55.75,37.62);"#));
        assert!(query.ends_with("out geom;"));
    }

    #[test]
    fn test_parse_overpass_response() {
        let json = r#"{
            "version": 0.6,
            "elements": [
                {"type": "way", "id": 2, "tags": {"building": "yes"},
                 "geometry": [{"lat": 1.0, "lon": 2.0}, {"lat": null, "lon": 3.0}, {"lat": "4.5", "lon": 5}, null]},
                {"type": "relation", "id": 3,
                 "members": [{"type": "way", "ref": 10, "role": "outer",
                              "geometry": [{"lat": 0.0, "lon": 0.0}]}]}
            ]
        }"#;

        let response: OverpassResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.elements.len(), 2);

        let geometry = &response.elements[0].geometry;
        assert_eq!(geometry.len(), 4);
        assert_eq!(geometry[0].lat, Some(1.0));
        assert_eq!(geometry[1].lat, None);
        assert_eq!(geometry[2].lat, Some(4.5));
        assert_eq!(geometry[2].lon, Some(5.0));
        assert_eq!((geometry[3].lat, geometry[3].lon), (None, None));

        let members = &response.elements[1].members;
        assert_eq!(members[0].type_.as_deref(), Some("way"));
        assert_eq!(members[0].role.as_deref(), Some("outer"));
    }

    #[test]
    fn test_malformed_entries_do_not_fail_the_response() {
        let json = r#"{
            "elements": [
                {"id": 1, "geometry": [{"lat": 0.0, "lon": 0.0}]},
                "garbage",
                {"type": "relation", "id": 3, "members": [
                    {"ref": 10, "role": "outer", "geometry": [{"lat": 0.0, "lon": 0.0}]},
                    42,
                    {"type": "way", "role": "outer", "geometry": 7}
                ]},
                {"type": "way", "id": "not-a-number",
                 "geometry": [{"lat": 0.0, "lon": 0.0}, 7, {"lat": 0.0, "lon": 1.0}, {"lat": 1.0, "lon": 1.0}]}
            ]
        }"#;

        let response: OverpassResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.elements.len(), 3);
        assert!(response.elements[0].type_.is_none());
        assert_eq!(response.elements[1].members.len(), 2);
        assert!(response.elements[1].members[0].type_.is_none());
        assert!(response.elements[1].members[1].geometry.is_empty());

        let way = &response.elements[2].geometry;
        assert_eq!(way.len(), 4);
        assert_eq!((way[1].lat, way[1].lon), (None, None));
    }

    #[test]
    fn test_fetch_elements_over_http() {
        let body = r#"{"elements": [{"type": "way", "id": 1, "geometry": [
            {"lat": 0.0, "lon": 0.0}, {"lat": 0.0, "lon": 1.0}, {"lat": 1.0, "lon": 1.0}]}]}"#;
        let (url, server) = test_server::serve_once(200, body);

        let client = OverpassClient::new(&config_for(url, 5), "test").unwrap();
        let elements = client.fetch_elements(Point::new(55.75, 37.62)).unwrap();
        let request = server.join().unwrap();

        assert_eq!(elements.len(), 1);
        assert!(request.starts_with("POST "));
        assert!(request.contains("data="));
        assert!(request.contains("around%3A30%2C55.75%2C37.62"));
    }

    #[test]
    fn test_error_status_is_a_failure() {
        let (url, server) = test_server::serve_once(500, "{}");
        let client = OverpassClient::new(&config_for(url, 5), "test").unwrap();

        assert!(client.fetch_elements(Point::new(0.0, 0.0)).is_err());
        server.join().unwrap();
    }

    #[test]
    fn test_malformed_json_is_a_failure() {
        let (url, server) = test_server::serve_once(200, "<html>busy</html>");
        let client = OverpassClient::new(&config_for(url, 5), "test").unwrap();

        assert!(client.fetch_elements(Point::new(0.0, 0.0)).is_err());
        server.join().unwrap();
    }

    #[test]
    fn test_timeout_is_a_failure() {
        let (url, _listener) = test_server::silent();
        let client = OverpassClient::new(&config_for(url, 1), "test").unwrap();

        assert!(client.fetch_elements(Point::new(0.0, 0.0)).is_err());
    }

    #[test]
    fn test_falls_through_to_next_mirror() {
        let (bad_url, bad_server) = test_server::serve_once(502, "{}");
        let (good_url, good_server) = test_server::serve_once(200, r#"{"elements": []}"#);
        let config = OverpassConfig {
            urls: vec![bad_url, good_url],
            timeout_secs: 5,
            ..OverpassConfig::default()
        };

        let client = OverpassClient::new(&config, "test").unwrap();
        let elements = client.fetch_elements(Point::new(0.0, 0.0)).unwrap();

        assert!(elements.is_empty());
        bad_server.join().unwrap();
        good_server.join().unwrap();
    }

    #[test]
    fn test_no_mirrors_configured() {
        let config = OverpassConfig {
            urls: Vec::new(),
            ..OverpassConfig::default()
        };
        let client = OverpassClient::new(&config, "test").unwrap();
        assert!(client.fetch_buildings(Point::new(0.0, 0.0)).is_err());
    }
}
