//! Building geometry resolution
//!
//! Fetches raw building elements around a point, assembles them into
//! polygons, picks the one containing the point and pairs it with an address
//! from an ordered chain of reverse geocoders.

use anyhow::Result;
use std::thread;
use tracing::{debug, warn};

use crate::api::{AddressLookup, GeodataSource, NominatimClient, OverpassClient, YandexClient};
use crate::config::Config;
use crate::domain::{Geometry, Point, Resolution};
use crate::error::ResolveError;
use crate::osm::assemble_all;

pub struct Resolver {
    geodata: Box<dyn GeodataSource>,
    lookups: Vec<Box<dyn AddressLookup>>,
}

impl Resolver {
    /// `lookups` are tried in order until one yields an address
    pub fn new(geodata: Box<dyn GeodataSource>, lookups: Vec<Box<dyn AddressLookup>>) -> Self {
        Self { geodata, lookups }
    }

    /// Production wiring: Overpass for geometry, Yandex then Nominatim for addresses
    pub fn from_config(config: &Config) -> Result<Self> {
        let geodata = OverpassClient::new(&config.overpass, &config.user_agent)?;

        let mut lookups: Vec<Box<dyn AddressLookup>> = Vec::new();
        if config.yandex.enabled {
            lookups.push(Box::new(YandexClient::new(&config.yandex, &config.user_agent)?));
        }
        if config.nominatim.enabled {
            lookups.push(Box::new(NominatimClient::new(
                &config.nominatim,
                &config.user_agent,
            )?));
        }

        Ok(Self::new(Box::new(geodata), lookups))
    }

    pub fn without_address_lookup(mut self) -> Self {
        self.lookups.clear();
        self
    }

    /// Resolve the building under `point` and its address.
    ///
    /// The geodata fetch runs on a scoped thread alongside the first geocoder
    /// tier. Both are always attempted; only a geodata failure is an error.
    pub fn resolve(&self, point: Point) -> Result<Resolution, ResolveError> {
        let (candidates, address) = thread::scope(|s| {
            let geodata = s.spawn(|| self.fetch_candidates(point));
            let address = resolve_address(&self.lookups, point);
            (geodata.join(), address)
        });

        let candidates = match candidates {
            Ok(Ok(candidates)) => candidates,
            Ok(Err(e)) => {
                warn!(
                    "Geodata fetch failed for lat={} lon={}: {:#}",
                    point.lat, point.lon, e
                );
                return Err(ResolveError::GeodataUnavailable(e));
            }
            Err(_) => return Err(ResolveError::WorkerPanicked),
        };

        Ok(Resolution {
            geometry: select_geometry(candidates, point),
            address,
        })
    }

    fn fetch_candidates(&self, point: Point) -> Result<Vec<Geometry>> {
        let elements = self.geodata.fetch_elements(point)?;
        let candidates = assemble_all(&elements);
        debug!(
            "Resolved {} geometries from {} elements",
            candidates.len(),
            elements.len()
        );
        Ok(candidates)
    }
}

/// First candidate containing the point, else the first candidate at all
pub fn select_geometry(candidates: Vec<Geometry>, point: Point) -> Option<Geometry> {
    match candidates.iter().position(|g| g.contains(point)) {
        Some(index) => {
            debug!("Candidate {} contains the point", index);
            candidates.into_iter().nth(index)
        }
        None => {
            if !candidates.is_empty() {
                debug!(
                    "No candidate of {} contains the point, falling back to the first",
                    candidates.len()
                );
            }
            candidates.into_iter().next()
        }
    }
}

/// Try each lookup in order; failures and empty answers move on to the next.
pub fn resolve_address(lookups: &[Box<dyn AddressLookup>], point: Point) -> Option<String> {
    for lookup in lookups {
        match lookup.reverse_geocode(point) {
            Ok(Some(address)) if !address.trim().is_empty() => return Some(address),
            Ok(_) => debug!("{} returned no address", lookup.name()),
            Err(e) => warn!(
                "{} reverse geocoding failed for lat={} lon={}: {:#}",
                lookup.name(),
                point.lat,
                point.lon,
                e
            ),
        }
    }
    None
}
