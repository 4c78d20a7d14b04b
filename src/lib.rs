//! footprint - Resolve the OpenStreetMap building footprint and address under a map point

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod geometry;
pub mod osm;
pub mod resolver;

pub use domain::{Geometry, Point, Resolution};
pub use error::ResolveError;
pub use resolver::Resolver;
