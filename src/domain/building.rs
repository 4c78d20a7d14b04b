use geo::{LineString, MultiPolygon, Polygon};
use serde::{Serialize, Serializer};

use crate::geometry::Ring;

/// One outer ring plus the holes assigned to it
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub outer: Ring,
    pub holes: Vec<Ring>,
}

impl Shape {
    pub fn new(outer: Ring) -> Self {
        Self {
            outer,
            holes: Vec::new(),
        }
    }

    pub fn with_holes(outer: Ring, holes: Vec<Ring>) -> Self {
        Self { outer, holes }
    }

    fn to_geo(&self) -> Polygon<f64> {
        Polygon::new(
            ring_to_line_string(&self.outer),
            self.holes.iter().map(ring_to_line_string).collect(),
        )
    }
}

// GeoJSON-style ring list: outer first, then holes.
impl Serialize for Shape {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(std::iter::once(&self.outer).chain(&self.holes))
    }
}

/// A resolved building footprint.
///
/// Serializes as `{"type": "Polygon" | "MultiPolygon", "coordinates": [...]}`
/// with coordinate pairs kept in `[lat, lon]` order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Polygon(Shape),
    MultiPolygon(Vec<Shape>),
}

impl Geometry {
    /// Wrap assembled shapes: a single shape stays a `Polygon`.
    pub fn from_shapes(mut shapes: Vec<Shape>) -> Option<Geometry> {
        match shapes.len() {
            0 => None,
            1 => shapes.pop().map(Geometry::Polygon),
            _ => Some(Geometry::MultiPolygon(shapes)),
        }
    }

    pub fn shapes(&self) -> &[Shape] {
        match self {
            Geometry::Polygon(shape) => std::slice::from_ref(shape),
            Geometry::MultiPolygon(shapes) => shapes,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Geometry::Polygon(_) => "Polygon",
            Geometry::MultiPolygon(_) => "MultiPolygon",
        }
    }

    /// Convert into `geo` types (x = lon, y = lat).
    pub fn to_geo(&self) -> MultiPolygon<f64> {
        MultiPolygon::new(self.shapes().iter().map(Shape::to_geo).collect())
    }
}

fn ring_to_line_string(ring: &Ring) -> LineString<f64> {
    ring.points()
        .iter()
        .map(|p| geo::coord! { x: p.lon, y: p.lat })
        .collect()
}

/// Result handed to the calling layer.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Resolution {
    pub geometry: Option<Geometry>,
    pub address: Option<String>,
}

impl Resolution {
    pub fn is_empty(&self) -> bool {
        self.geometry.is_none() && self.address.is_none()
    }
}
