//! Point-in-polygon tests on planar (lat, lon) coordinates
//!
//! Uses even-odd ray casting along the latitude axis. Points on the boundary
//! count as inside so that a click on a building outline resolves to it.

use crate::domain::{Geometry, Point, Shape};
use crate::geometry::Ring;

/// Tolerance for the on-segment collinearity and bounds checks
pub const BOUNDARY_TOLERANCE: f64 = 1e-9;

/// Stand-in for a zero latitude delta on horizontal edges
const HORIZONTAL_EPSILON: f64 = 1e-12;

/// Even-odd test with an inclusive boundary.
///
/// Sequences of fewer than 3 points contain nothing.
pub fn point_in_ring(ring: &[Point], point: Point) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    for i in 0..n {
        let current = ring[i];
        let previous = ring[(i + n - 1) % n];

        if point_on_segment(point, current, previous) {
            return true;
        }

        if (current.lat > point.lat) != (previous.lat > point.lat) {
            let mut delta_lat = previous.lat - current.lat;
            if delta_lat == 0.0 {
                delta_lat = HORIZONTAL_EPSILON;
            }
            let crossing_lon =
                (previous.lon - current.lon) * (point.lat - current.lat) / delta_lat + current.lon;
            if point.lon < crossing_lon {
                inside = !inside;
            }
        }
    }

    inside
}

/// Collinear with the segment and between its endpoints, within tolerance.
pub fn point_on_segment(point: Point, start: Point, end: Point) -> bool {
    let cross = (point.lon - start.lon) * (end.lat - start.lat)
        - (point.lat - start.lat) * (end.lon - start.lon);
    if cross.abs() > BOUNDARY_TOLERANCE {
        return false;
    }

    let dot = (point.lat - start.lat) * (point.lat - end.lat)
        + (point.lon - start.lon) * (point.lon - end.lon);
    dot <= BOUNDARY_TOLERANCE
}

impl Ring {
    pub fn contains(&self, point: Point) -> bool {
        point_in_ring(self.points(), point)
    }
}

impl Shape {
    /// Inside the outer ring and inside none of the holes.
    pub fn contains(&self, point: Point) -> bool {
        self.outer.contains(point) && !self.holes.iter().any(|hole| hole.contains(point))
    }
}

impl Geometry {
    /// True when any constituent shape contains the point
    pub fn contains(&self, point: Point) -> bool {
        self.shapes().iter().any(|shape| shape.contains(point))
    }
}
