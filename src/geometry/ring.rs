use serde::Serialize;

use crate::domain::{Point, RawNode};

/// Minimum points in a closed ring (three vertices plus the closing point)
pub const MIN_RING_POINTS: usize = 4;

/// A closed ring: first point equals last, at least three distinct vertices.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Ring(Vec<Point>);

impl Ring {
    /// Close and validate a point sequence.
    ///
    /// # Algorithm
    /// 1. Reject fewer than 3 points
    /// 2. Append a copy of the first point when the sequence is open
    /// 3. Reject results shorter than 4 points or with fewer than 3 distinct vertices
    pub fn from_points(mut points: Vec<Point>) -> Option<Ring> {
        if points.len() < 3 {
            return None;
        }

        let first = points[0];
        if points.last() != Some(&first) {
            points.push(first);
        }

        if points.len() < MIN_RING_POINTS || distinct_vertices(&points) < 3 {
            return None;
        }

        Some(Ring(points))
    }

    pub fn points(&self) -> &[Point] {
        &self.0
    }

    pub fn first(&self) -> Point {
        self.0[0]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn distinct_vertices(points: &[Point]) -> usize {
    let mut keys: Vec<(u64, u64)> = points
        .iter()
        .map(|p| (coord_key(p.lat), coord_key(p.lon)))
        .collect();
    keys.sort_unstable();
    keys.dedup();
    keys.len()
}

// -0.0 and 0.0 are the same vertex
fn coord_key(v: f64) -> u64 {
    if v == 0.0 { 0.0f64.to_bits() } else { v.to_bits() }
}

/// Build a ring from upstream nodes.
///
/// Nodes missing a coordinate are skipped silently; feeds drop them now and then.
pub fn build_ring(nodes: &[RawNode]) -> Option<Ring> {
    let points: Vec<Point> = nodes
        .iter()
        .filter_map(|n| Some(Point::new(n.lat?, n.lon?)))
        .collect();

    Ring::from_points(points)
}
