use crate::domain::{Geometry, RawElement, RawMember, Role, Shape};
use crate::geometry::{Ring, build_ring};

/// Assemble one upstream element into a building geometry.
///
/// Malformed input never fails: members without a usable ring are dropped,
/// and a relation without any outer ring produces nothing.
pub fn assemble(element: &RawElement) -> Option<Geometry> {
    match element {
        RawElement::Way { nodes } => build_ring(nodes).map(|ring| Geometry::Polygon(Shape::new(ring))),
        RawElement::Relation { members } => assemble_relation(members),
    }
}

/// Assemble every element in order, skipping those that produce nothing
pub fn assemble_all(elements: &[RawElement]) -> Vec<Geometry> {
    elements.iter().filter_map(assemble).collect()
}

/// # Algorithm
/// 1. Build a ring per member, dropping members that fail
/// 2. Split rings into outer and inner, keeping member order
/// 3. Each outer ring, in order, claims the unassigned inner rings whose
///    first vertex it contains
/// 4. Inner rings left unclaimed are dropped
fn assemble_relation(members: &[RawMember]) -> Option<Geometry> {
    let mut outer_rings: Vec<Ring> = Vec::new();
    let mut inner_rings: Vec<Ring> = Vec::new();

    for member in members {
        let Some(ring) = build_ring(&member.nodes) else {
            continue;
        };
        match member.role {
            Role::Outer => outer_rings.push(ring),
            Role::Inner => inner_rings.push(ring),
        }
    }

    if outer_rings.is_empty() {
        return None;
    }

    let mut remaining = inner_rings;
    let shapes = outer_rings
        .into_iter()
        .map(|outer| {
            let (holes, rest): (Vec<Ring>, Vec<Ring>) = remaining
                .drain(..)
                .partition(|inner| outer.contains(inner.first()));
            remaining = rest;
            Shape::with_holes(outer, holes)
        })
        .collect();

    Geometry::from_shapes(shapes)
}
