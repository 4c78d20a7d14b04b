use crate::api::overpass::{Element, GeomNode, Member};
use crate::api::OverpassResponse;
use crate::domain::{RawElement, RawMember, RawNode, Role};

/// Convert an Overpass `out geom` response into raw building elements
///
/// # Algorithm
/// 1. Keep `way` and `relation` elements; anything else is dropped
/// 2. Flatten inline geometry to nodes, keeping gaps as coordinate-less nodes
/// 3. For relations keep only `way` members, mapping the role tag
///
/// Elements or members without a type are dropped like unknown types.
pub fn parse_elements(response: &OverpassResponse) -> Vec<RawElement> {
    response.elements.iter().filter_map(parse_element).collect()
}

fn parse_element(element: &Element) -> Option<RawElement> {
    match element.type_.as_deref()? {
        "way" => Some(RawElement::Way {
            nodes: to_nodes(&element.geometry),
        }),
        "relation" => Some(RawElement::Relation {
            members: element.members.iter().filter_map(parse_member).collect(),
        }),
        _ => None,
    }
}

fn parse_member(member: &Member) -> Option<RawMember> {
    if member.type_.as_deref() != Some("way") {
        return None;
    }
    Some(RawMember::new(
        Role::from_tag(member.role.as_deref()),
        to_nodes(&member.geometry),
    ))
}

fn to_nodes(geometry: &[GeomNode]) -> Vec<RawNode> {
    geometry
        .iter()
        .map(|n| RawNode {
            lat: n.lat,
            lon: n.lon,
        })
        .collect()
}
