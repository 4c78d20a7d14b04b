/// A geodata node as delivered upstream. Either coordinate may be missing.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RawNode {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl RawNode {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat: Some(lat),
            lon: Some(lon),
        }
    }
}

/// Role of a relation member way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Outer,
    Inner,
}

impl Role {
    /// Only an explicit `inner` tag makes a hole; anything else bounds a shape.
    pub fn from_tag(tag: Option<&str>) -> Role {
        match tag {
            Some("inner") => Role::Inner,
            _ => Role::Outer,
        }
    }
}

/// One member way of a relation
#[derive(Debug, Clone, PartialEq)]
pub struct RawMember {
    pub role: Role,
    pub nodes: Vec<RawNode>,
}

impl RawMember {
    pub fn new(role: Role, nodes: Vec<RawNode>) -> Self {
        Self { role, nodes }
    }
}

/// Upstream element shape consumed by the polygon assembler.
#[derive(Debug, Clone, PartialEq)]
pub enum RawElement {
    Way { nodes: Vec<RawNode> },
    Relation { members: Vec<RawMember> },
}
