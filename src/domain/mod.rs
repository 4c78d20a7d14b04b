pub mod building;
pub mod element;
pub mod point;

pub use building::{Geometry, Resolution, Shape};
pub use element::{RawElement, RawMember, RawNode, Role};
pub use point::Point;
