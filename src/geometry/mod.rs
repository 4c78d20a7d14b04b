pub mod pip;
pub mod ring;

pub use pip::{point_in_ring, point_on_segment};
pub use ring::{Ring, build_ring};
