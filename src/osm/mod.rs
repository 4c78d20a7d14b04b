pub mod assembler;
pub mod parser;

pub use assembler::{assemble, assemble_all};
pub use parser::parse_elements;
