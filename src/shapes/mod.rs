//! Primitives the hierarchies are built over, and the extraction of those primitives from
//! raw vertex and index buffers.

mod geometry;
mod triangle;

pub use self::geometry::*;
pub use self::triangle::*;
