//! A crate which builds, compresses and traverses bounding volume hierarchies over
//! triangle meshes, for CPU ray casting and for upload to GPU compute traversal.
//!
//! ## About
//!
//! A [`Bvh`] is a binary tree of axis aligned boxes over the triangles of a mesh. Nodes live
//! in one contiguous array, the children of an inner node are stored next to each other, and
//! leaves reference a range of a primitive permutation array instead of the triangles
//! themselves. The same node and permutation arrays are traversed on the CPU and uploaded
//! verbatim for GPU traversal.
//!
//! A [`CompressedBvh`] stores every node box as six small integers relative to the box of
//! its parent, which shrinks a node to 16 bytes with `u8` coordinates.
//!
//! Scenes with many meshes use a two-level layout: a top-level [`Bvh`] over instance boxes,
//! where every leaf descends into the bottom-level [`Bvh`] of one mesh (see [`tlas::Scene`]).
//!
//! ## Example
//!
//! ```
//! use photon_bvh::bvh::{BuildOptions, Bvh};
//! use photon_bvh::ray::Ray;
//! use photon_bvh::shapes::Geometry;
//! use photon_bvh::{Point3, Vector3};
//!
//! let positions = [
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//! ];
//! let geometry = Geometry::from_indexed(&positions, &[0, 1, 2]).unwrap();
//! let bvh = Bvh::build(&geometry.aabbs, &geometry.centers, &BuildOptions::default()).unwrap();
//!
//! let mut ray = Ray::new(Point3::new(0.25, 0.25, 5.0), Vector3::new(0.0, 0.0, -1.0));
//! let hit = bvh.intersect(&mut ray, &geometry.triangles);
//! assert!(hit.is_hit());
//! assert_eq!(hit.primitive_index, 0);
//! ```
//!
//! ## Features
//!
//! - `rayon` (default **enabled**) - parallel geometry extraction and per-pixel tracing
//! - `serde` (default **disabled**) - adds `Serialize` and `Deserialize` implementations for
//!   the geometry types and [`bvh::BuildOptions`]
//!

/// Float type used by this crate.
pub type Real = f32;

/// Point math type used by this crate. Type alias for [`nalgebra::Point3`].
pub type Point3 = nalgebra::Point3<Real>;

/// Vector math type used by this crate. Type alias for [`nalgebra::Vector3`].
pub type Vector3 = nalgebra::Vector3<Real>;

/// Matrix math type used by this crate. Type alias for [`nalgebra::Matrix4`].
pub type Matrix4 = nalgebra::Matrix4<Real>;

/// Reserved index meaning "no primitive", "no instance" or "no parent".
pub const INVALID_INDEX: u32 = u32::MAX;

pub mod aabb;
pub mod bvh;
pub mod camera;
pub mod cbvh;
pub mod error;
pub mod gpu;
pub mod ray;
pub mod render;
pub mod shapes;
pub mod tlas;
mod utils;

#[cfg(test)]
mod testbase;

pub use crate::bvh::{Bvh, Hit};
pub use crate::cbvh::CompressedBvh;
pub use crate::error::BvhError;

#[cfg(doctest)]
doc_comment::doctest!("../README.md");
