//! Two-level hierarchies: a top-level [`Bvh`](crate::bvh::Bvh) over instance boxes whose
//! leaves descend into the bottom-level tree of a shared [`Mesh`].

mod tlas_impl;

pub use self::tlas_impl::*;
