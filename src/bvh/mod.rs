//! This module defines the [`Bvh`], its builders and its traversals.
//!
//! A [`Bvh`] is an arena of [`BvhNode`]s. Node 0 is the root, the children of an inner node
//! occupy a contiguous block after it, and leaves reference ranges of a primitive
//! permutation instead of the primitives themselves, so a builder can reorder primitives
//! without moving triangle data.

mod bucket;
mod builder;
mod bvh_impl;
mod bvh_node;
mod options;
mod stack;
mod traverse;

pub use self::builder::*;
pub use self::bvh_impl::*;
pub use self::bvh_node::*;
pub use self::options::*;
pub use self::stack::*;
pub use self::traverse::*;
