//! This module holds the [`Ray`] definition, and the ray/box and ray/triangle kernels
//! shared by every traversal.
mod ray_impl;

pub use self::ray_impl::*;
