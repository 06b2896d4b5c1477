//! Quantized compression of a [`Bvh`](crate::bvh::Bvh) into the compact node layout shared
//! by CPU and GPU traversal.

mod cbvh_impl;
mod quantize;

pub use self::cbvh_impl::*;
pub use self::quantize::*;
