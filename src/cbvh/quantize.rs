//! Encoding of a child box relative to its parent box with small unsigned integers.
//!
//! Per axis, the distance of the child's min face from the parent's min face and the
//! distance of the child's max face from the parent's max face are expressed as fractions
//! `r` of the parent extent. Both are mapped from `[-1, 1]` to `[0, 1]` with `(r + 1) / 2`,
//! clamped, and scaled by the largest code of the integer type. A child that shrinks away
//! from a parent face therefore gets a larger code on that face, and both codes stay in
//! `[0, max]` without a sign bit.

use std::fmt::Debug;

use num_traits::{AsPrimitive, PrimInt, Unsigned};

use crate::aabb::Aabb;
use crate::Real;

/// Unsigned integer type used for quantized coordinates.
///
/// The six codes of a node come before its two index words, so a
/// [`CompressedNode<u8>`](crate::cbvh::CompressedNode) takes 16 bytes (with 2 bytes of
/// padding) and a `CompressedNode<u16>` takes 20 bytes.
pub trait Quantum: PrimInt + Unsigned + AsPrimitive<Real> + Default + Debug + bytemuck::Pod {
    /// Converts a float which is already floored and inside `[0, max]`.
    fn from_real(x: Real) -> Self;

    /// Largest code as a float.
    #[inline(always)]
    fn max_code() -> Real {
        Self::max_value().as_()
    }
}

macro_rules! impl_quantum {
    ($($t:ty),*) => {
        $(
            impl Quantum for $t {
                #[inline(always)]
                fn from_real(x: Real) -> $t {
                    x as $t
                }
            }
        )*
    };
}

impl_quantum!(u8, u16);

/// A box stored as six codes relative to the box of the parent node.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[repr(C)]
pub struct QuantizedAabb<Q: Quantum> {
    /// Codes of the min face, measured from the parent's min face.
    pub min: [Q; 3],
    /// Codes of the max face, measured from the parent's max face.
    pub max: [Q; 3],
}

/// `1 / extent` for axes with a usable extent. Flat, empty or unbounded parent axes have
/// no usable extent: the child matches the parent on them.
#[inline(always)]
fn inverse_extent(parent: &Aabb, axis: usize) -> Option<Real> {
    let inverse = 1.0 / (parent.max[axis] - parent.min[axis]);
    (inverse.is_finite() && inverse > 0.0).then_some(inverse)
}

#[inline(always)]
fn encode<Q: Quantum>(relative: Real) -> Q {
    let normalized = ((relative + 1.0) * 0.5).clamp(0.0, 1.0);
    Q::from_real((normalized * Q::max_code()).floor())
}

#[inline(always)]
fn decode<Q: Quantum>(code: Q) -> Real {
    code.as_() * (2.0 / Q::max_code()) - 1.0
}

/// Reconstructs the min and max coordinate of one axis.
#[inline(always)]
fn dequantize_axis<Q: Quantum>(parent: &Aabb, axis: usize, min: Q, max: Q) -> (Real, Real) {
    let extent = parent.max[axis] - parent.min[axis];
    if inverse_extent(parent, axis).is_none() {
        return (parent.min[axis], parent.max[axis]);
    }
    (
        parent.min[axis] + decode(min) * extent,
        parent.max[axis] - decode(max) * extent,
    )
}

/// Quantizes `child` relative to `parent`.
///
/// Codes are rounded towards the parent faces and then corrected until
/// [`dequantize_aabb`] yields a box containing `child`, so the reconstructed box is always
/// conservative. Its faces lie at most one step of `2 * extent / max` outside `child`
/// (see [`quantization_step`]) when `child` lies inside `parent`.
///
/// # Examples
/// ```
/// use photon_bvh::aabb::Aabb;
/// use photon_bvh::cbvh::{dequantize_aabb, quantize_aabb};
/// use photon_bvh::Point3;
///
/// let parent = Aabb::with_bounds(Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 10.0, 10.0));
/// let child = Aabb::with_bounds(Point3::new(1.0, 2.0, 3.0), Point3::new(4.0, 5.0, 6.0));
///
/// let qaabb = quantize_aabb::<u8>(&parent, &child);
/// let decoded = dequantize_aabb(&parent, &qaabb);
/// assert!(decoded.contains_aabb(&child));
/// assert!((decoded.min.x - child.min.x).abs() <= 20.0 / 255.0);
/// ```
pub fn quantize_aabb<Q: Quantum>(parent: &Aabb, child: &Aabb) -> QuantizedAabb<Q> {
    let mut qaabb = QuantizedAabb::<Q>::default();
    for axis in 0..3 {
        let Some(inverse) = inverse_extent(parent, axis) else {
            continue;
        };
        let mut min = encode::<Q>((child.min[axis] - parent.min[axis]) * inverse);
        let mut max = encode::<Q>((parent.max[axis] - child.max[axis]) * inverse);

        // Floating point error of the decode may put a floored face inside the child.
        loop {
            let (decoded_min, decoded_max) = dequantize_axis(parent, axis, min, max);
            let min_ok = decoded_min <= child.min[axis] || min.is_zero();
            let max_ok = decoded_max >= child.max[axis] || max.is_zero();
            if min_ok && max_ok {
                break;
            }
            if !min_ok {
                min = min - Q::one();
            }
            if !max_ok {
                max = max - Q::one();
            }
        }
        qaabb.min[axis] = min;
        qaabb.max[axis] = max;
    }
    qaabb
}

/// Reconstructs the box encoded by `qaabb` relative to `parent`.
pub fn dequantize_aabb<Q: Quantum>(parent: &Aabb, qaabb: &QuantizedAabb<Q>) -> Aabb {
    let mut aabb = *parent;
    for axis in 0..3 {
        let (min, max) = dequantize_axis(parent, axis, qaabb.min[axis], qaabb.max[axis]);
        aabb.min[axis] = min;
        aabb.max[axis] = max;
    }
    aabb
}

/// Largest distance between a face of a child inside `parent` and the same face of its
/// reconstruction, per axis.
pub fn quantization_step<Q: Quantum>(parent: &Aabb) -> [Real; 3] {
    let size = parent.size();
    [0, 1, 2].map(|axis| 2.0 * size[axis] / Q::max_code())
}

#[cfg(test)]
mod tests {
    use crate::aabb::Aabb;
    use crate::cbvh::{dequantize_aabb, quantization_step, quantize_aabb, Quantum};
    use crate::testbase::{tuple_to_point, tuplevec_small_strategy};
    use crate::Point3;

    use proptest::prelude::*;

    /// Checks that the reconstruction contains `child` and is at most one step (plus float
    /// rounding) larger on every face.
    fn check_round_trip<Q: Quantum>(parent: &Aabb, child: &Aabb) {
        let decoded = dequantize_aabb(parent, &quantize_aabb::<Q>(parent, child));
        let step = quantization_step::<Q>(parent);
        assert!(decoded.contains_aabb(child), "{decoded} does not contain {child}");
        for axis in 0..3 {
            let magnitude = parent.min[axis].abs().max(parent.max[axis].abs());
            let slack = step[axis] * 1.01 + 4.0 * f32::EPSILON * magnitude;
            assert!(child.min[axis] - decoded.min[axis] <= slack);
            assert!(decoded.max[axis] - child.max[axis] <= slack);
        }
    }

    #[test]
    fn test_child_equal_to_parent() {
        let parent = Aabb::with_bounds(Point3::new(-3.0, 0.0, 1.0), Point3::new(5.0, 2.0, 9.0));
        check_round_trip::<u8>(&parent, &parent);
        check_round_trip::<u16>(&parent, &parent);
    }

    #[test]
    fn test_flat_parent_axis_matches_parent() {
        let parent = Aabb::with_bounds(Point3::new(0.0, 0.0, 4.0), Point3::new(1.0, 1.0, 4.0));
        let child = Aabb::with_bounds(Point3::new(0.25, 0.5, 4.0), Point3::new(0.5, 0.75, 4.0));
        let qaabb = quantize_aabb::<u8>(&parent, &child);
        let decoded = dequantize_aabb(&parent, &qaabb);
        assert_eq!(decoded.min.z, 4.0);
        assert_eq!(decoded.max.z, 4.0);
        assert!(decoded.contains_aabb(&child));
    }

    #[test]
    fn test_tighter_child_has_larger_codes() {
        let parent = Aabb::with_bounds(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        let loose = Aabb::with_bounds(Point3::new(0.1, 0.1, 0.1), Point3::new(0.9, 0.9, 0.9));
        let tight = Aabb::with_bounds(Point3::new(0.4, 0.4, 0.4), Point3::new(0.6, 0.6, 0.6));
        let loose = quantize_aabb::<u8>(&parent, &loose);
        let tight = quantize_aabb::<u8>(&parent, &tight);
        for axis in 0..3 {
            assert!(tight.min[axis] > loose.min[axis]);
            assert!(tight.max[axis] > loose.max[axis]);
        }
    }

    #[test]
    fn test_empty_child_stays_empty() {
        let parent = Aabb::with_bounds(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        let decoded = dequantize_aabb(&parent, &quantize_aabb::<u16>(&parent, &Aabb::empty()));
        assert!(decoded.is_empty());
    }

    proptest! {
        // A child strictly inside its parent is reconstructed within one quantization step.
        #[test]
        fn test_round_trip_within_one_step(a in tuplevec_small_strategy(),
                                           b in tuplevec_small_strategy(),
                                           f in prop::array::uniform6(0.0f32..1.0)) {
            let parent = Aabb::empty().grow(&tuple_to_point(&a)).grow(&tuple_to_point(&b));
            let lerp = |t: f32, axis: usize| parent.min[axis] + t * (parent.max[axis] - parent.min[axis]);
            let mut child = Aabb::empty();
            child.grow_mut(&Point3::new(lerp(f[0], 0), lerp(f[1], 1), lerp(f[2], 2)));
            child.grow_mut(&Point3::new(lerp(f[3], 0), lerp(f[4], 1), lerp(f[5], 2)));
            let child = Aabb::with_bounds(
                child.min.coords.sup(&parent.min.coords).into(),
                child.max.coords.inf(&parent.max.coords).into(),
            );

            check_round_trip::<u8>(&parent, &child);
            check_round_trip::<u16>(&parent, &child);
        }
    }
}
