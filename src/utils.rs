//! Utilities module.

use crate::Real;

/// Fast floating point minimum.  This function matches the semantics of
///
/// ```no_compile
/// if x < y { x } else { y }
/// ```
///
/// which has efficient instruction sequences on many platforms (1 instruction on x86).  For most
/// values, it matches the semantics of `x.min(y)`; the special cases are:
///
/// ```text
/// min(-0.0, +0.0); +0.0
/// min(+0.0, -0.0): -0.0
/// min( NaN,  1.0):  1.0
/// min( 1.0,  NaN):  NaN
/// ```
#[inline(always)]
pub fn fast_min(x: Real, y: Real) -> Real {
    if x < y {
        x
    } else {
        y
    }
}

/// Fast floating point maximum.  This function matches the semantics of
///
/// ```no_compile
/// if x > y { x } else { y }
/// ```
///
/// See [`fast_min`] for the special cases.
#[inline(always)]
pub fn fast_max(x: Real, y: Real) -> Real {
    if x > y {
        x
    } else {
        y
    }
}

/// Reciprocal which never produces an infinity or a NaN.
///
/// Zero and subnormal inputs map to the largest finite value carrying the sign of `x`, so
/// multiplying the result with any finite distance stays comparable (an overflow to infinity
/// keeps its sign, and `0 * MAX` is `0`, never NaN).
#[inline(always)]
pub fn safe_inverse(x: Real) -> Real {
    if x.abs() < Real::MIN_POSITIVE {
        Real::MAX.copysign(x)
    } else {
        1.0 / x
    }
}
