//! This module defines a Ray structure and intersection algorithms
//! for axis aligned bounding boxes and triangles.

use crate::aabb::Aabb;
use crate::shapes::Triangle;
use crate::utils::{fast_max, fast_min, safe_inverse};
use crate::{Matrix4, Point3, Real, Vector3};

/// A struct which defines a ray, its cached values and its valid parameter interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// The ray origin.
    pub origin: Point3,

    /// The ray direction. Not normalized: every `t` is a multiple of this vector.
    pub direction: Vector3,

    /// Inverse (1/x) ray direction. Cached for use in [`Aabb`] intersections.
    /// Zero components are replaced by a huge finite value, see [`Ray::new`].
    pub inv_direction: Vector3,

    /// Lower bound of the valid parameter interval. Slightly above zero so that a ray
    /// leaving a surface does not hit that surface again at its origin.
    pub tmin: Real,

    /// Upper bound of the valid parameter interval. Starts at infinity and shrinks every
    /// time a traversal records a closer hit.
    pub tmax: Real,
}

/// A struct which is returned by [`Ray::intersects_aabb`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AabbIntersection {
    /// Parameter at which the ray enters the box, clamped to the ray interval.
    pub tmin: Real,

    /// Parameter at which the ray leaves the box, clamped to the ray interval.
    pub tmax: Real,
}

impl AabbIntersection {
    /// Returns true if the clamped entry/exit interval is not empty.
    #[inline(always)]
    pub fn did_intersect(&self) -> bool {
        self.tmin <= self.tmax
    }
}

/// A struct which is returned by [`Ray::intersects_triangle`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleIntersection {
    /// Ray parameter of the intersection.
    pub t: Real,

    /// Barycentric weight of `v1`.
    pub u: Real,

    /// Barycentric weight of `v2`.
    pub v: Real,

    /// Barycentric weight of `v0`, always `1 - u - v`.
    pub w: Real,
}

impl Ray {
    /// Creates a new [`Ray`] from an `origin` and a `direction`.
    /// `direction` is kept as is, so `t` measures multiples of it.
    ///
    /// The cached inverse direction uses a safe reciprocal: a zero component becomes the
    /// largest finite float of the same sign instead of an infinity, so slab tests never
    /// produce `0 * inf = NaN` when the origin lies on a box face.
    ///
    /// # Examples
    /// ```
    /// use photon_bvh::ray::Ray;
    /// use photon_bvh::{Point3, Vector3};
    ///
    /// let origin = Point3::new(0.0, 0.0, 0.0);
    /// let direction = Vector3::new(2.0, 0.0, 0.0);
    /// let ray = Ray::new(origin, direction);
    ///
    /// assert_eq!(ray.origin, origin);
    /// assert_eq!(ray.direction, direction);
    /// assert_eq!(ray.inv_direction.x, 0.5);
    /// assert!(ray.inv_direction.y.is_finite());
    /// assert_eq!(ray.tmax, f32::INFINITY);
    /// ```
    pub fn new(origin: Point3, direction: Vector3) -> Ray {
        Ray {
            origin,
            direction,
            inv_direction: direction.map(safe_inverse),
            tmin: Real::EPSILON,
            tmax: Real::INFINITY,
        }
    }

    /// Returns the point at parameter `t` along the ray.
    pub fn at(&self, t: Real) -> Point3 {
        self.origin + self.direction * t
    }

    /// Returns this ray expressed in the space `transform` maps into, keeping the parameter
    /// interval. For an affine `transform` the parameter of any hit is the same in both spaces.
    pub fn transformed(&self, transform: &Matrix4) -> Ray {
        Ray {
            tmin: self.tmin,
            tmax: self.tmax,
            ..Ray::new(
                transform.transform_point(&self.origin),
                transform.transform_vector(&self.direction),
            )
        }
    }

    /// Tests the intersection of a [`Ray`] with an [`Aabb`] using the slab method.
    ///
    /// Per axis the entry and exit parameters are sorted with a min/max pair, which handles
    /// negative direction components without branching. The result is clamped to
    /// `[self.tmin, self.tmax]`, so boxes behind an already recorded hit are rejected.
    ///
    /// # Examples
    /// ```
    /// use photon_bvh::aabb::Aabb;
    /// use photon_bvh::ray::Ray;
    /// use photon_bvh::{Point3, Vector3};
    ///
    /// let origin = Point3::new(0.0, 0.0, 0.0);
    /// let direction = Vector3::new(1.0, 0.0, 0.0);
    /// let ray = Ray::new(origin, direction);
    ///
    /// let point1 = Point3::new(99.9, -1.0, -1.0);
    /// let point2 = Point3::new(100.1, 1.0, 1.0);
    /// let aabb = Aabb::with_bounds(point1, point2);
    ///
    /// let intersection = ray.intersects_aabb(&aabb);
    /// assert!(intersection.did_intersect());
    /// assert!((intersection.tmin - 99.9).abs() < 1e-4);
    /// ```
    #[inline(always)]
    pub fn intersects_aabb(&self, aabb: &Aabb) -> AabbIntersection {
        let t0 = (aabb.min - self.origin).component_mul(&self.inv_direction);
        let t1 = (aabb.max - self.origin).component_mul(&self.inv_direction);

        let (near, far) = t0.inf_sup(&t1);

        let tmin = fast_max(near.x, fast_max(near.y, fast_max(near.z, self.tmin)));
        let tmax = fast_min(far.x, fast_min(far.y, fast_min(far.z, self.tmax)));

        AabbIntersection { tmin, tmax }
    }

    /// Intersects the ray with a triangle.
    ///
    /// Uses the normal/cross-product formulation: with `e1 = v0 - v1`, `e2 = v2 - v0`,
    /// `n = e1 x e2`, `c = v0 - origin` and `r = direction x c`, the barycentrics are
    /// `u = (r . e2) / (n . direction)` and `v = (r . e1) / (n . direction)`, and the
    /// parameter is `t = (n . c) / (n . direction)`. Both faces are hit, `n` needs no
    /// normalization, and a ray parallel to the triangle plane yields non-finite
    /// barycentrics which fail the inside test.
    ///
    /// Returns `None` if the ray misses the triangle or the hit lies outside
    /// `[self.tmin, self.tmax]`.
    #[allow(clippy::many_single_char_names)]
    #[inline(always)]
    pub fn intersects_triangle(&self, triangle: &Triangle) -> Option<TriangleIntersection> {
        let e1 = triangle.v0 - triangle.v1;
        let e2 = triangle.v2 - triangle.v0;
        let n = e1.cross(&e2);

        let c = triangle.v0 - self.origin;
        let r = self.direction.cross(&c);
        let inv_det = 1.0 / n.dot(&self.direction);

        let u = r.dot(&e2) * inv_det;
        let v = r.dot(&e1) * inv_det;
        let w = 1.0 - u - v;

        if u >= 0.0 && v >= 0.0 && w >= 0.0 {
            let t = n.dot(&c) * inv_det;
            if t >= self.tmin && t <= self.tmax {
                return Some(TriangleIntersection { t, u, v, w });
            }
        }
        None
    }
}
