//! This module defines a Triangle and the primitive-level intersection hook.

use crate::aabb::{Aabb, Bounded};
use crate::ray::{Ray, TriangleIntersection};
use crate::{Point3, Vector3};

/// A triangle struct. The primitive the bottom-level hierarchies are built over.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Triangle {
    /// First vertex.
    pub v0: Point3,
    /// Second vertex.
    pub v1: Point3,
    /// Third vertex.
    pub v2: Point3,
}

impl Triangle {
    /// Creates a new triangle from its three vertices.
    pub fn new(v0: Point3, v1: Point3, v2: Point3) -> Triangle {
        Triangle { v0, v1, v2 }
    }

    /// Returns the centroid `(v0 + v1 + v2) / 3`.
    pub fn center(&self) -> Point3 {
        Point3::from((self.v0.coords + self.v1.coords + self.v2.coords) / 3.0)
    }

    /// Returns the point with barycentric coordinates `(w, u, v)`, where `w = 1 - u - v`
    /// weights `v0`, `u` weights `v1` and `v` weights `v2`.
    ///
    /// # Examples
    /// ```
    /// use photon_bvh::shapes::Triangle;
    /// use photon_bvh::Point3;
    ///
    /// let triangle = Triangle::new(
    ///     Point3::new(0.0, 0.0, 0.0),
    ///     Point3::new(1.0, 0.0, 0.0),
    ///     Point3::new(0.0, 1.0, 0.0),
    /// );
    /// assert_eq!(triangle.point_at(0.25, 0.5), Point3::new(0.25, 0.5, 0.0));
    /// ```
    pub fn point_at(&self, u: f32, v: f32) -> Point3 {
        let w = 1.0 - u - v;
        Point3::from(self.v0.coords * w + self.v1.coords * u + self.v2.coords * v)
    }

    /// Unnormalized geometric normal `(v1 - v0) x (v2 - v0)`.
    pub fn normal(&self) -> Vector3 {
        (self.v1 - self.v0).cross(&(self.v2 - self.v0))
    }
}

impl Bounded for Triangle {
    fn aabb(&self) -> Aabb {
        Aabb::empty().grow(&self.v0).grow(&self.v1).grow(&self.v2)
    }
}

/// Primitive-level closest-hit hook called by the traversals for every primitive of a
/// visited leaf.
pub trait Intersect {
    /// Intersects `ray` with this primitive. Returns `None` on a miss or when the hit lies
    /// outside `[ray.tmin, ray.tmax]`.
    fn intersect(&self, ray: &Ray) -> Option<TriangleIntersection>;
}

impl Intersect for Triangle {
    #[inline(always)]
    fn intersect(&self, ray: &Ray) -> Option<TriangleIntersection> {
        ray.intersects_triangle(self)
    }
}

impl<T: Intersect> Intersect for &T {
    #[inline(always)]
    fn intersect(&self, ray: &Ray) -> Option<TriangleIntersection> {
        T::intersect(self, ray)
    }
}

#[cfg(test)]
mod tests {
    use crate::aabb::Bounded;
    use crate::shapes::Triangle;
    use crate::testbase::{tuple_to_point, tuplevec_small_strategy};
    use crate::Point3;

    use proptest::prelude::*;

    #[test]
    fn test_center_and_aabb() {
        let triangle = Triangle::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(3.0, 0.0, -3.0),
            Point3::new(0.0, 6.0, 0.0),
        );
        assert_eq!(triangle.center(), Point3::new(1.0, 2.0, -1.0));
        let aabb = triangle.aabb();
        assert_eq!(aabb.min, Point3::new(0.0, 0.0, -3.0));
        assert_eq!(aabb.max, Point3::new(3.0, 6.0, 0.0));
    }

    proptest! {
        // The centroid of a triangle always lies inside its bounding box.
        #[test]
        fn test_center_inside_aabb(a in tuplevec_small_strategy(),
                                   b in tuplevec_small_strategy(),
                                   c in tuplevec_small_strategy()) {
            let triangle = Triangle::new(tuple_to_point(&a), tuple_to_point(&b), tuple_to_point(&c));
            let aabb = triangle.aabb();
            prop_assert!(aabb.approx_contains_aabb_eps(&triangle.center().aabb(), 1e-3));
        }
    }
}
