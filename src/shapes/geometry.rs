//! Extraction of triangles, boxes and centroids from mesh buffers.

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::aabb::{Aabb, Bounded};
use crate::error::BvhError;
use crate::shapes::Triangle;
use crate::Point3;

/// The flat per-primitive arrays a hierarchy is built from. `aabbs[i]` and `centers[i]`
/// describe `triangles[i]`. Derived once per mesh and immutable afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Geometry {
    /// The triangles, in index buffer order.
    pub triangles: Vec<Triangle>,
    /// Bounding box of every triangle.
    pub aabbs: Vec<Aabb>,
    /// Centroid of every triangle.
    pub centers: Vec<Point3>,
}

impl Geometry {
    /// Assembles one triangle per three indices of `indices`, looking the vertices up in
    /// `positions`.
    ///
    /// # Errors
    /// [`BvhError::MalformedIndexBuffer`] if `indices.len()` is not a multiple of 3, and
    /// [`BvhError::VertexIndexOutOfRange`] if an index does not name a vertex.
    ///
    /// # Examples
    /// ```
    /// use photon_bvh::shapes::Geometry;
    /// use photon_bvh::{BvhError, Point3};
    ///
    /// let positions = [
    ///     Point3::new(0.0, 0.0, 0.0),
    ///     Point3::new(1.0, 0.0, 0.0),
    ///     Point3::new(0.0, 1.0, 0.0),
    ///     Point3::new(1.0, 1.0, 0.0),
    /// ];
    /// let geometry = Geometry::from_indexed(&positions, &[0, 1, 2, 2, 1, 3]).unwrap();
    /// assert_eq!(geometry.len(), 2);
    ///
    /// let error = Geometry::from_indexed(&positions, &[0, 1]).unwrap_err();
    /// assert_eq!(error, BvhError::MalformedIndexBuffer { len: 2 });
    /// ```
    pub fn from_indexed(positions: &[Point3], indices: &[u32]) -> Result<Geometry, BvhError> {
        if indices.len() % 3 != 0 {
            return Err(BvhError::MalformedIndexBuffer { len: indices.len() });
        }

        let vertex = |index: u32| {
            positions
                .get(index as usize)
                .copied()
                .ok_or(BvhError::VertexIndexOutOfRange {
                    index,
                    vertex_count: positions.len(),
                })
        };

        let triangles = indices
            .chunks_exact(3)
            .map(|face| Ok(Triangle::new(vertex(face[0])?, vertex(face[1])?, vertex(face[2])?)))
            .collect::<Result<Vec<_>, BvhError>>()?;

        Ok(Geometry::from_triangles(triangles))
    }

    /// Derives the boxes and centroids of already assembled triangles.
    pub fn from_triangles(triangles: Vec<Triangle>) -> Geometry {
        #[cfg(feature = "rayon")]
        let (aabbs, centers) = triangles
            .par_iter()
            .map(|triangle| (triangle.aabb(), triangle.center()))
            .unzip();

        #[cfg(not(feature = "rayon"))]
        let (aabbs, centers) = triangles
            .iter()
            .map(|triangle| (triangle.aabb(), triangle.center()))
            .unzip();

        Geometry {
            triangles,
            aabbs,
            centers,
        }
    }

    /// Number of triangles.
    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    /// Returns true if there are no triangles.
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Union of all triangle boxes.
    pub fn bounds(&self) -> Aabb {
        self.aabbs
            .iter()
            .fold(Aabb::empty(), |bounds, aabb| bounds.join(aabb))
    }
}
