//! Build configuration.

use crate::error::BvhError;
use crate::Real;

/// Strategy used to pick the partition of an inner node's primitives.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ObjectSplitSearch {
    /// Bin the centroids along the widest centroid axis and evaluate the surface area
    /// heuristic at every bin boundary.
    #[default]
    BinnedSah,

    /// Split at the median centroid along the widest centroid axis.
    Median,
}

/// Configuration of a [`Builder`](crate::bvh::Builder).
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BuildOptions {
    /// A node with this many primitives or fewer always becomes a leaf.
    pub min_primitive_count: u32,

    /// A node with more primitives than this is always split.
    pub max_primitive_count: u32,

    /// Partitioning strategy.
    pub object_split_search: ObjectSplitSearch,

    /// Estimated cost of one ray/primitive test, relative to `node_intersection_cost`.
    pub primitive_intersection_cost: Real,

    /// Estimated cost of visiting one inner node.
    pub node_intersection_cost: Real,

    /// Number of bins of the binned search.
    pub samples: u32,
}

impl Default for BuildOptions {
    /// The preset used for triangle meshes.
    fn default() -> BuildOptions {
        BuildOptions {
            min_primitive_count: 1,
            max_primitive_count: 8,
            object_split_search: ObjectSplitSearch::BinnedSah,
            primitive_intersection_cost: 1.1,
            node_intersection_cost: 1.0,
            samples: 8,
        }
    }
}

impl BuildOptions {
    /// The preset used for the top-level hierarchy over instances. Descending into an
    /// instance costs a whole bottom-level traversal, so splitting is favored more.
    pub fn top_level() -> BuildOptions {
        BuildOptions {
            primitive_intersection_cost: 1.5,
            samples: 16,
            ..BuildOptions::default()
        }
    }

    /// Checks that the options can produce a tree.
    ///
    /// # Examples
    /// ```
    /// use photon_bvh::bvh::BuildOptions;
    ///
    /// assert!(BuildOptions::default().validate().is_ok());
    ///
    /// let options = BuildOptions {
    ///     min_primitive_count: 4,
    ///     max_primitive_count: 2,
    ///     ..BuildOptions::default()
    /// };
    /// assert!(options.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), BvhError> {
        if self.min_primitive_count == 0 {
            return Err(BvhError::InvalidOptions(
                "min_primitive_count must be at least 1".into(),
            ));
        }
        if self.max_primitive_count < self.min_primitive_count {
            return Err(BvhError::InvalidOptions(format!(
                "max_primitive_count {} is below min_primitive_count {}",
                self.max_primitive_count, self.min_primitive_count
            )));
        }
        if self.samples < 2 {
            return Err(BvhError::InvalidOptions(
                "at least 2 samples are needed to place a split".into(),
            ));
        }
        for (name, cost) in [
            ("primitive_intersection_cost", self.primitive_intersection_cost),
            ("node_intersection_cost", self.node_intersection_cost),
        ] {
            if !cost.is_finite() || cost < 0.0 {
                return Err(BvhError::InvalidOptions(format!(
                    "{name} must be finite and not negative, got {cost}"
                )));
            }
        }
        Ok(())
    }
}
