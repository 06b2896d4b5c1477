//! The builder contract and the binned SAH builder.

use log::{debug, warn};

use crate::aabb::Aabb;
use crate::bvh::bucket::{with_buckets, Bucket};
use crate::bvh::{BuildOptions, Bvh, BvhNode, ObjectSplitSearch};
use crate::error::BvhError;
use crate::{Point3, Real};

/// Anything that turns per-primitive boxes and centroids into a [`Bvh`].
///
/// Implementations must return a node array with the root at index 0 and the children of
/// every inner node stored contiguously after it, plus a permutation of `0..aabbs.len()`
/// referenced by the leaves. Every node box must be the union of the boxes below it. Zero
/// primitives yield [`Bvh::empty`].
pub trait Builder {
    /// Builds a hierarchy over `aabbs[i]`/`centers[i]`.
    fn build(
        &self,
        aabbs: &[Aabb],
        centers: &[Point3],
        options: &BuildOptions,
    ) -> Result<Bvh, BvhError>;
}

/// Top-down binary builder. Splits with the binned surface area heuristic (or at the
/// centroid median), and stops splitting when a leaf is estimated to be cheaper than the
/// best split.
#[derive(Debug, Default, Copy, Clone)]
pub struct SahBuilder;

/// A node whose primitive range `primitive_indices[begin..end]` still has to be processed.
struct Task {
    node_index: usize,
    begin: usize,
    end: usize,
}

/// Returns the joint [`Aabb`] of the primitives and the [`Aabb`] of their centroids.
fn joint_aabb_of_primitives(indices: &[u32], aabbs: &[Aabb], centers: &[Point3]) -> (Aabb, Aabb) {
    let mut aabb = Aabb::empty();
    let mut centroid = Aabb::empty();
    for index in indices {
        aabb.join_mut(&aabbs[*index as usize]);
        centroid.grow_mut(&centers[*index as usize]);
    }
    (aabb, centroid)
}

/// Moves all entries for which `pred` holds to the front. Returns their count.
fn partition(indices: &mut [u32], mut pred: impl FnMut(u32) -> bool) -> usize {
    let mut left = 0;
    for i in 0..indices.len() {
        if pred(indices[i]) {
            indices.swap(left, i);
            left += 1;
        }
    }
    left
}

/// Bin of a centroid coordinate along the split axis.
#[inline(always)]
fn bin_index(coordinate: Real, min: Real, extent: Real, bins: usize) -> usize {
    let relative = (coordinate - min) / extent;
    ((relative * bins as Real) as usize).min(bins - 1)
}

impl SahBuilder {
    /// Searches the binned SAH split of `indices`. Partitions `indices` and returns the size
    /// of the left part, or `None` if a leaf is cheaper or no split separates the centroids.
    fn binned_sah_split(
        indices: &mut [u32],
        aabbs: &[Aabb],
        centers: &[Point3],
        aabb: &Aabb,
        centroid_bounds: &Aabb,
        options: &BuildOptions,
    ) -> Option<usize> {
        let axis = centroid_bounds.largest_axis();
        let min = centroid_bounds.min[axis];
        let extent = centroid_bounds.max[axis] - min;
        if !(extent > 0.0 && extent.is_finite()) {
            return None;
        }

        let bins = options.samples as usize;
        let count = indices.len();
        let best = with_buckets(bins, |buckets| {
            for index in indices.iter() {
                let bin = bin_index(centers[*index as usize][axis], min, extent, bins);
                buckets[bin].add_aabb(&aabbs[*index as usize]);
            }

            // Flat or point-like nodes have no area, costs still order correctly against
            // each other but not against the leaf cost.
            let parent_area = aabb.surface_area().max(Real::MIN_POSITIVE);
            let mut best: Option<(usize, Real)> = None;
            for i in 0..(bins - 1) {
                let (l_buckets, r_buckets) = buckets.split_at(i + 1);
                let child_l = l_buckets.iter().fold(Bucket::empty(), Bucket::join_bucket);
                let child_r = r_buckets.iter().fold(Bucket::empty(), Bucket::join_bucket);
                if child_l.size < options.min_primitive_count
                    || child_r.size < options.min_primitive_count
                {
                    continue;
                }

                let cost = options.node_intersection_cost
                    + options.primitive_intersection_cost
                        * (child_l.size as Real * child_l.aabb.surface_area()
                            + child_r.size as Real * child_r.aabb.surface_area())
                        / parent_area;
                if best.map_or(true, |(_, best_cost)| cost < best_cost) {
                    best = Some((i, cost));
                }
            }
            best
        })?;

        let (best_bin, best_cost) = best;
        let leaf_cost = options.primitive_intersection_cost * count as Real;
        if count <= options.max_primitive_count as usize && best_cost >= leaf_cost {
            return None;
        }

        Some(partition(indices, |index| {
            bin_index(centers[index as usize][axis], min, extent, bins) <= best_bin
        }))
    }

    /// Splits `indices` at the centroid median of the widest centroid axis.
    fn median_split(indices: &mut [u32], centers: &[Point3], centroid_bounds: &Aabb) -> usize {
        let axis = centroid_bounds.largest_axis();
        let mid = indices.len() / 2;
        indices.select_nth_unstable_by(mid, |a, b| {
            centers[*a as usize][axis].total_cmp(&centers[*b as usize][axis])
        });
        mid
    }
}

impl Builder for SahBuilder {
    fn build(
        &self,
        aabbs: &[Aabb],
        centers: &[Point3],
        options: &BuildOptions,
    ) -> Result<Bvh, BvhError> {
        options.validate()?;
        if aabbs.len() != centers.len() {
            return Err(BvhError::MismatchedInput {
                aabbs: aabbs.len(),
                centers: centers.len(),
            });
        }
        // A binary tree over `n` primitives has up to `2n - 1` nodes, all addressed with `u32`.
        if aabbs.len() > (u32::MAX / 2) as usize {
            return Err(BvhError::IndexOverflow {
                index: aabbs.len() as u64,
                bits: 31,
            });
        }
        if aabbs.is_empty() {
            return Ok(Bvh::empty());
        }

        let primitive_count = aabbs.len();
        let mut primitive_indices: Vec<u32> = (0..primitive_count as u32).collect();
        let mut nodes = Vec::with_capacity(2 * primitive_count - 1);
        nodes.push(BvhNode::leaf(Aabb::empty(), 0, 0));

        let mut forced_splits = 0usize;
        let mut tasks = vec![Task {
            node_index: 0,
            begin: 0,
            end: primitive_count,
        }];
        while let Some(task) = tasks.pop() {
            let indices = &mut primitive_indices[task.begin..task.end];
            let (aabb, centroid_bounds) = joint_aabb_of_primitives(indices, aabbs, centers);
            let count = indices.len();

            let split = if count <= options.min_primitive_count as usize {
                None
            } else {
                match options.object_split_search {
                    ObjectSplitSearch::BinnedSah => Self::binned_sah_split(
                        indices,
                        aabbs,
                        centers,
                        &aabb,
                        &centroid_bounds,
                        options,
                    ),
                    ObjectSplitSearch::Median => None,
                }
            };

            let mid = match split {
                Some(mid) => mid,
                None if count > options.max_primitive_count as usize => {
                    if centroid_bounds.size().iter().all(|extent| *extent <= 0.0) {
                        forced_splits += 1;
                    }
                    Self::median_split(indices, centers, &centroid_bounds)
                }
                None => {
                    nodes[task.node_index] = BvhNode::leaf(aabb, task.begin as u32, count as u32);
                    continue;
                }
            };

            let first_child = nodes.len();
            nodes.push(BvhNode::leaf(Aabb::empty(), 0, 0));
            nodes.push(BvhNode::leaf(Aabb::empty(), 0, 0));
            nodes[task.node_index] = BvhNode::internal(aabb, first_child as u32, 2);

            // The left child is processed first, which keeps subtrees close in memory.
            tasks.push(Task {
                node_index: first_child + 1,
                begin: task.begin + mid,
                end: task.end,
            });
            tasks.push(Task {
                node_index: first_child,
                begin: task.begin,
                end: task.begin + mid,
            });
        }

        if forced_splits > 0 {
            warn!(
                "{} nodes exceeded {} primitives with coincident centroids and were split arbitrarily",
                forced_splits, options.max_primitive_count
            );
        }

        let bvh = Bvh {
            nodes,
            primitive_indices,
        };
        debug!(
            "built bvh over {} primitives: {} nodes, depth {}",
            primitive_count,
            bvh.nodes.len(),
            bvh.depth()
        );
        Ok(bvh)
    }
}
