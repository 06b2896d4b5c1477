//! Closest-hit traversal of a [`Bvh`].

use std::ops::Range;

use crate::bvh::{Bvh, BvhNode, TraversalStack};
use crate::ray::{Ray, TriangleIntersection};
use crate::shapes::Intersect;
use crate::{Real, INVALID_INDEX};

/// Result of a closest-hit query.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Hit {
    /// Index of the hit primitive in the caller's primitive array, [`INVALID_INDEX`] on a miss.
    pub primitive_index: u32,

    /// Index of the hit instance in two-level traversal, [`INVALID_INDEX`] otherwise.
    pub instance_index: u32,

    /// Ray parameter of the hit, `+inf` on a miss.
    pub t: Real,

    /// Barycentric weight of `v1`.
    pub u: Real,

    /// Barycentric weight of `v2`.
    pub v: Real,

    /// Barycentric weight of `v0`.
    pub w: Real,
}

impl Default for Hit {
    fn default() -> Hit {
        Hit {
            primitive_index: INVALID_INDEX,
            instance_index: INVALID_INDEX,
            t: Real::INFINITY,
            u: 0.0,
            v: 0.0,
            w: 0.0,
        }
    }
}

impl Hit {
    /// Returns true unless this is the "no hit" record.
    pub fn is_hit(&self) -> bool {
        self.primitive_index != INVALID_INDEX
    }

    /// Records `intersection` of `primitive_index` and shrinks the ray to it.
    #[inline(always)]
    pub(crate) fn record(&mut self, ray: &mut Ray, primitive_index: u32, hit: TriangleIntersection) {
        ray.tmax = hit.t;
        self.primitive_index = primitive_index;
        self.t = hit.t;
        self.u = hit.u;
        self.v = hit.v;
        self.w = hit.w;
    }
}

/// Tests every primitive of `primitives` against `ray` and returns the closest hit. Ground
/// truth for the tree traversals.
pub fn intersect_brute_force<P: Intersect>(ray: &mut Ray, primitives: &[P]) -> Hit {
    let mut hit = Hit::default();
    for (index, primitive) in primitives.iter().enumerate() {
        if let Some(intersection) = primitive.intersect(ray) {
            hit.record(ray, index as u32, intersection);
        }
    }
    hit
}

/// Tests the primitives named by `primitive_indices`, the contents of one leaf.
#[inline(always)]
pub(crate) fn intersect_primitives<P: Intersect>(
    primitive_indices: &[u32],
    ray: &mut Ray,
    primitives: &[P],
    hit: &mut Hit,
) {
    for &primitive_index in primitive_indices {
        if let Some(intersection) = primitives[primitive_index as usize].intersect(ray) {
            hit.record(ray, primitive_index, intersection);
        }
    }
}

impl Bvh {
    /// Tests the primitives behind the permutation slots `slots`.
    #[inline(always)]
    fn intersect_leaf<P: Intersect>(
        &self,
        slots: Range<usize>,
        ray: &mut Ray,
        primitives: &[P],
        hit: &mut Hit,
    ) {
        intersect_primitives(&self.primitive_indices[slots], ray, primitives, hit);
    }

    /// Finds the closest intersection of `ray` with `primitives`, the array the tree was
    /// built over. `ray.tmax` is left at the distance of the returned hit.
    ///
    /// Depth-first over an explicit stack: a node is skipped when its box misses the ray
    /// clipped to the closest hit found so far, inner nodes push all their children, and
    /// leaves test their primitives.
    ///
    /// The tree is trusted to be well formed, see [`Bvh::validate`].
    pub fn intersect<P: Intersect>(&self, ray: &mut Ray, primitives: &[P]) -> Hit {
        let mut hit = Hit::default();
        if self.is_empty() {
            return hit;
        }

        let mut stack = TraversalStack::<u32>::new();
        stack.push(0);
        while let Some(node_index) = stack.pop() {
            let node = &self.nodes[node_index as usize];
            if !ray.intersects_aabb(node.aabb()).did_intersect() {
                continue;
            }
            match *node {
                BvhNode::Internal {
                    first_child_index,
                    children_count,
                    ..
                } => {
                    for child in first_child_index..first_child_index + children_count {
                        stack.push(child);
                    }
                }
                BvhNode::Leaf { .. } => {
                    self.intersect_leaf(node.primitives(), ray, primitives, &mut hit);
                }
            }
        }
        hit
    }

    /// Same result as [`Bvh::intersect`], visiting children front to back.
    ///
    /// Children are box-tested before they are pushed. Of two hit children the nearer one
    /// is visited first, so a close hit prunes the farther subtree early, and two hit sibling
    /// leaves with adjacent primitive ranges are scanned as one range. Stack entries keep
    /// their entry distance and are dropped when a closer hit was found in the meantime.
    pub fn intersect_ordered<P: Intersect>(&self, ray: &mut Ray, primitives: &[P]) -> Hit {
        let mut hit = Hit::default();
        if self.is_empty() {
            return hit;
        }
        let root = ray.intersects_aabb(self.nodes[0].aabb());
        if !root.did_intersect() {
            return hit;
        }

        let mut stack = TraversalStack::<(u32, Real)>::new();
        stack.push((0, root.tmin));
        while let Some((node_index, tmin)) = stack.pop() {
            if tmin > ray.tmax {
                continue;
            }
            let node = &self.nodes[node_index as usize];
            let children = match *node {
                BvhNode::Leaf { .. } => {
                    self.intersect_leaf(node.primitives(), ray, primitives, &mut hit);
                    continue;
                }
                BvhNode::Internal { .. } => node.children(),
            };

            if children.len() != 2 {
                for child in children {
                    let entry = ray.intersects_aabb(self.nodes[child].aabb());
                    if entry.did_intersect() {
                        stack.push((child as u32, entry.tmin));
                    }
                }
                continue;
            }

            let (a, b) = (children.start, children.start + 1);
            let (node_a, node_b) = (&self.nodes[a], &self.nodes[b]);
            let hit_a = ray.intersects_aabb(node_a.aabb());
            let hit_b = ray.intersects_aabb(node_b.aabb());
            match (hit_a.did_intersect(), hit_b.did_intersect()) {
                (true, true) => {
                    if node_a.is_leaf() && node_b.is_leaf() {
                        let (slots_a, slots_b) = (node_a.primitives(), node_b.primitives());
                        if slots_a.end == slots_b.start {
                            self.intersect_leaf(slots_a.start..slots_b.end, ray, primitives, &mut hit);
                            continue;
                        }
                    }
                    let ((near, near_tmin), (far, far_tmin)) = if hit_a.tmin <= hit_b.tmin {
                        ((a, hit_a.tmin), (b, hit_b.tmin))
                    } else {
                        ((b, hit_b.tmin), (a, hit_a.tmin))
                    };
                    stack.push((far as u32, far_tmin));
                    stack.push((near as u32, near_tmin));
                }
                (true, false) => stack.push((a as u32, hit_a.tmin)),
                (false, true) => stack.push((b as u32, hit_b.tmin)),
                (false, false) => {}
            }
        }
        hit
    }
}
