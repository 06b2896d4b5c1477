//! This module defines the [`Bvh`] node arena and its structural operations.

use std::iter::repeat;

use log::debug;

use crate::aabb::Aabb;
use crate::bvh::{BuildOptions, Builder, BvhNode, SahBuilder};
use crate::error::BvhError;
use crate::{Point3, INVALID_INDEX};

/// The [`Bvh`] data structure. Contains the list of [`BvhNode`]s, node 0 being the root,
/// and the primitive permutation the leaves index into.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bvh {
    /// The list of nodes of the [`Bvh`]. The children of an inner node are stored
    /// contiguously, after the node itself.
    pub nodes: Vec<BvhNode>,

    /// Leaf ranges index into this array, which maps them to the caller's primitives.
    pub primitive_indices: Vec<u32>,
}

impl Default for Bvh {
    fn default() -> Bvh {
        Bvh::empty()
    }
}

impl Bvh {
    /// The tree over zero primitives: a single leaf with an empty box and no primitives.
    pub fn empty() -> Bvh {
        Bvh {
            nodes: vec![BvhNode::leaf(Aabb::empty(), 0, 0)],
            primitive_indices: Vec::new(),
        }
    }

    /// Builds a [`Bvh`] over `aabbs[i]`/`centers[i]` with the [`SahBuilder`].
    ///
    /// # Examples
    /// ```
    /// use photon_bvh::aabb::{Aabb, Bounded};
    /// use photon_bvh::bvh::{BuildOptions, Bvh};
    /// use photon_bvh::Point3;
    ///
    /// let points: Vec<Point3> = (0..100).map(|i| Point3::new(i as f32, 0.0, 0.0)).collect();
    /// let aabbs: Vec<Aabb> = points.iter().map(|p| p.aabb()).collect();
    /// let bvh = Bvh::build(&aabbs, &points, &BuildOptions::default()).unwrap();
    ///
    /// assert_eq!(bvh.primitive_indices.len(), 100);
    /// assert!(bvh.validate(&aabbs).is_ok());
    /// ```
    pub fn build(
        aabbs: &[Aabb],
        centers: &[Point3],
        options: &BuildOptions,
    ) -> Result<Bvh, BvhError> {
        SahBuilder.build(aabbs, centers, options)
    }

    /// Returns true if the tree references no primitives.
    pub fn is_empty(&self) -> bool {
        self.primitive_indices.is_empty()
    }

    /// The box of the root node.
    pub fn root_aabb(&self) -> Aabb {
        self.nodes.first().map_or(Aabb::empty(), |node| *node.aabb())
    }

    /// Number of levels of the tree. A tree which is a single leaf has depth 1.
    pub fn depth(&self) -> usize {
        let mut depths = vec![0usize; self.nodes.len()];
        let mut max_depth = 0;
        for (index, node) in self.nodes.iter().enumerate() {
            let depth = if index == 0 { 1 } else { depths[index] };
            max_depth = max_depth.max(depth);
            for child in node.children() {
                depths[child] = depth + 1;
            }
        }
        max_depth
    }

    /// Returns the parent of every node, [`INVALID_INDEX`] for the root. One scan over the
    /// child ranges of all inner nodes.
    pub fn parents(&self) -> Vec<u32> {
        let mut parents = vec![INVALID_INDEX; self.nodes.len()];
        for (index, node) in self.nodes.iter().enumerate() {
            for child in node.children() {
                parents[child] = index as u32;
            }
        }
        parents
    }

    /// Recomputes every node box from `primitive_aabbs`, keeping the topology.
    /// Children are stored after their parents, so one backwards pass suffices.
    pub fn refit(&mut self, primitive_aabbs: &[Aabb]) {
        for index in (0..self.nodes.len()).rev() {
            let node = &self.nodes[index];
            let aabb = if node.is_leaf() {
                self.primitive_indices[node.primitives()]
                    .iter()
                    .fold(Aabb::empty(), |aabb, primitive| {
                        aabb.join(&primitive_aabbs[*primitive as usize])
                    })
            } else {
                self.nodes[node.children()]
                    .iter()
                    .fold(Aabb::empty(), |aabb, child| aabb.join(child.aabb()))
            };
            *self.nodes[index].aabb_mut() = aabb;
        }
    }

    /// Checks the builder contract against the primitive boxes the tree was built from:
    /// children are stored after their parent, every node but the root has exactly one
    /// parent, all ranges are in bounds, the leaves reference every primitive exactly once,
    /// and every box is the union of the boxes below it.
    pub fn validate(&self, primitive_aabbs: &[Aabb]) -> Result<(), BvhError> {
        let invalid = |node: usize, reason: String| Err(BvhError::InvalidTree { node, reason });

        if self.nodes.is_empty() {
            return invalid(0, "there is no root node".into());
        }
        if self.primitive_indices.len() != primitive_aabbs.len() {
            return invalid(
                0,
                format!(
                    "permutation has {} entries for {} primitives",
                    self.primitive_indices.len(),
                    primitive_aabbs.len()
                ),
            );
        }

        let mut parents = vec![INVALID_INDEX; self.nodes.len()];
        let mut slot_seen = vec![false; self.primitive_indices.len()];
        let mut primitive_seen = vec![false; primitive_aabbs.len()];

        for (index, node) in self.nodes.iter().enumerate() {
            let expected = match node {
                BvhNode::Internal { children_count, .. } => {
                    let children = node.children();
                    if *children_count == 0 {
                        return invalid(index, "inner node without children".into());
                    }
                    if children.start <= index {
                        return invalid(index, "children must be stored after their parent".into());
                    }
                    if children.end > self.nodes.len() {
                        return invalid(index, format!("child range {children:?} out of bounds"));
                    }
                    let mut joint = Aabb::empty();
                    for child in children {
                        if parents[child] != INVALID_INDEX {
                            return invalid(child, "node has two parents".into());
                        }
                        parents[child] = index as u32;
                        joint.join_mut(self.nodes[child].aabb());
                    }
                    joint
                }
                BvhNode::Leaf { .. } => {
                    let slots = node.primitives();
                    if slots.end > self.primitive_indices.len() {
                        return invalid(index, format!("primitive range {slots:?} out of bounds"));
                    }
                    let mut joint = Aabb::empty();
                    for slot in slots {
                        if slot_seen[slot] {
                            return invalid(index, format!("slot {slot} is referenced twice"));
                        }
                        slot_seen[slot] = true;
                        let primitive = self.primitive_indices[slot] as usize;
                        if primitive >= primitive_aabbs.len() || primitive_seen[primitive] {
                            return invalid(
                                index,
                                format!("slot {slot} holds invalid or repeated primitive {primitive}"),
                            );
                        }
                        primitive_seen[primitive] = true;
                        joint.join_mut(&primitive_aabbs[primitive]);
                    }
                    joint
                }
            };
            if expected != *node.aabb() {
                return invalid(
                    index,
                    format!("box {} is not the union {} of its contents", node.aabb(), expected),
                );
            }
        }

        if let Some(orphan) = (1..self.nodes.len()).find(|index| parents[*index] == INVALID_INDEX) {
            return invalid(orphan, "node is not reachable from the root".into());
        }
        if let Some(slot) = slot_seen.iter().position(|seen| !seen) {
            return invalid(0, format!("slot {slot} is not referenced by any leaf"));
        }
        Ok(())
    }

    /// Logs the [`Bvh`] in a tree-like visualization at debug level.
    pub fn pretty_print(&self) {
        self.print_node(0, 0);
    }

    fn print_node(&self, node_index: usize, depth: usize) {
        let padding: String = repeat(" ").take(depth).collect();
        match self.nodes[node_index] {
            BvhNode::Internal { aabb, .. } => {
                debug!("{}node={} {}", padding, node_index, aabb);
                for child in self.nodes[node_index].children() {
                    self.print_node(child, depth + 1);
                }
            }
            BvhNode::Leaf { aabb, .. } => {
                let primitives = &self.primitive_indices[self.nodes[node_index].primitives()];
                debug!("{}leaf={} {} primitives={:?}", padding, node_index, aabb, primitives);
            }
        }
    }
}
