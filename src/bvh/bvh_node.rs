use std::ops::Range;

use crate::aabb::Aabb;

/// The [`BvhNode`] enum that describes a node in a [`Bvh`](crate::bvh::Bvh).
/// It's either a leaf node which references a range of the primitive permutation array,
/// or an inner node whose children are stored contiguously in the node array.
/// Both variants carry the [`Aabb`] which bounds everything below them.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BvhNode {
    /// Leaf node.
    Leaf {
        /// Union of the boxes of the referenced primitives.
        aabb: Aabb,

        /// Start of the range in [`Bvh::primitive_indices`](crate::bvh::Bvh::primitive_indices).
        first_primitive_index: u32,

        /// Length of the range.
        primitive_count: u32,
    },
    /// Inner node.
    Internal {
        /// Union of the boxes of the children.
        aabb: Aabb,

        /// Index of the first child in the node array.
        first_child_index: u32,

        /// Number of children following `first_child_index`.
        children_count: u32,
    },
}

impl BvhNode {
    /// Creates a leaf node.
    pub fn leaf(aabb: Aabb, first_primitive_index: u32, primitive_count: u32) -> BvhNode {
        BvhNode::Leaf {
            aabb,
            first_primitive_index,
            primitive_count,
        }
    }

    /// Creates an inner node.
    pub fn internal(aabb: Aabb, first_child_index: u32, children_count: u32) -> BvhNode {
        BvhNode::Internal {
            aabb,
            first_child_index,
            children_count,
        }
    }

    /// The box of this node.
    #[inline(always)]
    pub fn aabb(&self) -> &Aabb {
        match self {
            BvhNode::Leaf { aabb, .. } | BvhNode::Internal { aabb, .. } => aabb,
        }
    }

    /// Mutable access to the box of this node.
    pub fn aabb_mut(&mut self) -> &mut Aabb {
        match self {
            BvhNode::Leaf { aabb, .. } | BvhNode::Internal { aabb, .. } => aabb,
        }
    }

    /// Returns true for leaves.
    #[inline(always)]
    pub fn is_leaf(&self) -> bool {
        matches!(self, BvhNode::Leaf { .. })
    }

    /// Number of primitives referenced by a leaf, `0` for inner nodes.
    pub fn primitive_count(&self) -> u32 {
        match *self {
            BvhNode::Leaf {
                primitive_count, ..
            } => primitive_count,
            BvhNode::Internal { .. } => 0,
        }
    }

    /// Range of child node indices. Empty for leaves.
    pub fn children(&self) -> Range<usize> {
        match *self {
            BvhNode::Internal {
                first_child_index,
                children_count,
                ..
            } => {
                first_child_index as usize..first_child_index as usize + children_count as usize
            }
            BvhNode::Leaf { .. } => 0..0,
        }
    }

    /// Range of [`Bvh::primitive_indices`](crate::bvh::Bvh::primitive_indices) slots
    /// referenced by a leaf. Empty for inner nodes.
    pub fn primitives(&self) -> Range<usize> {
        match *self {
            BvhNode::Leaf {
                first_primitive_index,
                primitive_count,
                ..
            } => {
                first_primitive_index as usize
                    ..first_primitive_index as usize + primitive_count as usize
            }
            BvhNode::Internal { .. } => 0..0,
        }
    }
}
