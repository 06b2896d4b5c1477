//! The compressed node layout and the compressed hierarchy.

use std::mem::size_of;
use std::ops::Range;

use log::debug;

use crate::aabb::Aabb;
use crate::bvh::{intersect_primitives, Bvh, BvhNode, Hit, TraversalStack};
use crate::cbvh::{dequantize_aabb, quantize_aabb, QuantizedAabb, Quantum};
use crate::error::BvhError;
use crate::ray::Ray;
use crate::shapes::Intersect;
use crate::INVALID_INDEX;

/// Bits of the second node word holding the first child or first primitive index.
pub const FIRST_INDEX_BITS: u32 = 28;

/// Largest index that fits [`FIRST_INDEX_BITS`].
pub const MAX_FIRST_INDEX: u32 = (1 << FIRST_INDEX_BITS) - 1;

/// Largest number of children an inner node can have in the remaining high bits.
pub const MAX_CHILDREN_COUNT: u32 = (1 << (32 - FIRST_INDEX_BITS)) - 1;

/// Largest primitive count of a leaf.
pub const MAX_PRIMITIVE_COUNT: u32 = (1 << 31) - 1;

/// A node with its box quantized relative to its parent's box.
///
/// ```text
/// word0: bit 0 = is_leaf, bits 1..32 = primitive_count
/// word1: bits 0..28 = first primitive index (leaf) or first child index (inner)
///        bits 28..32 = children_count (inner), zero for leaves
/// ```
///
/// With `u8` coordinates the node takes 16 bytes: six codes, two bytes of padding and the
/// two words. With `u16` coordinates the codes fill 12 bytes and the node takes 20.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[repr(C)]
pub struct CompressedNode<Q: Quantum> {
    /// Box relative to the parent's reconstructed box.
    pub qaabb: QuantizedAabb<Q>,
    /// Leaf flag and primitive count.
    pub word0: u32,
    /// First index and children count.
    pub word1: u32,
}

impl<Q: Quantum> CompressedNode<Q> {
    /// Packs a leaf.
    pub fn leaf(
        qaabb: QuantizedAabb<Q>,
        first_primitive_index: u32,
        primitive_count: u32,
    ) -> Result<CompressedNode<Q>, BvhError> {
        let (word0, word1) = leaf_words(first_primitive_index, primitive_count)?;
        Ok(CompressedNode { qaabb, word0, word1 })
    }

    /// Packs an inner node.
    pub fn internal(
        qaabb: QuantizedAabb<Q>,
        first_child_index: u32,
        children_count: u32,
    ) -> Result<CompressedNode<Q>, BvhError> {
        let (word0, word1) = internal_words(first_child_index, children_count)?;
        Ok(CompressedNode { qaabb, word0, word1 })
    }

    #[inline(always)]
    pub fn is_leaf(&self) -> bool {
        self.word0 & 1 != 0
    }

    #[inline(always)]
    pub fn primitive_count(&self) -> u32 {
        self.word0 >> 1
    }

    #[inline(always)]
    pub fn first_index(&self) -> u32 {
        self.word1 & MAX_FIRST_INDEX
    }

    #[inline(always)]
    pub fn children_count(&self) -> u32 {
        if self.is_leaf() {
            0
        } else {
            self.word1 >> FIRST_INDEX_BITS
        }
    }

    /// Range of child node indices. Empty for leaves.
    #[inline(always)]
    pub fn children(&self) -> Range<usize> {
        let first = self.first_index() as usize;
        first..first + self.children_count() as usize
    }

    /// Range of primitive permutation slots. Empty for inner nodes.
    #[inline(always)]
    pub fn primitives(&self) -> Range<usize> {
        let first = self.first_index() as usize;
        first..first + self.primitive_count() as usize
    }

    /// Appends the `#[repr(C)]` image of this node, padding zeroed, in little endian.
    pub fn write_bytes(&self, bytes: &mut Vec<u8>) {
        let start = bytes.len();
        bytes.extend_from_slice(bytemuck::cast_slice(&self.qaabb.min));
        bytes.extend_from_slice(bytemuck::cast_slice(&self.qaabb.max));
        // Native endianness of the codes only matters for `u16` on big endian hosts.
        if cfg!(target_endian = "big") && size_of::<Q>() > 1 {
            for code in bytes[start..].chunks_exact_mut(size_of::<Q>()) {
                code.reverse();
            }
        }
        while (bytes.len() - start) % 4 != 0 {
            bytes.push(0);
        }
        bytes.extend_from_slice(&self.word0.to_le_bytes());
        bytes.extend_from_slice(&self.word1.to_le_bytes());
    }
}

fn check_first_index(index: u32) -> Result<(), BvhError> {
    if index > MAX_FIRST_INDEX {
        return Err(BvhError::IndexOverflow {
            index: index as u64,
            bits: FIRST_INDEX_BITS,
        });
    }
    Ok(())
}

fn leaf_words(first_primitive_index: u32, primitive_count: u32) -> Result<(u32, u32), BvhError> {
    check_first_index(first_primitive_index)?;
    if primitive_count > MAX_PRIMITIVE_COUNT {
        return Err(BvhError::IndexOverflow {
            index: primitive_count as u64,
            bits: 31,
        });
    }
    Ok((1 | (primitive_count << 1), first_primitive_index))
}

fn internal_words(first_child_index: u32, children_count: u32) -> Result<(u32, u32), BvhError> {
    check_first_index(first_child_index)?;
    if children_count > MAX_CHILDREN_COUNT {
        return Err(BvhError::IndexOverflow {
            index: children_count as u64,
            bits: 32 - FIRST_INDEX_BITS,
        });
    }
    Ok((0, first_child_index | (children_count << FIRST_INDEX_BITS)))
}

/// Packs the `(word0, word1)` pair of `node`, the layout shared by [`CompressedNode`] and
/// the full precision upload nodes.
pub fn pack_node_words(node: &BvhNode) -> Result<(u32, u32), BvhError> {
    match *node {
        BvhNode::Leaf {
            first_primitive_index,
            primitive_count,
            ..
        } => leaf_words(first_primitive_index, primitive_count),
        BvhNode::Internal {
            first_child_index,
            children_count,
            ..
        } => internal_words(first_child_index, children_count),
    }
}

/// A [`Bvh`] with every node box stored relative to the box of its parent.
///
/// Only the root box is kept in full precision. Node boxes are reconstructed top-down
/// during traversal: every stack entry carries the reconstructed box of its node, which
/// is the parent box its children are decoded against.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressedBvh<Q: Quantum> {
    /// Full precision box of the root, which has no parent to be quantized against.
    pub root_aabb: Aabb,

    /// The compressed nodes, in the same order as the source [`Bvh`].
    pub nodes: Vec<CompressedNode<Q>>,

    /// The primitive permutation, copied from the source [`Bvh`].
    pub primitive_indices: Vec<u32>,
}

impl<Q: Quantum> CompressedBvh<Q> {
    /// Compresses `bvh`.
    ///
    /// A first pass computes the parent of every node. The second pass walks the nodes in
    /// array order, which visits parents before children, and quantizes every node
    /// against the reconstructed box of its parent. The root is quantized against
    /// `root_aabb`. Reconstructed boxes are conservative, so they contain the original
    /// node boxes and traversal never misses a primitive the source tree would find.
    ///
    /// # Errors
    /// [`BvhError::InvalidTree`] if a child is not stored after its parent,
    /// [`BvhError::IndexOverflow`] or [`BvhError::TooManyChildren`] if a node does not fit
    /// the packed words.
    pub fn compress(bvh: &Bvh) -> Result<CompressedBvh<Q>, BvhError> {
        for (index, node) in bvh.nodes.iter().enumerate() {
            if node.children().end > bvh.nodes.len() {
                return Err(BvhError::InvalidTree {
                    node: index,
                    reason: format!("child range {:?} out of bounds", node.children()),
                });
            }
            if let BvhNode::Internal { children_count, .. } = *node {
                if children_count > MAX_CHILDREN_COUNT {
                    return Err(BvhError::TooManyChildren {
                        node: index,
                        count: children_count,
                        max: MAX_CHILDREN_COUNT,
                    });
                }
            }
        }

        let root_aabb = bvh.root_aabb();
        let parents = bvh.parents();

        let mut decoded = Vec::with_capacity(bvh.nodes.len());
        let mut nodes = Vec::with_capacity(bvh.nodes.len());
        for (index, node) in bvh.nodes.iter().enumerate() {
            let parent_aabb = match parents[index] {
                INVALID_INDEX if index == 0 => root_aabb,
                parent if parent != INVALID_INDEX && (parent as usize) < index => {
                    decoded[parent as usize]
                }
                _ => {
                    return Err(BvhError::InvalidTree {
                        node: index,
                        reason: "node is not stored after a parent".into(),
                    })
                }
            };

            let qaabb = quantize_aabb::<Q>(&parent_aabb, node.aabb());
            decoded.push(dequantize_aabb(&parent_aabb, &qaabb));
            let compressed = match *node {
                BvhNode::Leaf {
                    first_primitive_index,
                    primitive_count,
                    ..
                } => CompressedNode::leaf(qaabb, first_primitive_index, primitive_count),
                BvhNode::Internal {
                    first_child_index,
                    children_count,
                    ..
                } => CompressedNode::internal(qaabb, first_child_index, children_count),
            }?;
            nodes.push(compressed);
        }

        let cbvh = CompressedBvh {
            root_aabb,
            nodes,
            primitive_indices: bvh.primitive_indices.clone(),
        };
        debug!(
            "compressed {} nodes from {} to {} bytes",
            cbvh.nodes.len(),
            bvh.nodes.len() * size_of::<BvhNode>(),
            cbvh.nodes.len() * size_of::<CompressedNode<Q>>()
        );
        Ok(cbvh)
    }

    /// Returns true if the tree references no primitives.
    pub fn is_empty(&self) -> bool {
        self.primitive_indices.is_empty()
    }

    /// Reconstructs the boxes of all nodes in one top-down pass.
    pub fn node_aabbs(&self) -> Vec<Aabb> {
        let mut aabbs = vec![Aabb::empty(); self.nodes.len()];
        if let Some(root) = self.nodes.first() {
            aabbs[0] = dequantize_aabb(&self.root_aabb, &root.qaabb);
        }
        for (index, node) in self.nodes.iter().enumerate() {
            for child in node.children() {
                aabbs[child] = dequantize_aabb(&aabbs[index], &self.nodes[child].qaabb);
            }
        }
        aabbs
    }

    /// Reconstructs the box of the node at `index`, decoding the path from the root.
    pub fn node_aabb(&self, index: usize) -> Aabb {
        let mut parents = vec![INVALID_INDEX; self.nodes.len()];
        for (parent, node) in self.nodes.iter().enumerate() {
            for child in node.children() {
                parents[child] = parent as u32;
            }
        }
        let mut path = vec![index];
        while let Some(&parent) = parents.get(*path.last().unwrap_or(&0)) {
            if parent == INVALID_INDEX {
                break;
            }
            path.push(parent as usize);
        }
        path.iter().rev().fold(self.root_aabb, |parent, node| {
            dequantize_aabb(&parent, &self.nodes[*node].qaabb)
        })
    }

    /// Finds the closest intersection of `ray` with `primitives`, like [`Bvh::intersect`].
    pub fn intersect<P: Intersect>(&self, ray: &mut Ray, primitives: &[P]) -> Hit {
        let mut hit = Hit::default();
        if self.is_empty() {
            return hit;
        }

        let mut stack = TraversalStack::<(u32, Aabb)>::new();
        stack.push((0, dequantize_aabb(&self.root_aabb, &self.nodes[0].qaabb)));
        while let Some((node_index, aabb)) = stack.pop() {
            if !ray.intersects_aabb(&aabb).did_intersect() {
                continue;
            }
            let node = &self.nodes[node_index as usize];
            if node.is_leaf() {
                intersect_primitives(
                    &self.primitive_indices[node.primitives()],
                    ray,
                    primitives,
                    &mut hit,
                );
            } else {
                for child in node.children() {
                    stack.push((child as u32, dequantize_aabb(&aabb, &self.nodes[child].qaabb)));
                }
            }
        }
        hit
    }

    /// The node array as uploaded to the GPU: every node in its `#[repr(C)]` layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.nodes.len() * size_of::<CompressedNode<Q>>());
        for node in &self.nodes {
            node.write_bytes(&mut bytes);
        }
        bytes
    }

    /// The primitive permutation as uploaded to the GPU.
    pub fn primitive_index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.primitive_indices)
    }
}
