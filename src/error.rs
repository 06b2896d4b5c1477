//! Error type shared by every fallible construction path of the crate.
//!
//! Traversal itself never fails: it assumes a well-formed tree, which is what
//! [`Bvh::validate`](crate::bvh::Bvh::validate) checks for.

use thiserror::Error;

/// Errors raised while extracting geometry, building, validating or packing a hierarchy.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BvhError {
    /// The index buffer does not describe whole triangles.
    #[error("index buffer length {len} is not a multiple of 3")]
    MalformedIndexBuffer { len: usize },

    /// A triangle references a vertex that does not exist.
    #[error("vertex index {index} is out of range for {vertex_count} vertices")]
    VertexIndexOutOfRange { index: u32, vertex_count: usize },

    /// The per-primitive input arrays of a build disagree in length.
    #[error("got {aabbs} primitive boxes but {centers} centroids")]
    MismatchedInput { aabbs: usize, centers: usize },

    /// The build configuration cannot produce a tree.
    #[error("invalid build options: {0}")]
    InvalidOptions(String),

    /// The tree does not honor the builder contract.
    #[error("malformed tree at node {node}: {reason}")]
    InvalidTree { node: usize, reason: String },

    /// An index does not fit the bits reserved for it in a packed node.
    #[error("index {index} does not fit in {bits} bits")]
    IndexOverflow { index: u64, bits: u32 },

    /// An inner node has more children than a packed node can describe.
    #[error("node {node} has {count} children, at most {max} can be packed")]
    TooManyChildren { node: usize, count: u32, max: u32 },

    /// An instance references a mesh that was never added.
    #[error("mesh index {mesh_index} is out of range for {mesh_count} meshes")]
    UnknownMesh { mesh_index: u32, mesh_count: usize },

    /// An instance references an instance slot that does not exist.
    #[error("instance index {instance_index} is out of range for {instance_count} instances")]
    UnknownInstance {
        instance_index: usize,
        instance_count: usize,
    },

    /// An instance transform cannot be inverted.
    #[error("instance transform is not invertible")]
    SingularTransform,
}
