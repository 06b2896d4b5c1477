//! Plain-old-data records for uploading a [`Scene`] to GPU buffers.
//!
//! Every record is `#[repr(C)]` and [`bytemuck::Pod`], so a `Vec` of them is uploaded with
//! `bytemuck::cast_slice`. Vectors are padded to 16 bytes and matrices are column-major,
//! which matches `std430` and WGSL storage buffer layout.

use std::mem::size_of_val;

use bytemuck::{Pod, Zeroable};

use crate::aabb::Aabb;
use crate::bvh::{Bvh, BvhNode};
use crate::cbvh::{pack_node_words, FIRST_INDEX_BITS, MAX_FIRST_INDEX};
use crate::error::BvhError;
use crate::shapes::Triangle;
use crate::tlas::{Instance, Scene};
use crate::Point3;

/// A node with a full precision box, 32 bytes. The words are packed like the words of a
/// [`CompressedNode`](crate::cbvh::CompressedNode).
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct GpuNode {
    pub min: [f32; 3],
    /// Leaf flag in bit 0, primitive count above it.
    pub word0: u32,
    pub max: [f32; 3],
    /// First child or first primitive slot, children count in the top bits.
    pub word1: u32,
}

impl GpuNode {
    pub fn new(node: &BvhNode) -> Result<GpuNode, BvhError> {
        let (word0, word1) = pack_node_words(node)?;
        let aabb = node.aabb();
        Ok(GpuNode {
            min: aabb.min.into(),
            word0,
            max: aabb.max.into(),
            word1,
        })
    }

    pub fn aabb(&self) -> Aabb {
        Aabb::with_bounds(Point3::from(self.min), Point3::from(self.max))
    }

    pub fn is_leaf(&self) -> bool {
        self.word0 & 1 != 0
    }

    pub fn primitive_count(&self) -> u32 {
        self.word0 >> 1
    }

    pub fn first_index(&self) -> u32 {
        self.word1 & MAX_FIRST_INDEX
    }

    pub fn children_count(&self) -> u32 {
        if self.is_leaf() {
            0
        } else {
            self.word1 >> FIRST_INDEX_BITS
        }
    }
}

/// Packs every node of `bvh`.
pub fn pack_nodes(bvh: &Bvh) -> Result<Vec<GpuNode>, BvhError> {
    bvh.nodes.iter().map(GpuNode::new).collect()
}

/// A triangle with every vertex padded to a `vec4`.
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct GpuTriangle {
    pub v0: [f32; 4],
    pub v1: [f32; 4],
    pub v2: [f32; 4],
}

impl From<&Triangle> for GpuTriangle {
    fn from(triangle: &Triangle) -> GpuTriangle {
        let pad = |p: &Point3| [p.x, p.y, p.z, 0.0];
        GpuTriangle {
            v0: pad(&triangle.v0),
            v1: pad(&triangle.v1),
            v2: pad(&triangle.v2),
        }
    }
}

impl GpuTriangle {
    pub fn to_triangle(&self) -> Triangle {
        let point = |v: &[f32; 4]| Point3::new(v[0], v[1], v[2]);
        Triangle::new(point(&self.v0), point(&self.v1), point(&self.v2))
    }
}

/// An instance with the offsets of its mesh in the concatenated bottom-level arrays.
///
/// Node indices in a bottom-level node are local to the mesh and get `node_offset` added,
/// leaf slots get `primitive_offset`, and the triangle indices read from those slots get
/// `triangle_offset`.
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct GpuInstance {
    pub object_to_world: [[f32; 4]; 4],
    pub world_to_object: [[f32; 4]; 4],
    pub node_offset: u32,
    pub primitive_offset: u32,
    pub triangle_offset: u32,
    pub mesh_index: u32,
}

/// Offsets of one mesh in the concatenated bottom-level arrays.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct MeshOffsets {
    pub node_offset: u32,
    pub primitive_offset: u32,
    pub triangle_offset: u32,
}

impl GpuInstance {
    pub fn new(instance: &Instance, offsets: &MeshOffsets) -> GpuInstance {
        GpuInstance {
            object_to_world: (*instance.object_to_world()).into(),
            world_to_object: (*instance.world_to_object()).into(),
            node_offset: offsets.node_offset,
            primitive_offset: offsets.primitive_offset,
            triangle_offset: offsets.triangle_offset,
            mesh_index: instance.mesh_index,
        }
    }
}

/// All buffers GPU traversal of a [`Scene`] reads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneBuffers {
    /// Top-level nodes. Leaf slots index `tlas_primitive_indices`.
    pub tlas_nodes: Vec<GpuNode>,
    /// Instance indices in top-level leaf order.
    pub tlas_primitive_indices: Vec<u32>,
    pub instances: Vec<GpuInstance>,
    /// Bottom-level nodes of all meshes, one block per mesh.
    pub blas_nodes: Vec<GpuNode>,
    /// Mesh-local triangle indices of all meshes, one block per mesh.
    pub blas_primitive_indices: Vec<u32>,
    pub triangles: Vec<GpuTriangle>,
    /// Where every mesh starts in the three bottom-level arrays.
    pub mesh_offsets: Vec<MeshOffsets>,
}

fn offset(len: usize) -> Result<u32, BvhError> {
    u32::try_from(len).map_err(|_| BvhError::IndexOverflow {
        index: len as u64,
        bits: 32,
    })
}

impl SceneBuffers {
    /// Flattens a committed `scene`. Each mesh is stored once however many instances
    /// reference it.
    pub fn from_scene(scene: &Scene) -> Result<SceneBuffers, BvhError> {
        debug_assert!(scene.is_committed(), "Scene::commit must run before upload");

        let mut buffers = SceneBuffers {
            tlas_nodes: pack_nodes(scene.tlas())?,
            tlas_primitive_indices: scene.tlas().primitive_indices.clone(),
            ..SceneBuffers::default()
        };

        for mesh in scene.meshes() {
            buffers.mesh_offsets.push(MeshOffsets {
                node_offset: offset(buffers.blas_nodes.len())?,
                primitive_offset: offset(buffers.blas_primitive_indices.len())?,
                triangle_offset: offset(buffers.triangles.len())?,
            });
            buffers.blas_nodes.extend(pack_nodes(&mesh.bvh)?);
            buffers
                .blas_primitive_indices
                .extend_from_slice(&mesh.bvh.primitive_indices);
            buffers
                .triangles
                .extend(mesh.triangles.iter().map(GpuTriangle::from));
        }
        buffers.instances = scene
            .instances()
            .iter()
            .map(|instance| {
                GpuInstance::new(instance, &buffers.mesh_offsets[instance.mesh_index as usize])
            })
            .collect();
        Ok(buffers)
    }

    /// Total size of all buffers in bytes.
    pub fn byte_size(&self) -> usize {
        size_of_val(self.tlas_nodes.as_slice())
            + size_of_val(self.tlas_primitive_indices.as_slice())
            + size_of_val(self.instances.as_slice())
            + size_of_val(self.blas_nodes.as_slice())
            + size_of_val(self.blas_primitive_indices.as_slice())
            + size_of_val(self.triangles.as_slice())
    }
}
