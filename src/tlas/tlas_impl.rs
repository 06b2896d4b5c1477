//! Meshes, instances and the [`Scene`] that ties them together under a top-level tree.

use log::debug;

use crate::aabb::Aabb;
use crate::bvh::{BuildOptions, Bvh, BvhNode, Hit, TraversalStack};
use crate::error::BvhError;
use crate::ray::Ray;
use crate::shapes::{Geometry, Triangle};
use crate::{Matrix4, Point3};

/// Triangles of one mesh together with their bottom-level tree. Meshes are immutable once
/// added to a [`Scene`] and may be referenced by any number of instances.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mesh {
    /// Triangles in object space.
    pub triangles: Vec<Triangle>,
    /// The tree over `triangles`.
    pub bvh: Bvh,
}

impl Mesh {
    /// Builds the bottom-level tree over `geometry`.
    pub fn new(geometry: Geometry, options: &BuildOptions) -> Result<Mesh, BvhError> {
        let bvh = Bvh::build(&geometry.aabbs, &geometry.centers, options)?;
        Ok(Mesh {
            triangles: geometry.triangles,
            bvh,
        })
    }

    /// Extracts triangles from an indexed vertex buffer and builds their tree.
    pub fn from_indexed(
        positions: &[Point3],
        indices: &[u32],
        options: &BuildOptions,
    ) -> Result<Mesh, BvhError> {
        Mesh::new(Geometry::from_indexed(positions, indices)?, options)
    }

    /// Object space box of the whole mesh.
    pub fn aabb(&self) -> Aabb {
        self.bvh.root_aabb()
    }

    /// Closest hit of an object space ray.
    pub fn intersect(&self, ray: &mut Ray) -> Hit {
        self.bvh.intersect_ordered(ray, &self.triangles)
    }
}

/// A placement of a [`Mesh`] in world space.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Instance {
    /// Index of the placed mesh in [`Scene::meshes`].
    pub mesh_index: u32,
    object_to_world: Matrix4,
    world_to_object: Matrix4,
}

impl Instance {
    /// Places mesh `mesh_index` with the affine `object_to_world` transform.
    ///
    /// # Errors
    /// [`BvhError::SingularTransform`] if the transform has no finite inverse.
    ///
    /// # Examples
    /// ```
    /// use photon_bvh::tlas::Instance;
    /// use photon_bvh::{BvhError, Matrix4, Vector3};
    ///
    /// let moved = Matrix4::new_translation(&Vector3::new(1.0, 2.0, 3.0));
    /// assert!(Instance::new(0, moved).is_ok());
    /// assert_eq!(Instance::new(0, Matrix4::zeros()), Err(BvhError::SingularTransform));
    /// ```
    pub fn new(mesh_index: u32, object_to_world: Matrix4) -> Result<Instance, BvhError> {
        let world_to_object = object_to_world
            .try_inverse()
            .filter(|inverse| inverse.iter().all(|x| x.is_finite()))
            .ok_or(BvhError::SingularTransform)?;
        Ok(Instance {
            mesh_index,
            object_to_world,
            world_to_object,
        })
    }

    pub fn object_to_world(&self) -> &Matrix4 {
        &self.object_to_world
    }

    pub fn world_to_object(&self) -> &Matrix4 {
        &self.world_to_object
    }

    /// World space box of `mesh` placed by this instance.
    pub fn world_aabb(&self, mesh: &Mesh) -> Aabb {
        mesh.aabb().transform(&self.object_to_world)
    }
}

/// Work left for [`Scene::commit`]. Ordered so that the stronger requirement wins.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Pending {
    Nothing,
    Refit,
    Rebuild,
}

/// A set of meshes placed by instances, with a top-level tree over the instance boxes.
///
/// Edits are recorded and applied by [`Scene::commit`], which must run before the next
/// [`Scene::intersect`]. Instances are referenced by their position in
/// [`Scene::instances`].
///
/// # Examples
/// ```
/// use photon_bvh::bvh::BuildOptions;
/// use photon_bvh::ray::Ray;
/// use photon_bvh::tlas::{Mesh, Scene};
/// use photon_bvh::{Matrix4, Point3, Vector3};
///
/// let positions = [
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(0.0, 1.0, 0.0),
/// ];
/// let mesh = Mesh::from_indexed(&positions, &[0, 1, 2], &BuildOptions::default()).unwrap();
///
/// let mut scene = Scene::new();
/// let mesh_index = scene.add_mesh(mesh);
/// scene.add_instance(mesh_index, Matrix4::identity()).unwrap();
/// scene
///     .add_instance(mesh_index, Matrix4::new_translation(&Vector3::new(0.0, 0.0, -2.0)))
///     .unwrap();
/// scene.commit().unwrap();
///
/// let mut ray = Ray::new(Point3::new(0.25, 0.25, 1.0), Vector3::new(0.0, 0.0, -1.0));
/// let hit = scene.intersect(&mut ray);
/// assert_eq!(hit.instance_index, 0);
/// assert_eq!(hit.t, 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct Scene {
    meshes: Vec<Mesh>,
    instances: Vec<Instance>,
    instance_aabbs: Vec<Aabb>,
    tlas: Bvh,
    options: BuildOptions,
    pending: Pending,
}

impl Default for Scene {
    fn default() -> Scene {
        Scene::new()
    }
}

impl Scene {
    /// An empty scene whose top level is built with [`BuildOptions::top_level`].
    pub fn new() -> Scene {
        Scene {
            meshes: Vec::new(),
            instances: Vec::new(),
            instance_aabbs: Vec::new(),
            tlas: Bvh::empty(),
            options: BuildOptions::top_level(),
            pending: Pending::Nothing,
        }
    }

    /// An empty scene whose top level is built with `options`.
    pub fn with_options(options: BuildOptions) -> Result<Scene, BvhError> {
        options.validate()?;
        Ok(Scene {
            options,
            ..Scene::new()
        })
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    /// The top-level tree. Its primitives are the instances.
    pub fn tlas(&self) -> &Bvh {
        &self.tlas
    }

    /// World space boxes of the instances as of the last commit.
    pub fn instance_aabbs(&self) -> &[Aabb] {
        &self.instance_aabbs
    }

    /// Returns true if no edit is waiting for [`Scene::commit`].
    pub fn is_committed(&self) -> bool {
        self.pending == Pending::Nothing
    }

    /// Adds a mesh and returns its index.
    pub fn add_mesh(&mut self, mesh: Mesh) -> u32 {
        self.meshes.push(mesh);
        (self.meshes.len() - 1) as u32
    }

    /// Places mesh `mesh_index` and returns the index of the new instance.
    ///
    /// # Errors
    /// [`BvhError::UnknownMesh`] for a mesh that was not added and
    /// [`BvhError::SingularTransform`] for a transform without inverse.
    pub fn add_instance(
        &mut self,
        mesh_index: u32,
        object_to_world: Matrix4,
    ) -> Result<u32, BvhError> {
        if mesh_index as usize >= self.meshes.len() {
            return Err(BvhError::UnknownMesh {
                mesh_index,
                mesh_count: self.meshes.len(),
            });
        }
        self.instances.push(Instance::new(mesh_index, object_to_world)?);
        self.pending = Pending::Rebuild;
        Ok((self.instances.len() - 1) as u32)
    }

    /// Removes an instance. Instances after it move down by one index.
    pub fn remove_instance(&mut self, instance_index: u32) -> Result<Instance, BvhError> {
        self.check_instance(instance_index)?;
        self.pending = Pending::Rebuild;
        Ok(self.instances.remove(instance_index as usize))
    }

    /// Moves an instance.
    pub fn set_transform(
        &mut self,
        instance_index: u32,
        object_to_world: Matrix4,
    ) -> Result<(), BvhError> {
        self.check_instance(instance_index)?;
        let instance = &mut self.instances[instance_index as usize];
        *instance = Instance::new(instance.mesh_index, object_to_world)?;
        self.pending = self.pending.max(Pending::Refit);
        Ok(())
    }

    fn check_instance(&self, instance_index: u32) -> Result<(), BvhError> {
        if instance_index as usize >= self.instances.len() {
            return Err(BvhError::UnknownInstance {
                instance_index: instance_index as usize,
                instance_count: self.instances.len(),
            });
        }
        Ok(())
    }

    /// Brings the top-level tree up to date. Adding or removing instances rebuilds it,
    /// moving instances only refits its boxes.
    pub fn commit(&mut self) -> Result<(), BvhError> {
        if self.pending == Pending::Nothing {
            return Ok(());
        }

        self.instance_aabbs = self
            .instances
            .iter()
            .map(|instance| instance.world_aabb(&self.meshes[instance.mesh_index as usize]))
            .collect();

        if self.pending == Pending::Rebuild {
            let centers: Vec<Point3> = self.instance_aabbs.iter().map(Aabb::center).collect();
            self.tlas = Bvh::build(&self.instance_aabbs, &centers, &self.options)?;
            debug!(
                "Rebuilt top level over {} instances of {} meshes: {} nodes",
                self.instances.len(),
                self.meshes.len(),
                self.tlas.nodes.len()
            );
        } else {
            self.tlas.refit(&self.instance_aabbs);
            debug!("Refitted top level over {} instances", self.instances.len());
        }

        self.pending = Pending::Nothing;
        Ok(())
    }

    /// Finds the closest hit of a world space `ray` over all instances and leaves
    /// `ray.tmax` at its distance. `Hit::instance_index` names the instance and
    /// `Hit::primitive_index` the triangle within its mesh.
    ///
    /// The top level is walked like [`Bvh::intersect`]. At a leaf the ray is moved into
    /// the object space of each instance and the mesh tree is traversed with the shared
    /// `tmax`, which carries over because ray directions are not normalized.
    pub fn intersect(&self, ray: &mut Ray) -> Hit {
        debug_assert!(self.is_committed(), "Scene::commit must run before traversal");

        let mut hit = Hit::default();
        if self.tlas.is_empty() {
            return hit;
        }

        let mut stack = TraversalStack::<u32>::new();
        stack.push(0);
        while let Some(node_index) = stack.pop() {
            let node = &self.tlas.nodes[node_index as usize];
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
                    for &instance_index in &self.tlas.primitive_indices[node.primitives()] {
                        self.intersect_instance(instance_index, ray, &mut hit);
                    }
                }
            }
        }
        hit
    }

    fn intersect_instance(&self, instance_index: u32, ray: &mut Ray, hit: &mut Hit) {
        let instance = &self.instances[instance_index as usize];
        let mesh = &self.meshes[instance.mesh_index as usize];
        let mut local = ray.transformed(&instance.world_to_object);
        let mesh_hit = mesh.intersect(&mut local);
        if mesh_hit.is_hit() {
            ray.tmax = local.tmax;
            *hit = Hit {
                instance_index,
                ..mesh_hit
            };
        }
    }
}
