#![no_main]
use std::fmt::{self, Debug, Formatter};

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use nalgebra::{Matrix4, Point3, Vector3};
use ordered_float::NotNan;
use photon_bvh::bvh::{intersect_brute_force, BuildOptions, Bvh, Hit, ObjectSplitSearch};
use photon_bvh::cbvh::CompressedBvh;
use photon_bvh::ray::Ray;
use photon_bvh::shapes::{Geometry, Triangle};
use photon_bvh::tlas::{Mesh, Scene};

type Float = f32;
const LIMIT: Float = 1_000.0;

fuzz_target!(|workload: Workload| {
    workload.fuzz();
});

#[derive(Arbitrary)]
struct ArbitraryPoint {
    coordinates: [NotNan<Float>; 3],
}

impl ArbitraryPoint {
    fn point(&self) -> Point3<Float> {
        Point3::from_slice(&self.coordinates.map(|f| f.into_inner().clamp(-LIMIT, LIMIT)))
    }
}

#[derive(Arbitrary)]
struct ArbitraryTriangle {
    a: ArbitraryPoint,
    b: ArbitraryPoint,
    c: ArbitraryPoint,
}

impl Debug for ArbitraryTriangle {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        Debug::fmt(&self.triangle(), f)
    }
}

impl ArbitraryTriangle {
    fn triangle(&self) -> Triangle {
        Triangle::new(self.a.point(), self.b.point(), self.c.point())
    }
}

#[derive(Arbitrary)]
struct ArbitraryRay {
    origin: ArbitraryPoint,
    destination: ArbitraryPoint,
}

impl Debug for ArbitraryRay {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        Debug::fmt(&self.ray(), f)
    }
}

impl ArbitraryRay {
    fn ray(&self) -> Ray {
        let mut direction = self.destination.point() - self.origin.point();
        // Ensure no degenerate direction.
        if direction.norm() < 1e-3 {
            direction = Vector3::new(1.0, 1.0, 1.0);
        }
        Ray::new(self.origin.point(), direction)
    }
}

#[derive(Debug, Arbitrary)]
struct ArbitraryOptions {
    max_primitive_count: u8,
    median: bool,
    samples: u8,
}

impl ArbitraryOptions {
    fn options(&self) -> BuildOptions {
        BuildOptions {
            max_primitive_count: (self.max_primitive_count % 16).max(1) as u32,
            object_split_search: if self.median {
                ObjectSplitSearch::Median
            } else {
                ObjectSplitSearch::BinnedSah
            },
            samples: (self.samples % 32).max(2) as u32,
            ..BuildOptions::default()
        }
    }
}

#[derive(Debug, Arbitrary)]
enum ArbitraryMutation {
    Add(ArbitraryPoint),
    Move(usize, ArbitraryPoint),
    Remove(usize),
}

#[derive(Debug, Arbitrary)]
struct Workload {
    triangles: Vec<ArbitraryTriangle>,
    options: ArbitraryOptions,
    ray: ArbitraryRay,
    mutations: Vec<ArbitraryMutation>,
}

/// Hits of different traversals may pick different triangles at the same distance.
fn assert_same_distance(expected: &Hit, actual: &Hit) {
    assert_eq!(expected.is_hit(), actual.is_hit(), "{expected:?} vs {actual:?}");
    if expected.is_hit() {
        let tolerance = 1e-4 * expected.t.abs().max(1.0);
        assert!((expected.t - actual.t).abs() <= tolerance, "{expected:?} vs {actual:?}");
    }
}

impl Workload {
    fn fuzz(self) {
        if self.triangles.len() > 256 || self.mutations.len() > 16 {
            return;
        }
        let triangles: Vec<Triangle> = self.triangles.iter().map(ArbitraryTriangle::triangle).collect();
        let geometry = Geometry::from_triangles(triangles);
        let options = self.options.options();
        let bvh = Bvh::build(&geometry.aabbs, &geometry.centers, &options).unwrap();
        bvh.validate(&geometry.aabbs).unwrap();

        let ray = self.ray.ray();
        let expected = intersect_brute_force(&mut ray.clone(), &geometry.triangles);
        assert_same_distance(&expected, &bvh.intersect(&mut ray.clone(), &geometry.triangles));
        assert_same_distance(&expected, &bvh.intersect_ordered(&mut ray.clone(), &geometry.triangles));

        let compressed = CompressedBvh::<u8>::compress(&bvh).unwrap();
        assert_same_distance(&expected, &compressed.intersect(&mut ray.clone(), &geometry.triangles));

        self.fuzz_scene(geometry, &options, &ray);
    }

    /// Instances the soup under a series of translations and compares the scene with the
    /// translated soups after every commit.
    fn fuzz_scene(&self, geometry: Geometry, options: &BuildOptions, ray: &Ray) {
        let triangles = geometry.triangles.clone();
        let mut scene = Scene::new();
        let mesh = scene.add_mesh(Mesh::new(geometry, options).unwrap());
        let mut offsets: Vec<Vector3<Float>> = vec![Vector3::zeros()];
        scene.add_instance(mesh, Matrix4::identity()).unwrap();

        for mutation in &self.mutations {
            match mutation {
                ArbitraryMutation::Add(point) => {
                    let offset = point.point().coords;
                    scene.add_instance(mesh, Matrix4::new_translation(&offset)).unwrap();
                    offsets.push(offset);
                }
                ArbitraryMutation::Move(index, point) => {
                    if *index < offsets.len() {
                        let offset = point.point().coords;
                        scene.set_transform(*index as u32, Matrix4::new_translation(&offset)).unwrap();
                        offsets[*index] = offset;
                    }
                }
                ArbitraryMutation::Remove(index) => {
                    if *index < offsets.len() {
                        scene.remove_instance(*index as u32).unwrap();
                        offsets.remove(*index);
                    }
                }
            }
            scene.commit().unwrap();
            scene.tlas().validate(scene.instance_aabbs()).unwrap();

            let flattened: Vec<Triangle> = offsets
                .iter()
                .flat_map(|offset| {
                    triangles
                        .iter()
                        .map(move |t| Triangle::new(t.v0 + offset, t.v1 + offset, t.v2 + offset))
                })
                .collect();
            let expected = intersect_brute_force(&mut ray.clone(), &flattened);
            assert_same_distance(&expected, &scene.intersect(&mut ray.clone()));
        }
    }
}
