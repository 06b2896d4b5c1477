//! Common utilities shared by unit tests.
#![cfg(test)]

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::aabb::Aabb;
use crate::bvh::Hit;
use crate::ray::Ray;
use crate::shapes::{Geometry, Intersect, Triangle};
use crate::tlas::Scene;
use crate::{Point3, Real, Vector3, INVALID_INDEX};

/// A vector represented as a tuple
pub type TupleVec = (f32, f32, f32);

/// Generate a `TupleVec` for [`proptest::strategy::Strategy`] from -1e3 to 1e3.
/// Small enough that the intersection kernels stay well inside `f32` precision.
pub fn tuplevec_small_strategy() -> impl Strategy<Value = TupleVec> {
    (-1e3_f32..1e3_f32, -1e3_f32..1e3_f32, -1e3_f32..1e3_f32)
}

/// Convert a `TupleVec` to a [`Point3`].
pub fn tuple_to_point(tpl: &TupleVec) -> Point3 {
    Point3::new(tpl.0, tpl.1, tpl.2)
}

/// The axis aligned unit triangle in the `z = 0` plane.
pub fn unit_triangle() -> Triangle {
    Triangle::new(
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
    )
}

/// Creates a unit size cube centered at `pos` and pushes the triangles to `shapes`.
pub fn push_cube(pos: Point3, shapes: &mut Vec<Triangle>) {
    let top_front_right = pos + Vector3::new(0.5, 0.5, -0.5);
    let top_back_right = pos + Vector3::new(0.5, 0.5, 0.5);
    let top_back_left = pos + Vector3::new(-0.5, 0.5, 0.5);
    let top_front_left = pos + Vector3::new(-0.5, 0.5, -0.5);
    let bottom_front_right = pos + Vector3::new(0.5, -0.5, -0.5);
    let bottom_back_right = pos + Vector3::new(0.5, -0.5, 0.5);
    let bottom_back_left = pos + Vector3::new(-0.5, -0.5, 0.5);
    let bottom_front_left = pos + Vector3::new(-0.5, -0.5, -0.5);

    let faces = [
        (top_back_right, top_front_right, top_front_left),
        (top_front_left, top_back_left, top_back_right),
        (bottom_front_left, bottom_front_right, bottom_back_right),
        (bottom_back_right, bottom_back_left, bottom_front_left),
        (top_back_left, top_front_left, bottom_front_left),
        (bottom_front_left, bottom_back_left, top_back_left),
        (bottom_front_right, top_front_right, top_back_right),
        (top_back_right, bottom_back_right, bottom_front_right),
        (top_front_left, top_front_right, bottom_front_right),
        (bottom_front_right, bottom_front_left, top_front_left),
        (bottom_back_right, top_back_right, top_back_left),
        (top_back_left, bottom_back_left, bottom_back_right),
    ];
    shapes.extend(faces.iter().map(|&(a, b, c)| Triangle::new(a, b, c)));
}

/// Implementation of splitmix64.
/// For reference see: http://xoroshiro.di.unimi.it/splitmix64.c
fn splitmix64(x: &mut u64) -> u64 {
    *x = x.wrapping_add(0x9E3779B97F4A7C15u64);
    let mut z = *x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9u64);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EBu64);
    z ^ (z >> 31)
}

/// Generates a new `i32` triple. Mutates the seed.
pub fn next_point3_raw(seed: &mut u64) -> (i32, i32, i32) {
    let u = splitmix64(seed);
    let a = ((u >> 32) & 0xFFFFFFFF) as i64 - 0x80000000;
    let b = (u & 0xFFFFFFFF) as i64 - 0x80000000;
    let c = a ^ b.rotate_left(6);
    (a as i32, b as i32, c as i32)
}

/// Generates a new `Point3`, which will lie inside the given `aabb`. Mutates the seed.
pub fn next_point3(seed: &mut u64, aabb: &Aabb) -> Point3 {
    let (a, b, c) = next_point3_raw(seed);
    let float_vector = Vector3::new(
        (a as f32 / i32::MAX as f32) + 1.0,
        (b as f32 / i32::MAX as f32) + 1.0,
        (c as f32 / i32::MAX as f32) + 1.0,
    ) * 0.5;

    assert!(float_vector.x >= 0.0 && float_vector.x <= 1.0);
    assert!(float_vector.y >= 0.0 && float_vector.y <= 1.0);
    assert!(float_vector.z >= 0.0 && float_vector.z <= 1.0);

    aabb.min + aabb.size().component_mul(&float_vector)
}

/// Returns an [`Aabb`] which defines the default testing space bounds.
pub fn default_bounds() -> Aabb {
    Aabb::with_bounds(
        Point3::new(-100.0, -100.0, -100.0),
        Point3::new(100.0, 100.0, 100.0),
    )
}

/// Creates `n` deterministic random cubes. Returns the `Vec` of surface `Triangle`s.
pub fn create_n_cubes(n: usize, bounds: &Aabb) -> Vec<Triangle> {
    let mut vec = Vec::new();
    let mut seed = 0;
    for _ in 0..n {
        push_cube(next_point3(&mut seed, bounds), &mut vec);
    }
    vec
}

/// Returns a uniformly distributed point inside `bounds`.
fn random_point(rng: &mut StdRng, bounds: &Aabb) -> Point3 {
    Point3::new(
        rng.random_range(bounds.min.x..=bounds.max.x),
        rng.random_range(bounds.min.y..=bounds.max.y),
        rng.random_range(bounds.min.z..=bounds.max.z),
    )
}

/// Creates a seeded soup of `n` triangles with edges up to `max_edge` long inside `bounds`.
pub fn random_triangles(n: usize, max_edge: Real, bounds: &Aabb, seed: u64) -> Vec<Triangle> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let anchor = random_point(&mut rng, bounds);
            let mut offset = || {
                Vector3::new(
                    rng.random_range(-max_edge..max_edge),
                    rng.random_range(-max_edge..max_edge),
                    rng.random_range(-max_edge..max_edge),
                )
            };
            let (b, c) = (anchor + offset(), anchor + offset());
            Triangle::new(anchor, b, c)
        })
        .collect()
}

/// Creates `n` seeded rays starting inside a box twice as large as `bounds`. Roughly
/// half of them aim at a point inside `bounds`, the others point in a random direction and
/// mostly miss.
pub fn random_rays(n: usize, bounds: &Aabb, seed: u64) -> Vec<Ray> {
    let mut rng = StdRng::seed_from_u64(seed);
    let outer = Aabb::with_bounds(
        bounds.min - bounds.size() * 0.5,
        bounds.max + bounds.size() * 0.5,
    );
    (0..n)
        .map(|_| {
            let origin = random_point(&mut rng, &outer);
            let direction = if rng.random::<bool>() {
                random_point(&mut rng, bounds) - origin
            } else {
                Vector3::new(
                    rng.random_range(-1.0..1.0),
                    rng.random_range(-1.0..1.0),
                    rng.random_range(-1.0..1.0),
                )
            };
            Ray::new(origin, direction)
        })
        .collect()
}

/// A small closed mesh: an octahedron hovering over a ground quad.
const OCTAHEDRON_OBJ: &str = "\
o octahedron_on_ground
v 0.0 2.0 0.0
v 1.0 1.0 0.0
v 0.0 1.0 1.0
v -1.0 1.0 0.0
v 0.0 1.0 -1.0
v 0.0 0.0 0.0
v -4.0 -0.5 -4.0
v 4.0 -0.5 -4.0
v 4.0 -0.5 4.0
v -4.0 -0.5 4.0
f 1 3 2
f 1 4 3
f 1 5 4
f 1 2 5
f 6 2 3
f 6 3 4
f 6 4 5
f 6 5 2
f 7 9 8
f 7 10 9
";

/// Loads the octahedron fixture through `obj-rs` as positions and a `u32` index buffer.
pub fn load_octahedron_scene() -> Geometry {
    let model: obj::Obj<obj::Position, u32> =
        obj::load_obj(OCTAHEDRON_OBJ.as_bytes()).expect("Failed to decode .obj file data.");
    let positions = model
        .vertices
        .iter()
        .map(|vertex| Point3::from(vertex.position))
        .collect::<Vec<_>>();
    Geometry::from_indexed(&positions, &model.indices).expect("Malformed .obj fixture.")
}

/// Asserts that `actual` is the closest hit `expected` of `ray` over `primitives`, which
/// is what both were computed from. The hit primitive must match. A different primitive is
/// accepted only if `ray` hits it at the same distance, which happens where triangles share
/// an edge or overlap.
pub fn assert_same_closest_hit<P: Intersect>(
    ray: &Ray,
    primitives: &[P],
    expected: &Hit,
    actual: &Hit,
) {
    assert_eq!(
        expected.is_hit(),
        actual.is_hit(),
        "expected {:?}, got {:?}",
        expected,
        actual
    );
    assert_eq!(
        expected.instance_index, actual.instance_index,
        "expected {:?}, got {:?}",
        expected, actual
    );
    if !expected.is_hit() {
        assert_eq!(actual.primitive_index, INVALID_INDEX);
        return;
    }
    let tolerance = 1e-4 * expected.t.abs().max(1.0);
    assert!(
        (expected.t - actual.t).abs() <= tolerance,
        "expected {:?}, got {:?}",
        expected,
        actual
    );
    if expected.primitive_index == actual.primitive_index {
        assert!((expected.u - actual.u).abs() <= 1e-4);
        assert!((expected.v - actual.v).abs() <= 1e-4);
        return;
    }

    let unclipped = Ray {
        tmax: Real::INFINITY,
        ..*ray
    };
    let tie = primitives
        .get(actual.primitive_index as usize)
        .and_then(|primitive| primitive.intersect(&unclipped));
    assert!(
        tie.is_some_and(|tie| (tie.t - expected.t).abs() <= tolerance),
        "expected {:?}, got {:?} which is not hit at the same distance",
        expected,
        actual
    );
}

/// All triangles of `scene` moved to world space, and the index of the first triangle of
/// every instance in that array.
pub fn flatten_scene(scene: &Scene) -> (Vec<Triangle>, Vec<u32>) {
    let mut triangles = Vec::new();
    let mut offsets = Vec::new();
    for instance in scene.instances() {
        offsets.push(triangles.len() as u32);
        let to_world = |p: &Point3| instance.object_to_world().transform_point(p);
        for triangle in &scene.meshes()[instance.mesh_index as usize].triangles {
            triangles.push(Triangle::new(
                to_world(&triangle.v0),
                to_world(&triangle.v1),
                to_world(&triangle.v2),
            ));
        }
    }
    (triangles, offsets)
}

/// Maps a two-level hit to the index of its triangle in [`flatten_scene`]'s array.
pub fn flatten_hit(hit: &Hit, offsets: &[u32]) -> Hit {
    if !hit.is_hit() {
        assert_eq!(hit.instance_index, INVALID_INDEX);
        return *hit;
    }
    assert_ne!(hit.instance_index, INVALID_INDEX);
    Hit {
        primitive_index: offsets[hit.instance_index as usize] + hit.primitive_index,
        instance_index: INVALID_INDEX,
        ..*hit
    }
}

mod tests {
    use crate::bvh::{intersect_brute_force, Hit};
    use crate::ray::Ray;
    use crate::shapes::{Intersect, Triangle};
    use crate::testbase::assert_same_closest_hit;
    use crate::{Point3, Vector3};

    /// Two stacked triangles at `z = 0` and `z = -1`, and a third one coplanar with the
    /// first.
    fn stacked() -> Vec<Triangle> {
        let at = |z: f32, dx: f32| {
            Triangle::new(
                Point3::new(dx, 0.0, z),
                Point3::new(dx + 2.0, 0.0, z),
                Point3::new(dx, 2.0, z),
            )
        };
        vec![at(0.0, 0.0), at(-1.0, 0.0), at(0.0, -1.0)]
    }

    fn ray() -> Ray {
        Ray::new(Point3::new(0.25, 0.25, 3.0), Vector3::new(0.0, 0.0, -1.0))
    }

    #[test]
    fn test_same_primitive_is_accepted() {
        let triangles = stacked();
        let expected = intersect_brute_force(&mut ray(), &triangles[..2]);
        assert_same_closest_hit(&ray(), &triangles, &expected, &expected);
    }

    #[test]
    #[should_panic]
    fn test_farther_primitive_is_rejected() {
        let triangles = stacked();
        let expected = intersect_brute_force(&mut ray(), &triangles[..2]);
        assert_eq!(expected.primitive_index, 0);
        // Claims the closest distance but names the triangle behind it.
        let actual = Hit {
            primitive_index: 1,
            ..expected
        };
        assert_same_closest_hit(&ray(), &triangles, &expected, &actual);
    }

    #[test]
    fn test_coplanar_primitive_is_a_tie() {
        let triangles = stacked();
        let expected = intersect_brute_force(&mut ray(), &triangles[..2]);
        let actual = Hit {
            primitive_index: 2,
            ..expected
        };
        assert!(triangles[2].intersect(&ray()).is_some());
        assert_same_closest_hit(&ray(), &triangles, &expected, &actual);
    }

    #[test]
    #[should_panic]
    fn test_wrong_instance_is_rejected() {
        let triangles = stacked();
        let expected = intersect_brute_force(&mut ray(), &triangles);
        let actual = Hit {
            instance_index: 3,
            ..expected
        };
        assert_same_closest_hit(&ray(), &triangles, &expected, &actual);
    }
}
