//! One closest-hit query per pixel, on the CPU.

use log::trace;
#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::bvh::Hit;
use crate::camera::Camera;
use crate::tlas::Scene;

/// Traces the primary ray of every pixel of `camera` through `scene`. Hits are returned
/// row-major, `hits[y * width + x]`.
///
/// # Examples
/// ```
/// use photon_bvh::bvh::BuildOptions;
/// use photon_bvh::camera::Camera;
/// use photon_bvh::render::trace_hits;
/// use photon_bvh::tlas::{Mesh, Scene};
/// use photon_bvh::{Matrix4, Point3, Vector3};
///
/// let positions = [
///     Point3::new(-1.0, -1.0, 0.0),
///     Point3::new(1.0, -1.0, 0.0),
///     Point3::new(0.0, 1.0, 0.0),
/// ];
/// let mut scene = Scene::new();
/// let mesh = scene.add_mesh(Mesh::from_indexed(&positions, &[0, 1, 2], &BuildOptions::default()).unwrap());
/// scene.add_instance(mesh, Matrix4::identity()).unwrap();
/// scene.commit().unwrap();
///
/// let camera = Camera::new(4, 4, 90.0, Point3::new(0.0, 0.0, 1.0), Point3::origin(), Vector3::y());
/// let hits = trace_hits(&camera, &scene);
/// assert_eq!(hits.len(), 16);
/// assert!(hits[2 * 4 + 2].is_hit());
/// assert!(!hits[0].is_hit());
/// ```
pub fn trace_hits(camera: &Camera, scene: &Scene) -> Vec<Hit> {
    let width = camera.width as usize;
    let trace_pixel = |pixel: usize| {
        let mut ray = camera.ray_gen((pixel % width) as u32, (pixel / width) as u32);
        scene.intersect(&mut ray)
    };

    #[cfg(feature = "rayon")]
    let hits: Vec<Hit> = (0..camera.pixel_count())
        .into_par_iter()
        .map(trace_pixel)
        .collect();

    #[cfg(not(feature = "rayon"))]
    let hits: Vec<Hit> = (0..camera.pixel_count()).map(trace_pixel).collect();

    trace!(
        "Traced {}x{} pixels, {} hits",
        camera.width,
        camera.height,
        hits.iter().filter(|hit| hit.is_hit()).count()
    );
    hits
}

/// False color of a hit, stable per instance and primitive. Misses are black.
pub fn debug_color(hit: &Hit) -> [u8; 3] {
    if !hit.is_hit() {
        return [0, 0, 0];
    }
    let mut x = hit.primitive_index.wrapping_mul(0x9e37_79b9) ^ hit.instance_index.rotate_left(16);
    x ^= x >> 15;
    x = x.wrapping_mul(0x2c1b_3c6d);
    x ^= x >> 12;
    // Keep every channel away from black.
    let channel = |shift: u32| 64 + ((x >> shift) & 0xff) as u8 % 192;
    [channel(0), channel(8), channel(16)]
}

#[cfg(test)]
mod tests {
    use crate::bvh::{BuildOptions, Hit};
    use crate::camera::Camera;
    use crate::render::{debug_color, trace_hits};
    use crate::testbase::load_octahedron_scene;
    use crate::tlas::{Mesh, Scene};
    use crate::{Matrix4, Point3, Vector3, INVALID_INDEX};

    fn octahedron_scene() -> Scene {
        let mut scene = Scene::new();
        let mesh = scene.add_mesh(Mesh::new(load_octahedron_scene(), &BuildOptions::default()).unwrap());
        scene.add_instance(mesh, Matrix4::identity()).unwrap();
        scene
            .add_instance(mesh, Matrix4::new_translation(&Vector3::new(3.0, 0.0, 0.0)))
            .unwrap();
        scene.commit().unwrap();
        scene
    }

    #[test]
    fn test_trace_hits_is_row_major() {
        let scene = octahedron_scene();
        let camera = Camera::new(
            16,
            9,
            50.0,
            Point3::new(1.5, 3.0, 10.0),
            Point3::new(1.5, 1.0, 0.0),
            Vector3::y(),
        );
        let hits = trace_hits(&camera, &scene);
        assert_eq!(hits.len(), 16 * 9);
        for y in 0..camera.height {
            for x in 0..camera.width {
                let mut ray = camera.ray_gen(x, y);
                let expected = scene.intersect(&mut ray);
                assert_eq!(hits[(y * camera.width + x) as usize], expected);
            }
        }
        assert!(hits.iter().any(|hit| hit.instance_index == 0));
        assert!(hits.iter().any(|hit| hit.instance_index == 1));
    }

    #[test]
    fn test_debug_color() {
        assert_eq!(debug_color(&Hit::default()), [0, 0, 0]);
        let hit = |primitive_index, instance_index| Hit {
            primitive_index,
            instance_index,
            t: 1.0,
            ..Hit::default()
        };
        let color = debug_color(&hit(3, INVALID_INDEX));
        assert!(color.iter().all(|&channel| channel >= 64));
        assert_eq!(color, debug_color(&hit(3, INVALID_INDEX)));
        assert_ne!(debug_color(&hit(3, 0)), debug_color(&hit(4, 0)));
    }
}
