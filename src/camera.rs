//! Primary ray generation.

use nalgebra::Vector4;

use crate::ray::Ray;
use crate::{Matrix4, Point3, Real, Vector3};

/// A pinhole camera looking from `from` at `at`. The image plane passes through `at`,
/// pixel `(0, 0)` is the upper left corner and `y` grows downwards.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera {
    pub width: u32,
    pub height: u32,
    /// Vertical field of view in degrees.
    pub vfov: Real,
    pub from: Point3,
    pub at: Point3,
    pub up: Vector3,
    pixel_00: Point3,
    pixel_delta_u: Vector3,
    pixel_delta_v: Vector3,
}

impl Camera {
    /// Creates a camera for a `width` x `height` image.
    ///
    /// # Examples
    /// ```
    /// use photon_bvh::camera::Camera;
    /// use photon_bvh::{Point3, Vector3};
    ///
    /// let camera = Camera::new(
    ///     3,
    ///     3,
    ///     60.0,
    ///     Point3::new(0.0, 0.0, 5.0),
    ///     Point3::new(0.0, 0.0, 0.0),
    ///     Vector3::y(),
    /// );
    /// let ray = camera.ray_gen(1, 1);
    /// assert_eq!(ray.origin, Point3::new(0.0, 0.0, 5.0));
    /// assert!((ray.direction - Vector3::new(0.0, 0.0, -5.0)).norm() < 1e-5);
    /// ```
    pub fn new(
        width: u32,
        height: u32,
        vfov: Real,
        from: Point3,
        at: Point3,
        up: Vector3,
    ) -> Camera {
        let aspect_ratio = width as Real / height as Real;
        let focal_length = (from - at).norm();
        let viewport_height = 2.0 * (vfov.to_radians() / 2.0).tan() * focal_length;
        let viewport_width = viewport_height * aspect_ratio;

        let w = (from - at).normalize();
        let u = up.cross(&w).normalize();
        let v = w.cross(&u);

        let viewport_u = u * viewport_width;
        let viewport_v = -v * viewport_height;
        let pixel_delta_u = viewport_u / width as Real;
        let pixel_delta_v = viewport_v / height as Real;

        let upper_left = from - w * focal_length - viewport_u / 2.0 - viewport_v / 2.0;
        Camera {
            width,
            height,
            vfov,
            from,
            at,
            up,
            pixel_00: upper_left + (pixel_delta_u + pixel_delta_v) * 0.5,
            pixel_delta_u,
            pixel_delta_v,
        }
    }

    /// The ray through the center of pixel `(x, y)`. Its direction reaches the image plane
    /// at `t = 1` and is not normalized.
    pub fn ray_gen(&self, x: u32, y: u32) -> Ray {
        let pixel_center =
            self.pixel_00 + self.pixel_delta_u * x as Real + self.pixel_delta_v * y as Real;
        Ray::new(self.from, pixel_center - self.from)
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Normalized device coordinates of the center of pixel `(x, y)`, `y` pointing up.
pub fn pixel_to_ndc(x: u32, y: u32, width: u32, height: u32) -> [Real; 2] {
    [
        (x as Real + 0.5) / width as Real * 2.0 - 1.0,
        1.0 - (y as Real + 0.5) / height as Real * 2.0,
    ]
}

/// Unprojects `ndc` through engine style inverse projection and view matrices. The ray
/// starts at the eye and its direction has unit length.
pub fn ray_from_matrices(ndc: [Real; 2], inv_projection: &Matrix4, inv_view: &Matrix4) -> Ray {
    let target = inv_projection * Vector4::new(ndc[0], ndc[1], 1.0, 1.0);
    let eye_direction = (target.xyz() / target.w).normalize();
    let origin = inv_view.transform_point(&Point3::origin());
    let direction = inv_view.transform_vector(&eye_direction).normalize();
    Ray::new(origin, direction)
}

#[cfg(test)]
mod tests {
    use float_eq::assert_float_eq;

    use crate::camera::{pixel_to_ndc, ray_from_matrices, Camera};
    use crate::{Matrix4, Point3, Vector3};

    fn camera(width: u32, height: u32) -> Camera {
        Camera::new(
            width,
            height,
            90.0,
            Point3::new(1.0, 2.0, 3.0),
            Point3::new(1.0, 2.0, -1.0),
            Vector3::y(),
        )
    }

    #[test]
    fn test_center_pixel_looks_at_target() {
        let camera = camera(5, 5);
        let ray = camera.ray_gen(2, 2);
        assert_eq!(ray.origin, camera.from);
        let on_plane = ray.at(1.0);
        assert_float_eq!(on_plane.x, 1.0, abs <= 1e-5);
        assert_float_eq!(on_plane.y, 2.0, abs <= 1e-5);
        assert_float_eq!(on_plane.z, -1.0, abs <= 1e-5);
    }

    #[test]
    fn test_pixel_orientation() {
        let camera = camera(4, 2);
        let upper_left = camera.ray_gen(0, 0).direction;
        let lower_right = camera.ray_gen(3, 1).direction;
        assert!(upper_left.x < 0.0 && upper_left.y > 0.0);
        assert!(lower_right.x > 0.0 && lower_right.y < 0.0);
        assert_float_eq!(upper_left.x, -lower_right.x, abs <= 1e-5);
        assert_float_eq!(upper_left.y, -lower_right.y, abs <= 1e-5);
    }

    #[test]
    fn test_field_of_view() {
        // 90 degrees at focal length 4 spans [-4, 4] vertically, the aspect ratio
        // stretches that to [-8, 8] horizontally.
        let camera = camera(8, 4);
        let top = camera.ray_gen(0, 0).at(1.0);
        assert_float_eq!(top.y - 2.0, 3.0, abs <= 1e-5);
        assert_float_eq!(top.x - 1.0, -7.0, abs <= 1e-5);
    }

    #[test]
    fn test_pixel_to_ndc() {
        assert_eq!(pixel_to_ndc(0, 0, 2, 2), [-0.5, 0.5]);
        assert_eq!(pixel_to_ndc(1, 1, 2, 2), [0.5, -0.5]);
    }

    #[test]
    fn test_ray_from_matrices_matches_look_at() {
        let eye = Point3::new(1.0, 2.0, 3.0);
        let target = Point3::new(1.0, 2.0, -1.0);
        let projection = Matrix4::new_perspective(2.0, 90f32.to_radians(), 0.1, 100.0);
        let view = Matrix4::look_at_rh(&eye, &target, &Vector3::y());
        let inv_projection = projection.try_inverse().unwrap();
        let inv_view = view.try_inverse().unwrap();

        let camera = camera(8, 4);
        for (x, y) in [(0, 0), (3, 1), (7, 3)] {
            let expected = camera.ray_gen(x, y);
            let actual = ray_from_matrices(pixel_to_ndc(x, y, 8, 4), &inv_projection, &inv_view);
            let expected_direction = expected.direction.normalize();
            for axis in 0..3 {
                assert_float_eq!(actual.origin[axis], eye[axis], abs <= 1e-4);
                assert_float_eq!(actual.direction[axis], expected_direction[axis], abs <= 1e-4);
            }
        }
    }
}
