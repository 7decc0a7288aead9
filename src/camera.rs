use glam::{EulerRot, Mat3, Quat, Vec3};
use winit::dpi::PhysicalSize;

/// Perspective camera looking down its local -Z axis with +Y up.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub rotation: Quat,
    pub projection: Projection,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    /// vertical field of view in degrees
    pub fov_y_deg: f32,
    pub aspect: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            fov_y_deg: 60.0,
            aspect: 16.0 / 9.0,
            z_near: 0.1,
            z_far: 2000.0,
        }
    }
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        let mut camera = Camera {
            position: Vec3::new(0.0, 2.0, 10.0),
            rotation: Quat::IDENTITY,
            projection: Projection::default(),
        };
        camera.resize(PhysicalSize::new(width, height));
        camera
    }

    /// Keeps the aspect ratio in sync with the surface. Zero sized surfaces (minimized windows) are ignored.
    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        self.projection.aspect = size.width as f32 / size.height as f32;
    }

    #[inline]
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    #[inline]
    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    /// Orientation from yaw about world-up followed by pitch about the rotated right axis (YXZ order, no roll).
    pub fn set_yaw_pitch(&mut self, yaw: f32, pitch: f32) {
        self.rotation = Quat::from_euler(EulerRot::YXZ, yaw, pitch, 0.0);
    }

    /// Inverse of [`Camera::set_yaw_pitch`]: decomposes the current rotation in YXZ order.
    pub fn yaw_pitch(&self) -> (f32, f32) {
        let (yaw, pitch, _roll) = self.rotation.to_euler(EulerRot::YXZ);
        (yaw, pitch)
    }

    /// Turns the camera so that its -Z axis points at `target`.
    ///
    /// Nothing happens if `target` coincides with the camera position. Looking straight up or down keeps the current yaw.
    pub fn look_at(&mut self, target: Vec3) {
        let Some(forward) = (target - self.position).try_normalize() else {
            return;
        };
        let right = match forward.cross(Vec3::Y).try_normalize() {
            Some(right) => right,
            None => {
                let (yaw, _) = self.yaw_pitch();
                let pitch = if forward.y > 0.0 {
                    std::f32::consts::FRAC_PI_2
                } else {
                    -std::f32::consts::FRAC_PI_2
                };
                self.set_yaw_pitch(yaw, pitch);
                return;
            }
        };
        let up = right.cross(forward);
        self.rotation = Quat::from_mat3(&Mat3::from_cols(right, up, -forward)).normalize();
    }
}

#[cfg(test)]
mod tests {
    use glam::{vec3, Vec3};
    use winit::dpi::PhysicalSize;

    use super::Camera;

    #[test]
    fn look_at_points_forward_at_target() {
        let mut camera = Camera::new(1600, 900);
        camera.position = vec3(3.0, 4.0, -2.0);
        let target = vec3(-1.0, 0.5, 7.0);
        camera.look_at(target);
        let expected = (target - camera.position).normalize();
        assert!((camera.forward() - expected).length() < 1e-5);
        assert!(camera.right().y.abs() < 1e-5, "look_at must not roll");
    }

    #[test]
    fn yaw_pitch_round_trips_through_look_at() {
        let mut camera = Camera::new(800, 600);
        camera.position = vec3(0.0, 6.0, 15.0);
        camera.look_at(Vec3::ZERO);
        let (yaw, pitch) = camera.yaw_pitch();
        assert!(yaw.abs() < 1e-5);
        assert!((pitch + (6.0f32 / 15.0).atan()).abs() < 1e-5);

        let before = camera.forward();
        camera.set_yaw_pitch(yaw, pitch);
        assert!((camera.forward() - before).length() < 1e-5);
    }

    #[test]
    fn zero_sized_resize_is_ignored() {
        let mut camera = Camera::new(1000, 500);
        camera.resize(PhysicalSize::new(0, 0));
        assert_eq!(camera.projection.aspect, 2.0);
    }
}
