/// CameraConfig - projection parameters plus a world transform.
///
/// Refreshed into the claimed frame slot once per tick. Degenerate inputs
/// (`near == far`, zero field of view) produce a non-invertible projection
/// and are the caller's responsibility.

use glam::Mat4;
use crate::frame::CameraData;
use crate::math;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraConfig {
    /// Vertical field of view in radians
    pub fov_y_radians: f32,
    /// Width over height
    pub aspect: f32,
    /// Near clip distance
    pub near: f32,
    /// Far clip distance
    pub far: f32,
    /// World (view) transform written next to the projection
    pub world: Mat4,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_y_radians: 45.0f32.to_radians(),
            aspect: 1.0,
            near: 0.03,
            far: 500.0,
            world: math::make_identity(),
        }
    }
}

impl CameraConfig {
    pub fn new(fov_y_radians: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            fov_y_radians,
            aspect,
            near,
            far,
            world: math::make_identity(),
        }
    }

    // ===== BUILDERS =====

    pub fn with_world(mut self, world: Mat4) -> Self {
        self.world = world;
        self
    }

    pub fn with_aspect(mut self, aspect: f32) -> Self {
        self.aspect = aspect;
        self
    }

    // ===== MATRICES =====

    /// Projection matrix (right-handed perspective)
    pub fn projection(&self) -> Mat4 {
        math::make_perspective(self.fov_y_radians, self.aspect, self.near, self.far)
    }

    /// Record written into the frame slot's camera buffer
    pub fn camera_data(&self) -> CameraData {
        CameraData {
            projection: self.projection(),
            world: self.world,
        }
    }
}

#[cfg(test)]
#[path = "camera_tests.rs"]
mod tests;
