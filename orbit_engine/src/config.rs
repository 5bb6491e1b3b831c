/// PipelineConfig - construction-time parameters of a frame pipeline.
///
/// `Default` reproduces the reference scene: 32 cubes, triple buffering,
/// depth test Less with writes, back faces culled, CCW front faces.

use std::time::Duration;
use glam::Vec3;
use crate::animation::{InstanceConfig, DEFAULT_ANGLE_STEP};
use crate::camera::CameraConfig;
use crate::error::{Error, Result};
use crate::frame::INSTANCE_STRIDE;
use crate::graphics_device::{CullMode, DepthState, FrontFace};

/// Upper bound on frames in flight
pub const MAX_FRAMES_IN_FLIGHT: usize = 16;

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Number of cube instances drawn per frame
    pub instance_count: usize,
    /// Ring depth and admission capacity
    pub frames_in_flight: usize,
    pub depth: DepthState,
    pub cull_mode: CullMode,
    pub front_face: FrontFace,
    /// Admission wait bound; `None` blocks indefinitely
    pub acquire_timeout: Option<Duration>,
    /// Radians added to the animation angle per tick
    pub angle_step: f32,
    pub instances: InstanceConfig,
    pub camera: CameraConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            instance_count: 32,
            frames_in_flight: 3,
            depth: DepthState::default(),
            cull_mode: CullMode::Back,
            front_face: FrontFace::CounterClockwise,
            acquire_timeout: None,
            angle_step: DEFAULT_ANGLE_STEP,
            instances: InstanceConfig::default(),
            camera: CameraConfig::default(),
        }
    }
}

impl PipelineConfig {
    // ===== BUILDERS =====

    pub fn with_instance_count(mut self, count: usize) -> Self {
        self.instance_count = count;
        self
    }

    pub fn with_frames_in_flight(mut self, frames: usize) -> Self {
        self.frames_in_flight = frames;
        self
    }

    pub fn with_depth(mut self, depth: DepthState) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_cull_mode(mut self, mode: CullMode) -> Self {
        self.cull_mode = mode;
        self
    }

    pub fn with_front_face(mut self, face: FrontFace) -> Self {
        self.front_face = face;
        self
    }

    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = Some(timeout);
        self
    }

    pub fn with_angle_step(mut self, step: f32) -> Self {
        self.angle_step = step;
        self
    }

    pub fn with_instance_scale(mut self, scale: f32) -> Self {
        self.instances.scale = scale;
        self
    }

    pub fn with_object_position(mut self, position: Vec3) -> Self {
        self.instances.object_position = position;
        self
    }

    pub fn with_global_rotation(mut self, enabled: bool) -> Self {
        self.instances.global_rotation = enabled;
        self
    }

    pub fn with_camera(mut self, camera: CameraConfig) -> Self {
        self.camera = camera;
        self
    }

    // ===== VALIDATION =====

    /// Reject configurations the pipeline cannot be built from
    pub fn validate(&self) -> Result<()> {
        if self.instance_count == 0 {
            return Err(invalid("instance_count must be at least 1"));
        }
        if u32::try_from(self.instance_count).is_err() {
            return Err(invalid("instance_count does not fit a draw call"));
        }
        if self.frames_in_flight == 0 || self.frames_in_flight > MAX_FRAMES_IN_FLIGHT {
            return Err(Error::InitializationFailed(format!(
                "frames_in_flight must be in 1..={} (got {})",
                MAX_FRAMES_IN_FLIGHT, self.frames_in_flight
            )));
        }
        let records = self.instance_count.checked_mul(self.frames_in_flight);
        if records.and_then(|r| r.checked_mul(INSTANCE_STRIDE as usize)).is_none() {
            return Err(invalid("instance buffer size overflows"));
        }
        if !self.angle_step.is_finite() {
            return Err(invalid("angle_step must be finite"));
        }
        if !self.instances.scale.is_finite() {
            return Err(invalid("instance scale must be finite"));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> Error {
    Error::InitializationFailed(message.to_string())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
