/// InstanceGenerator - per-instance transforms and colors for one tick.
///
/// Instances are spread along x and bob on a sine wave along y. Each one
/// spins about its own y and z axes and, optionally, the whole group turns
/// about the object pivot. For a unit-cube vertex `v` the composed transform
/// applies, right to left:
///
/// ```text
/// global × translate(object + offset) × yaw(θ) × roll(θ) × scale(s) × v
/// ```
///
/// Output depends only on `(i, K, θ)` and the configuration, so repeated
/// calls are bit-identical.

use std::f32::consts::TAU;
use glam::{Mat4, Vec2, Vec3, Vec4};
use crate::frame::InstanceData;
use crate::math;

/// Placement and animation parameters shared by every instance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstanceConfig {
    /// Uniform scale of each cube
    pub scale: f32,
    /// Pivot the instances are placed around
    pub object_position: Vec3,
    /// Rotate the whole group about the pivot
    pub global_rotation: bool,
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            scale: 0.1,
            object_position: Vec3::new(0.0, 0.0, -5.0),
            global_rotation: true,
        }
    }
}

/// Orbit offset of instance `i` out of `k` at `angle`
///
/// `x = (i/k · 2 − 1) + 1/k`, `y = sin((i/k + angle) · 2π)`.
pub fn orbit_offset(i: usize, k: usize, angle: f32) -> Vec2 {
    let t = i as f32 / k as f32;
    let x = (t * 2.0 - 1.0) + 1.0 / k as f32;
    let y = ((t + angle) * TAU).sin();
    Vec2::new(x, y)
}

/// Color of instance `i` out of `k`: `(i/k, 1 − i/k, sin(2π·i/k), 1)`
pub fn instance_color(i: usize, k: usize) -> Vec4 {
    let t = i as f32 / k as f32;
    Vec4::new(t, 1.0 - t, (TAU * t).sin(), 1.0)
}

pub struct InstanceGenerator {
    config: InstanceConfig,
    instance_count: usize,
}

impl InstanceGenerator {
    pub fn new(config: InstanceConfig, instance_count: usize) -> Self {
        Self { config, instance_count }
    }

    pub fn instance_count(&self) -> usize {
        self.instance_count
    }

    pub fn config(&self) -> &InstanceConfig {
        &self.config
    }

    /// Rotation of the whole group about the pivot, shared by all instances
    pub fn object_transform(&self, angle: f32) -> Mat4 {
        if !self.config.global_rotation {
            return math::make_identity();
        }
        let pivot = self.config.object_position;
        math::make_translate(pivot) * math::make_y_rotate(-angle) * math::make_translate(-pivot)
    }

    /// Record for instance `i` at `angle`
    pub fn generate(&self, i: usize, angle: f32) -> InstanceData {
        self.generate_with(self.object_transform(angle), i, angle)
    }

    /// Records for every instance at `angle`
    pub fn generate_all(&self, angle: f32) -> Vec<InstanceData> {
        let object = self.object_transform(angle);
        (0..self.instance_count)
            .map(|i| self.generate_with(object, i, angle))
            .collect()
    }

    /// Like [`generate`](Self::generate) with a precomputed [`object_transform`](Self::object_transform)
    pub fn generate_with(&self, object: Mat4, i: usize, angle: f32) -> InstanceData {
        let k = self.instance_count;
        let offset = orbit_offset(i, k, angle);
        let position = self.config.object_position + Vec3::new(offset.x, offset.y, 0.0);

        let transform = object
            * math::make_translate(position)
            * math::make_y_rotate(angle)
            * math::make_z_rotate(angle)
            * math::make_scale(Vec3::splat(self.config.scale));

        InstanceData {
            transform,
            color: instance_color(i, k),
        }
    }
}

#[cfg(test)]
#[path = "instances_tests.rs"]
mod tests;
