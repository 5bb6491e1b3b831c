//! Versioned GPU wire layout
//!
//! Records are serialised field by field: little-endian `f32`, matrices in
//! column-major order. The offsets below are the contract with the shader
//! side and change only together with [`LAYOUT_VERSION`].

use glam::{Mat4, Vec4};
use crate::error::{Error, Result};

/// Wire layout version shared with the shaders
pub const LAYOUT_VERSION: u32 = 1;

/// Size of one serialised [`InstanceData`]
pub const INSTANCE_STRIDE: u64 = 80;
/// Byte offset of `InstanceData::transform`
pub const INSTANCE_TRANSFORM_OFFSET: usize = 0;
/// Byte offset of `InstanceData::color`
pub const INSTANCE_COLOR_OFFSET: usize = 64;

/// Size of one serialised [`CameraData`]
pub const CAMERA_SIZE: u64 = 128;
/// Byte offset of `CameraData::projection`
pub const CAMERA_PROJECTION_OFFSET: usize = 0;
/// Byte offset of `CameraData::world`
pub const CAMERA_WORLD_OFFSET: usize = 64;

/// Size of one serialised [`ArgumentEntry`]
pub const ARGUMENT_ENTRY_STRIDE: u64 = 16;

/// Per-instance record consumed by the vertex stage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstanceData {
    /// Model transform
    pub transform: Mat4,
    /// RGBA color
    pub color: Vec4,
}

impl InstanceData {
    pub fn encode(&self) -> [u8; INSTANCE_STRIDE as usize] {
        let mut out = [0u8; INSTANCE_STRIDE as usize];
        put_mat4(&mut out[INSTANCE_TRANSFORM_OFFSET..], &self.transform);
        put_vec4(&mut out[INSTANCE_COLOR_OFFSET..], self.color);
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        check_len(bytes, INSTANCE_STRIDE)?;
        Ok(Self {
            transform: get_mat4(&bytes[INSTANCE_TRANSFORM_OFFSET..]),
            color: get_vec4(&bytes[INSTANCE_COLOR_OFFSET..]),
        })
    }
}

/// Per-frame camera record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraData {
    /// Projection matrix
    pub projection: Mat4,
    /// World (view) transform
    pub world: Mat4,
}

impl CameraData {
    pub fn encode(&self) -> [u8; CAMERA_SIZE as usize] {
        let mut out = [0u8; CAMERA_SIZE as usize];
        put_mat4(&mut out[CAMERA_PROJECTION_OFFSET..], &self.projection);
        put_mat4(&mut out[CAMERA_WORLD_OFFSET..], &self.world);
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        check_len(bytes, CAMERA_SIZE)?;
        Ok(Self {
            projection: get_mat4(&bytes[CAMERA_PROJECTION_OFFSET..]),
            world: get_mat4(&bytes[CAMERA_WORLD_OFFSET..]),
        })
    }
}

/// One argument-table entry: a GPU address plus byte offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArgumentEntry {
    pub gpu_address: u64,
    pub offset: u64,
}

impl ArgumentEntry {
    pub fn encode(&self) -> [u8; ARGUMENT_ENTRY_STRIDE as usize] {
        let mut out = [0u8; ARGUMENT_ENTRY_STRIDE as usize];
        out[0..8].copy_from_slice(&self.gpu_address.to_le_bytes());
        out[8..16].copy_from_slice(&self.offset.to_le_bytes());
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        check_len(bytes, ARGUMENT_ENTRY_STRIDE)?;
        let mut word = [0u8; 8];
        word.copy_from_slice(&bytes[0..8]);
        let gpu_address = u64::from_le_bytes(word);
        word.copy_from_slice(&bytes[8..16]);
        Ok(Self { gpu_address, offset: u64::from_le_bytes(word) })
    }
}

/// Append little-endian `f32`s to `out`
pub fn put_f32s(out: &mut Vec<u8>, values: &[f32]) {
    for v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
}

fn check_len(bytes: &[u8], expected: u64) -> Result<()> {
    if (bytes.len() as u64) < expected {
        return Err(Error::OutOfBounds { index: expected, len: bytes.len() as u64 });
    }
    Ok(())
}

fn put_mat4(out: &mut [u8], m: &Mat4) {
    for (i, v) in m.to_cols_array().iter().enumerate() {
        out[i * 4..i * 4 + 4].copy_from_slice(&v.to_le_bytes());
    }
}

fn put_vec4(out: &mut [u8], v: Vec4) {
    for (i, c) in v.to_array().iter().enumerate() {
        out[i * 4..i * 4 + 4].copy_from_slice(&c.to_le_bytes());
    }
}

fn get_f32(bytes: &[u8], at: usize) -> f32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[at..at + 4]);
    f32::from_le_bytes(word)
}

fn get_mat4(bytes: &[u8]) -> Mat4 {
    let mut cols = [0.0f32; 16];
    for (i, c) in cols.iter_mut().enumerate() {
        *c = get_f32(bytes, i * 4);
    }
    Mat4::from_cols_array(&cols)
}

fn get_vec4(bytes: &[u8]) -> Vec4 {
    Vec4::new(get_f32(bytes, 0), get_f32(bytes, 4), get_f32(bytes, 8), get_f32(bytes, 12))
}

#[cfg(test)]
#[path = "layout_tests.rs"]
mod tests;
