//! Procedural unit cube
//!
//! 8 corners at ±0.5, 12 counter-clockwise triangles wound outward. Each
//! corner's color is its position shifted into `[0, 1]`. Positions and
//! colors are stored as 16-byte records (xyz + pad, rgba) and indices as
//! `u16`.

use std::sync::Arc;
use glam::{Vec3, Vec4};
use crate::error::Result;
use crate::frame::layout::put_f32s;
use crate::graphics_device::{Buffer, BufferDesc, BufferUsage, GraphicsDevice, IndexType};
use crate::engine_debug;

/// Corner count
pub const CUBE_VERTEX_COUNT: usize = 8;
/// Index count (6 faces × 2 triangles × 3)
pub const CUBE_INDEX_COUNT: u32 = 36;
/// Stride of one position or color record
pub const VERTEX_STRIDE: u64 = 16;

const HALF: f32 = 0.5;

const CUBE_INDICES: [u16; CUBE_INDEX_COUNT as usize] = [
    0, 1, 2, 2, 3, 0, // front
    1, 7, 6, 6, 2, 1, // right
    7, 4, 5, 5, 6, 7, // back
    4, 0, 3, 3, 5, 4, // left
    3, 2, 6, 6, 5, 3, // top
    4, 7, 1, 1, 0, 4, // bottom
];

pub fn cube_positions() -> [Vec3; CUBE_VERTEX_COUNT] {
    [
        Vec3::new(-HALF, -HALF, HALF),
        Vec3::new(HALF, -HALF, HALF),
        Vec3::new(HALF, HALF, HALF),
        Vec3::new(-HALF, HALF, HALF),
        Vec3::new(-HALF, -HALF, -HALF),
        Vec3::new(-HALF, HALF, -HALF),
        Vec3::new(HALF, HALF, -HALF),
        Vec3::new(HALF, -HALF, -HALF),
    ]
}

pub fn cube_colors() -> [Vec4; CUBE_VERTEX_COUNT] {
    cube_positions().map(|p| (p + Vec3::splat(HALF)).extend(1.0))
}

pub fn cube_indices() -> &'static [u16] {
    &CUBE_INDICES
}

/// Cube buffers uploaded once and shared read-only afterwards
pub struct CubeGeometry {
    positions: Arc<dyn Buffer>,
    colors: Arc<dyn Buffer>,
    indices: Arc<dyn Buffer>,
}

impl CubeGeometry {
    /// Create, fill and flush the three host-visible buffers
    pub fn upload<D: GraphicsDevice>(device: &mut D) -> Result<Self> {
        let mut position_bytes = Vec::with_capacity(CUBE_VERTEX_COUNT * VERTEX_STRIDE as usize);
        for p in cube_positions() {
            put_f32s(&mut position_bytes, &[p.x, p.y, p.z, 0.0]);
        }

        let mut color_bytes = Vec::with_capacity(CUBE_VERTEX_COUNT * VERTEX_STRIDE as usize);
        for c in cube_colors() {
            put_f32s(&mut color_bytes, &c.to_array());
        }

        let index_bytes: Vec<u8> = CUBE_INDICES.iter().flat_map(|i| i.to_le_bytes()).collect();

        let positions = upload(device, "cube_positions", BufferUsage::Vertex, &position_bytes)?;
        let colors = upload(device, "cube_colors", BufferUsage::Vertex, &color_bytes)?;
        let indices = upload(device, "cube_indices", BufferUsage::Index, &index_bytes)?;

        engine_debug!("orbit::Geometry",
            "Uploaded cube: {} vertices, {} indices", CUBE_VERTEX_COUNT, CUBE_INDEX_COUNT);

        Ok(Self { positions, colors, indices })
    }

    pub fn positions(&self) -> &Arc<dyn Buffer> {
        &self.positions
    }

    pub fn colors(&self) -> &Arc<dyn Buffer> {
        &self.colors
    }

    pub fn indices(&self) -> &Arc<dyn Buffer> {
        &self.indices
    }

    pub fn index_count(&self) -> u32 {
        CUBE_INDEX_COUNT
    }

    pub fn index_type(&self) -> IndexType {
        IndexType::U16
    }
}

fn upload<D: GraphicsDevice>(
    device: &mut D,
    label: &str,
    usage: BufferUsage,
    bytes: &[u8],
) -> Result<Arc<dyn Buffer>> {
    let size = bytes.len() as u64;
    let mut buffer = device.create_buffer(&BufferDesc::host_visible(label, size, usage))?;
    buffer.write(0, bytes)?;
    buffer.flush(0..size)?;
    Ok(Arc::from(buffer))
}

#[cfg(test)]
#[path = "geometry_tests.rs"]
mod tests;
