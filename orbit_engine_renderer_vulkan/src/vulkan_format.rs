/// Conversions from orbit device types to Vulkan enums and flags

use orbit_engine::orbit::device::{
    BufferHandle, BufferUsage, CompareOp, CullMode, FrontFace, IndexType, RenderPassDesc,
    StorageMode,
};
use ash::vk;
use gpu_allocator::MemoryLocation;

/// Bytes of push-constant space taken by one vertex binding (a device address)
pub const VERTEX_BINDING_PUSH_CONSTANT_SIZE: u32 = 8;

/// Dynamic states every registered graphics pipeline must declare
pub const REQUIRED_DYNAMIC_STATES: [vk::DynamicState; 7] = [
    vk::DynamicState::VIEWPORT,
    vk::DynamicState::SCISSOR,
    vk::DynamicState::DEPTH_TEST_ENABLE,
    vk::DynamicState::DEPTH_WRITE_ENABLE,
    vk::DynamicState::DEPTH_COMPARE_OP,
    vk::DynamicState::CULL_MODE,
    vk::DynamicState::FRONT_FACE,
];

/// Push-constant range a pipeline layout needs for `bindings` vertex bindings
pub fn vertex_bindings_push_constant_range(bindings: u32) -> vk::PushConstantRange {
    vk::PushConstantRange::default()
        .stage_flags(vk::ShaderStageFlags::VERTEX)
        .offset(0)
        .size(bindings * VERTEX_BINDING_PUSH_CONSTANT_SIZE)
}

/// Push-constant offset and payload binding `buffer` at vertex binding `index`
pub(crate) fn vertex_binding_push_constant(index: u32, buffer: BufferHandle, offset: u64) -> (u32, [u8; 8]) {
    let address = buffer.gpu_address + offset;
    (index * VERTEX_BINDING_PUSH_CONSTANT_SIZE, address.to_le_bytes())
}

pub(crate) fn buffer_usage_to_vk(usage: BufferUsage) -> vk::BufferUsageFlags {
    // Every buffer is reachable through a device address
    let base = vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS | vk::BufferUsageFlags::STORAGE_BUFFER;
    match usage {
        BufferUsage::Index => base | vk::BufferUsageFlags::INDEX_BUFFER,
        BufferUsage::Uniform => base | vk::BufferUsageFlags::UNIFORM_BUFFER,
        BufferUsage::Vertex | BufferUsage::Storage | BufferUsage::Argument => base,
    }
}

pub(crate) fn memory_location(storage: StorageMode) -> MemoryLocation {
    match storage {
        StorageMode::HostVisible => MemoryLocation::CpuToGpu,
        StorageMode::DevicePrivate => MemoryLocation::GpuOnly,
    }
}

pub(crate) fn cull_mode_to_vk(mode: CullMode) -> vk::CullModeFlags {
    match mode {
        CullMode::None => vk::CullModeFlags::NONE,
        CullMode::Front => vk::CullModeFlags::FRONT,
        CullMode::Back => vk::CullModeFlags::BACK,
    }
}

pub(crate) fn front_face_to_vk(face: FrontFace) -> vk::FrontFace {
    match face {
        FrontFace::CounterClockwise => vk::FrontFace::COUNTER_CLOCKWISE,
        FrontFace::Clockwise => vk::FrontFace::CLOCKWISE,
    }
}

pub(crate) fn compare_op_to_vk(op: CompareOp) -> vk::CompareOp {
    match op {
        CompareOp::Never => vk::CompareOp::NEVER,
        CompareOp::Less => vk::CompareOp::LESS,
        CompareOp::Equal => vk::CompareOp::EQUAL,
        CompareOp::LessOrEqual => vk::CompareOp::LESS_OR_EQUAL,
        CompareOp::Greater => vk::CompareOp::GREATER,
        CompareOp::NotEqual => vk::CompareOp::NOT_EQUAL,
        CompareOp::GreaterOrEqual => vk::CompareOp::GREATER_OR_EQUAL,
        CompareOp::Always => vk::CompareOp::ALWAYS,
    }
}

pub(crate) fn index_type_to_vk(index_type: IndexType) -> vk::IndexType {
    match index_type {
        IndexType::U16 => vk::IndexType::UINT16,
        IndexType::U32 => vk::IndexType::UINT32,
    }
}

/// Color then depth clear values, matching attachment order 0 and 1
pub(crate) fn clear_values(desc: &RenderPassDesc) -> [vk::ClearValue; 2] {
    [
        vk::ClearValue {
            color: vk::ClearColorValue {
                float32: desc.clear_color,
            },
        },
        vk::ClearValue {
            depth_stencil: vk::ClearDepthStencilValue {
                depth: desc.clear_depth,
                stencil: 0,
            },
        },
    ]
}

#[cfg(test)]
#[path = "vulkan_format_tests.rs"]
mod tests;
