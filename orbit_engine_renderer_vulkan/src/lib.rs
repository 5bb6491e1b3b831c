/*!
# Orbit Engine - Vulkan Backend

Vulkan implementation of the orbit_engine device traits.

This crate wraps caller-created Vulkan handles (device, queue, allocator,
pipelines, swapchain) using the Ash library for Vulkan bindings and
gpu-allocator for memory management. Instance creation, device selection,
shader compilation and swapchain management stay with the application.

Requirements on the caller:
- Vulkan 1.3 device with the `bufferDeviceAddress` feature enabled
- allocator created with `buffer_device_address: true`
- graphics pipelines declaring [`REQUIRED_DYNAMIC_STATES`] and the push-constant
  range returned by [`vertex_bindings_push_constant_range`]

# Example

```no_run
use orbit_engine::orbit::{FramePipeline, PipelineConfig};
use orbit_engine_renderer_vulkan::{GpuContext, VulkanGraphicsDevice, VulkanSurface};
use std::sync::Arc;
# fn run(
#     instance: ash::Instance,
#     context: GpuContext,
#     pipeline: ash::vk::Pipeline,
#     layout: ash::vk::PipelineLayout,
#     surface: VulkanSurface,
# ) -> orbit_engine::orbit::Result<()> {
let mut device = VulkanGraphicsDevice::new(Arc::new(context), &instance)?;
let program = device.register_program(pipeline, layout);
let mut frames = FramePipeline::new(device, program, PipelineConfig::default())?;
frames.draw(&surface)?;
frames.shutdown()?;
# Ok(())
# }
```
*/

mod vulkan_context;
mod vulkan_buffer;
mod vulkan_format;
mod vulkan_surface;
mod vulkan_fence_watcher;
mod vulkan_graphics_device;

pub use vulkan_context::GpuContext;
pub use vulkan_buffer::VulkanBuffer;
pub use vulkan_format::{
    vertex_bindings_push_constant_range, REQUIRED_DYNAMIC_STATES,
    VERTEX_BINDING_PUSH_CONSTANT_SIZE,
};
pub use vulkan_surface::VulkanSurface;
pub use vulkan_graphics_device::VulkanGraphicsDevice;
