/// GpuContext - Shared GPU handles for all Vulkan objects
///
/// Contains everything the backend needs for GPU operations:
/// - Device for Vulkan API calls
/// - Allocator for memory management
/// - Queue for command submission
/// - Flush granularity of host-visible memory

use ash::vk;
use gpu_allocator::vulkan::Allocator;
use std::sync::{Arc, Mutex};

/// Shared GPU context for all Vulkan resources.
///
/// Shared (via `Arc`) by buffers, the graphics device and its fence watcher.
/// Every handle is created by the caller; the context never destroys the
/// device, and every Orbit object holding it must be dropped before the caller
/// destroys the allocator and the device.
///
/// The allocator must be created with `buffer_device_address: true` and the
/// device with the `bufferDeviceAddress` feature enabled.
pub struct GpuContext {
    /// Vulkan logical device
    pub device: ash::Device,

    /// GPU memory allocator (shared, requires mutex for thread safety)
    pub allocator: Arc<Mutex<Allocator>>,

    /// Graphics queue for command submission and presentation
    pub graphics_queue: vk::Queue,

    /// Graphics queue family index
    pub graphics_queue_family: u32,

    /// `VkPhysicalDeviceLimits::nonCoherentAtomSize`
    pub non_coherent_atom_size: u64,
}

impl GpuContext {
    /// Create a new GPU context
    ///
    /// # Arguments
    ///
    /// * `device` - Vulkan logical device
    /// * `graphics_queue` - Graphics queue for command submission
    /// * `graphics_queue_family` - Graphics queue family index
    /// * `allocator` - GPU memory allocator
    /// * `non_coherent_atom_size` - Flush granularity reported by the physical device
    pub fn new(
        device: ash::Device,
        graphics_queue: vk::Queue,
        graphics_queue_family: u32,
        allocator: Arc<Mutex<Allocator>>,
        non_coherent_atom_size: u64,
    ) -> Self {
        Self {
            device,
            allocator,
            graphics_queue,
            graphics_queue_family,
            non_coherent_atom_size: non_coherent_atom_size.max(1),
        }
    }
}
