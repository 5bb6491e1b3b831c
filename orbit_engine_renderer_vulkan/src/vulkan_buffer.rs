/// Buffer - Vulkan implementation of the orbit Buffer trait

use orbit_engine::orbit::{Error, Result};
use orbit_engine::orbit::device::{
    check_range, Buffer, BufferDesc, BufferHandle, StorageMode,
};
use orbit_engine::{engine_err, engine_error};
use ash::vk::{self, Handle};
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::AllocationError;
use std::ops::Range;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{buffer_usage_to_vk, memory_location};

/// Vulkan buffer implementation
///
/// Host-visible buffers live in a persistently mapped `CpuToGpu` allocation.
pub struct VulkanBuffer {
    /// Shared GPU context (device, allocator, queue)
    ctx: Arc<GpuContext>,
    /// Vulkan buffer
    pub(crate) buffer: vk::Buffer,
    /// GPU memory allocation
    allocation: Option<Allocation>,
    /// Requested size (the allocation may be larger)
    size: u64,
    storage: StorageMode,
    gpu_address: u64,
    /// Memory is HOST_COHERENT, flushes are no-ops
    coherent: bool,
}

impl VulkanBuffer {
    /// Create, allocate and bind a buffer
    pub fn new(ctx: Arc<GpuContext>, desc: &BufferDesc) -> Result<Self> {
        if desc.size == 0 {
            return Err(Error::InvalidResource(format!("Buffer '{}' has zero size", desc.label)));
        }

        unsafe {
            let buffer_create_info = vk::BufferCreateInfo::default()
                .size(desc.size)
                .usage(buffer_usage_to_vk(desc.usage))
                .sharing_mode(vk::SharingMode::EXCLUSIVE);

            let buffer = ctx.device.create_buffer(&buffer_create_info, None)
                .map_err(|e| engine_err!("orbit::vulkan",
                    "Failed to create buffer '{}' of size {} bytes: {:?}", desc.label, desc.size, e))?;

            let requirements = ctx.device.get_buffer_memory_requirements(buffer);

            let allocated = match ctx.allocator.lock() {
                Ok(mut allocator) => allocator.allocate(&AllocationCreateDesc {
                    name: &desc.label,
                    requirements,
                    location: memory_location(desc.storage),
                    linear: true,
                    allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                }),
                Err(_) => {
                    ctx.device.destroy_buffer(buffer, None);
                    return Err(engine_err!("orbit::vulkan", "Allocator lock poisoned"));
                }
            };

            let allocation = match allocated {
                Ok(allocation) => allocation,
                Err(e) => {
                    ctx.device.destroy_buffer(buffer, None);
                    return Err(match e {
                        AllocationError::OutOfMemory => {
                            let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                            engine_error!("orbit::vulkan",
                                "Out of GPU memory for buffer '{}' (required: {:.2} MB)", desc.label, size_mb);
                            Error::OutOfMemory
                        }
                        other => engine_err!("orbit::vulkan",
                            "Failed to allocate buffer '{}': {:?}", desc.label, other),
                    });
                }
            };

            let memory = allocation.memory();
            let offset = allocation.offset();
            let coherent = allocation
                .memory_properties()
                .contains(vk::MemoryPropertyFlags::HOST_COHERENT);

            // From here on Drop releases both the buffer and the allocation
            let mut this = Self {
                ctx: Arc::clone(&ctx),
                buffer,
                allocation: Some(allocation),
                size: desc.size,
                storage: desc.storage,
                gpu_address: 0,
                coherent,
            };

            ctx.device.bind_buffer_memory(buffer, memory, offset)
                .map_err(|e| engine_err!("orbit::vulkan", "Failed to bind buffer memory: {:?}", e))?;

            // Host-visible memory starts zeroed
            if let Some(mapped) = this.allocation.as_mut().and_then(|a| a.mapped_slice_mut()) {
                mapped.fill(0);
            }
            if desc.storage == StorageMode::HostVisible && this.mapped().is_none() {
                return Err(engine_err!("orbit::vulkan", "Buffer '{}' is not CPU-accessible", desc.label));
            }

            let address_info = vk::BufferDeviceAddressInfo::default().buffer(buffer);
            this.gpu_address = ctx.device.get_buffer_device_address(&address_info);

            Ok(this)
        }
    }

    fn mapped(&self) -> Option<&[u8]> {
        let mapped = self.allocation.as_ref()?.mapped_slice()?;
        mapped.get(..self.size as usize)
    }

    /// Whether flushes are skipped for this buffer
    pub fn is_coherent(&self) -> bool {
        self.coherent
    }
}

impl Buffer for VulkanBuffer {
    fn handle(&self) -> BufferHandle {
        BufferHandle {
            id: self.buffer.as_raw(),
            gpu_address: self.gpu_address,
        }
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn storage(&self) -> StorageMode {
        self.storage
    }

    fn contents(&self) -> Result<&[u8]> {
        self.mapped()
            .ok_or_else(|| Error::InvalidResource("Buffer is not CPU-accessible".to_string()))
    }

    fn contents_mut(&mut self) -> Result<&mut [u8]> {
        let size = self.size as usize;
        self.allocation
            .as_mut()
            .and_then(|allocation| allocation.mapped_slice_mut())
            .and_then(|mapped| mapped.get_mut(..size))
            .ok_or_else(|| Error::InvalidResource("Buffer is not CPU-accessible".to_string()))
    }

    fn flush(&mut self, range: Range<u64>) -> Result<()> {
        check_range(&range, self.size)?;
        if self.storage != StorageMode::HostVisible {
            return Err(Error::InvalidResource("Flush of a device-private buffer".to_string()));
        }
        if self.coherent || range.is_empty() {
            return Ok(());
        }

        let allocation = self.allocation.as_ref()
            .ok_or_else(|| engine_err!("orbit::vulkan", "Buffer flush failed: no GPU allocation"))?;
        let base = allocation.offset();
        let (offset, size) = flush_region(
            base + range.start..base + range.end,
            self.ctx.non_coherent_atom_size,
            base + allocation.size(),
        );
        let memory_range = vk::MappedMemoryRange::default()
            .memory(unsafe { allocation.memory() })
            .offset(offset)
            .size(size);

        unsafe {
            self.ctx.device
                .flush_mapped_memory_ranges(&[memory_range])
                .map_err(|e| engine_err!("orbit::vulkan", "Failed to flush mapped memory: {:?}", e))
        }
    }
}

/// Expand a byte range of device memory to `atom` boundaries
///
/// Returns `(offset, size)` for a `VkMappedMemoryRange`. When rounding up
/// would pass `limit` (the end of the allocation) the range runs to the end of
/// the memory object instead.
pub(crate) fn flush_region(range: Range<u64>, atom: u64, limit: u64) -> (u64, u64) {
    let atom = atom.max(1);
    let start = range.start / atom * atom;
    let end = range.end.div_ceil(atom) * atom;
    if end > limit {
        (start, vk::WHOLE_SIZE)
    } else {
        (start, end - start)
    }
}

impl Drop for VulkanBuffer {
    fn drop(&mut self) {
        unsafe {
            // Free GPU memory
            if let Some(allocation) = self.allocation.take() {
                // Don't panic if lock fails - we still need to destroy the buffer
                if let Ok(mut allocator) = self.ctx.allocator.lock() {
                    allocator.free(allocation).ok();
                }
            }

            self.ctx.device.destroy_buffer(self.buffer, None);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_buffer_tests.rs"]
mod tests;
