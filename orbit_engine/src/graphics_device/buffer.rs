/// Buffer trait and buffer descriptor

use std::ops::Range;
use crate::error::{Error, Result};

/// Buffer usage flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    /// Per-vertex geometry data (positions, colors)
    Vertex,
    /// Index buffer
    Index,
    /// Per-frame uniform data (camera)
    Uniform,
    /// Per-frame storage data (instances)
    Storage,
    /// Indirect argument table
    Argument,
}

/// Where the buffer memory lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    /// Persistently mapped, written by the CPU, flushed before GPU use
    HostVisible,
    /// Device-local memory with no host mapping
    DevicePrivate,
}

/// Descriptor for creating a buffer
#[derive(Debug, Clone)]
pub struct BufferDesc {
    /// Size in bytes
    pub size: u64,
    /// Buffer usage
    pub usage: BufferUsage,
    /// Storage class
    pub storage: StorageMode,
    /// Debug label
    pub label: String,
}

impl BufferDesc {
    /// Host-visible buffer of `size` bytes
    pub fn host_visible(label: impl Into<String>, size: u64, usage: BufferUsage) -> Self {
        Self {
            size,
            usage,
            storage: StorageMode::HostVisible,
            label: label.into(),
        }
    }
}

/// Plain-data reference to a buffer, valid while the buffer is alive
///
/// `id` is backend defined (the raw `VkBuffer` for Vulkan). `gpu_address` is the
/// address the GPU dereferences when the buffer is reached through an argument
/// table; it is 0 on backends without buffer device addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle {
    pub id: u64,
    pub gpu_address: u64,
}

/// Buffer resource trait
///
/// Implemented by backend-specific buffer types (e.g., VulkanBuffer).
/// The buffer is automatically destroyed when dropped.
///
/// Host writes go through [`Buffer::contents_mut`] or [`Buffer::write`] and are
/// only guaranteed visible to the GPU once the written range has been passed
/// to [`Buffer::flush`]. Skipping the flush is not detected: the GPU may read
/// stale bytes.
pub trait Buffer: Send + Sync {
    /// Plain-data handle used in recorded commands and argument tables
    fn handle(&self) -> BufferHandle;

    /// Size in bytes
    fn size(&self) -> u64;

    /// Storage class the buffer was created with
    fn storage(&self) -> StorageMode;

    /// Host-mapped view of the whole buffer
    ///
    /// Fails with `InvalidResource` for device-private buffers.
    fn contents(&self) -> Result<&[u8]>;

    /// Mutable host-mapped view of the whole buffer
    fn contents_mut(&mut self) -> Result<&mut [u8]>;

    /// Declare `range` (in bytes) as modified by the host
    fn flush(&mut self, range: Range<u64>) -> Result<()>;

    /// Copy `data` into the buffer at `offset`
    fn write(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        let end = offset
            .checked_add(data.len() as u64)
            .ok_or(Error::OutOfBounds { index: u64::MAX, len: self.size() })?;
        let range = offset..end;
        check_range(&range, self.size())?;
        let contents = self.contents_mut()?;
        contents[range.start as usize..range.end as usize].copy_from_slice(data);
        Ok(())
    }
}

/// Validate that `range` lies within a buffer of `size` bytes
pub fn check_range(range: &Range<u64>, size: u64) -> Result<()> {
    if range.start > range.end || range.end > size {
        return Err(Error::OutOfBounds { index: range.end, len: size });
    }
    Ok(())
}

#[cfg(test)]
#[path = "buffer_tests.rs"]
mod tests;
