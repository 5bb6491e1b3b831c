/// VulkanSurface - caller-provided render target for one frame

use orbit_engine::orbit::device::{RenderPassDesc, Surface};
use ash::vk;

/// One frame's render target
///
/// The swapchain, its images and semaphores are created by the caller, who
/// acquires the next image and builds a fresh `VulkanSurface` for each draw.
/// A null `swapchain` makes the surface offscreen: submissions skip the
/// semaphores and the present request.
#[derive(Debug, Clone, Copy)]
pub struct VulkanSurface {
    /// Render pass with a color (0) and a depth (1) attachment
    pub render_pass: vk::RenderPass,
    /// Framebuffer of the acquired image
    pub framebuffer: vk::Framebuffer,
    pub extent: vk::Extent2D,
    /// Clear values for both attachments
    pub clear: RenderPassDesc,
    pub swapchain: vk::SwapchainKHR,
    /// Index returned by `vkAcquireNextImageKHR`
    pub image_index: u32,
    /// Signaled by the acquire, waited on before color output
    pub image_available: vk::Semaphore,
    /// Signaled by the submission, waited on by the present
    pub render_finished: vk::Semaphore,
}

impl VulkanSurface {
    /// Surface that renders into `framebuffer` without presenting
    pub fn offscreen(render_pass: vk::RenderPass, framebuffer: vk::Framebuffer, extent: vk::Extent2D) -> Self {
        Self {
            render_pass,
            framebuffer,
            extent,
            clear: RenderPassDesc::default(),
            swapchain: vk::SwapchainKHR::null(),
            image_index: 0,
            image_available: vk::Semaphore::null(),
            render_finished: vk::Semaphore::null(),
        }
    }

    /// Present swapchain image `image_index` once the frame completes
    pub fn with_swapchain(
        mut self,
        swapchain: vk::SwapchainKHR,
        image_index: u32,
        image_available: vk::Semaphore,
        render_finished: vk::Semaphore,
    ) -> Self {
        self.swapchain = swapchain;
        self.image_index = image_index;
        self.image_available = image_available;
        self.render_finished = render_finished;
        self
    }

    pub fn with_clear(mut self, clear: RenderPassDesc) -> Self {
        self.clear = clear;
        self
    }

    pub fn is_presentable(&self) -> bool {
        self.swapchain != vk::SwapchainKHR::null()
    }
}

impl Surface for VulkanSurface {
    fn width(&self) -> u32 {
        self.extent.width
    }

    fn height(&self) -> u32 {
        self.extent.height
    }

    fn render_pass(&self) -> RenderPassDesc {
        self.clear
    }
}

#[cfg(test)]
#[path = "vulkan_surface_tests.rs"]
mod tests;
