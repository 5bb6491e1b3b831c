/// GraphicsDevice trait - the device/queue seam consumed by the frame pipeline

use crate::error::Result;
use crate::frame::CompletionToken;
use crate::graphics_device::{Buffer, BufferDesc, CommandList, RenderPassDesc};

/// Presentable target handed to every `draw` call
///
/// Created by the window/swapchain bootstrap; the pipeline only reads its size
/// and render pass description.
pub trait Surface {
    /// Width in pixels
    fn width(&self) -> u32;

    /// Height in pixels
    fn height(&self) -> u32;

    /// Clear values and attachment setup for this frame's render pass
    fn render_pass(&self) -> RenderPassDesc;
}

/// Graphics device trait
///
/// Allocates host-visible buffers and accepts recorded frames. Implemented by
/// backends (e.g., VulkanGraphicsDevice). The device is created and configured
/// by the caller; the pipeline never acquires GPUs or compiles programs.
pub trait GraphicsDevice: Send {
    /// Surface type the backend can render into and present
    type Surface: Surface;

    /// Create a buffer
    ///
    /// Host-visible buffers are zero-initialised and persistently mapped.
    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<Box<dyn Buffer>>;

    /// Submit one recorded frame
    ///
    /// The device must call [`CompletionToken::release`] exactly once, from any
    /// thread, after the GPU has finished reading every buffer the commands
    /// reference. If the submission never reached the queue the device releases
    /// the token before returning the error. [`Error::PresentFailed`] is the
    /// one error returned after the frame was queued: the device keeps the
    /// token and releases it on completion as usual. Dropping the token
    /// without releasing it reports a lost completion.
    ///
    /// [`Error::PresentFailed`]: crate::error::Error::PresentFailed
    fn submit(
        &mut self,
        commands: CommandList,
        surface: &Self::Surface,
        completion: CompletionToken,
    ) -> Result<()>;

    /// Block until all submitted work has finished executing
    fn wait_idle(&mut self) -> Result<()>;
}
