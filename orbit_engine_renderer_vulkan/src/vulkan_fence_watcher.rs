/// FenceWatcher - turns frame fences into completion-token releases
///
/// The watcher thread owns every in-flight frame's completion token. It waits
/// on the frame's fence, releases the token, and hands the fence and command
/// buffer back to the device for reuse. A failed wait (device lost) drops the
/// token unreleased, which the admission gate reports as a lost completion.

use orbit_engine::orbit::frame::CompletionToken;
use orbit_engine::orbit::Result;
use orbit_engine::{engine_err, engine_error, engine_trace};
use ash::vk;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::vulkan_context::GpuContext;

/// Per-submission synchronization and recording objects
#[derive(Debug, Clone, Copy)]
pub(crate) struct FrameResources {
    pub fence: vk::Fence,
    pub command_buffer: vk::CommandBuffer,
}

/// A submitted frame waiting for its fence
pub(crate) struct InFlightFrame {
    pub resources: FrameResources,
    pub token: CompletionToken,
    pub frame_index: u64,
}

pub(crate) struct FenceWatcher {
    sender: Option<Sender<InFlightFrame>>,
    thread: Option<JoinHandle<()>>,
}

impl FenceWatcher {
    /// Start the watcher thread; finished resources go to `recycle`
    pub fn spawn(ctx: Arc<GpuContext>, recycle: Sender<FrameResources>) -> Result<Self> {
        let (sender, receiver) = mpsc::channel();
        let thread = thread::Builder::new()
            .name("orbit-fence-watcher".to_string())
            .spawn(move || watch(ctx, receiver, recycle))
            .map_err(|e| engine_err!("orbit::vulkan", "Failed to start fence watcher: {}", e))?;

        Ok(Self {
            sender: Some(sender),
            thread: Some(thread),
        })
    }

    /// Hand a submitted frame to the watcher
    ///
    /// Gives the frame back if the watcher thread is gone.
    pub fn track(&self, frame: InFlightFrame) -> std::result::Result<(), InFlightFrame> {
        match self.sender.as_ref() {
            Some(sender) => sender.send(frame).map_err(|e| e.0),
            None => Err(frame),
        }
    }
}

/// Wait for one frame's fence and settle its token
///
/// Returns the resources when they can be reused.
pub(crate) fn settle(ctx: &GpuContext, frame: InFlightFrame) -> Option<FrameResources> {
    let waited = unsafe {
        ctx.device.wait_for_fences(&[frame.resources.fence], true, u64::MAX)
    };
    match waited {
        Ok(()) => {
            engine_trace!("orbit::vulkan", "Frame {} completed", frame.frame_index);
            frame.token.release();
            Some(frame.resources)
        }
        Err(e) => {
            engine_error!("orbit::vulkan",
                "Frame {} will never complete: {:?}", frame.frame_index, e);
            // unreleased token: the permit is lost
            drop(frame.token);
            None
        }
    }
}

fn watch(ctx: Arc<GpuContext>, frames: Receiver<InFlightFrame>, recycle: Sender<FrameResources>) {
    for frame in frames {
        if let Some(resources) = settle(&ctx, frame) {
            // the device may already be gone during shutdown
            let _ = recycle.send(resources);
        }
    }
}

impl Drop for FenceWatcher {
    fn drop(&mut self) {
        // Closing the channel lets the thread finish the frames it already holds
        self.sender.take();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
