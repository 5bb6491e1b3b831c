/*!
# Orbit Engine

Backend-agnostic frame pipeline for instanced, multi-buffered rendering.

The engine bounds the number of frames in flight with a counting admission
gate, rotates per-frame instance and camera buffers through a slot ring, and
binds its static geometry through a single indirect argument table. Backends
(Vulkan, ...) implement the [`GraphicsDevice`](orbit::GraphicsDevice) trait.

## Architecture

- **GraphicsDevice**: buffer factory and submission queue
- **Buffer**: host-visible GPU memory with explicit flush
- **CommandList**: backend-neutral recording of one frame
- **AdmissionSemaphore**: at most N frames between submit and completion
- **FrameSlotRing**: N copies of the per-frame buffers
- **ArgumentTable**: one binding standing in for several buffers
- **InstanceGenerator**: per-instance transforms and colors
- **FramePipeline**: the per-tick orchestrator

Window bootstrap, device acquisition and shader compilation belong to the
caller.
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod graphics_device;
pub mod frame;
pub mod math;
pub mod camera;
pub mod animation;
pub mod geometry;
pub mod config;
pub mod pipeline;

// Main orbit namespace module
pub mod orbit {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine (logging hub)
    pub use crate::engine::Engine;

    // Device seam
    pub use crate::graphics_device::{Buffer, GraphicsDevice, Surface};

    // Orchestrator
    pub use crate::pipeline::{FramePipeline, FrameState};
    pub use crate::config::{PipelineConfig, MAX_FRAMES_IN_FLIGHT};

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Device sub-module with all recording and buffer types
    pub mod device {
        pub use crate::graphics_device::*;
    }

    // Per-frame resources
    pub mod frame {
        pub use crate::frame::*;
    }

    // Animation, camera and geometry
    pub mod scene {
        pub use crate::animation::*;
        pub use crate::camera::*;
        pub use crate::geometry::*;
        pub use crate::math::*;
    }
}

// Re-export math library at crate root
pub use glam;
