//! Pipeline module - the frame orchestrator.

mod frame_pipeline;

pub use frame_pipeline::{
    FramePipeline, FrameState,
    ARGUMENT_TABLE_BINDING, INSTANCE_BINDING, CAMERA_BINDING,
};
