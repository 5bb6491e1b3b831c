//! Camera module - projection parameters and the per-frame camera record.
//!
//! The camera is a passive configuration value. It computes its matrices on
//! demand and never moves on its own; the world transform is passed through
//! to the shaders unchanged.

mod camera;

pub use camera::CameraConfig;
