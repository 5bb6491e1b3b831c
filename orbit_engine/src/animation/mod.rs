//! Animation module - the tick-driven angle and the per-instance generator.

mod instances;
mod state;

pub use instances::{instance_color, orbit_offset, InstanceConfig, InstanceGenerator};
pub use state::{AnimationState, DEFAULT_ANGLE_STEP};
