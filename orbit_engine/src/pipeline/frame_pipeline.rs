/// FramePipeline - the per-tick orchestrator.
///
/// One `draw` call runs one tick:
///
/// ```text
/// Idle --acquire--> SlotClaimed --write+flush--> DataWritten --submit--> Submitted
/// ```
///
/// Completion is asynchronous: the device releases the tick's admission
/// token once the GPU has finished, which frees the slot for reuse N ticks
/// later. A lost completion is fatal and moves the pipeline to `Failed`.

use std::time::Duration;
use crate::animation::{AnimationState, InstanceGenerator};
use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::frame::{AdmissionSemaphore, ArgumentSchema, ArgumentTable, FrameSlotRing};
use crate::geometry::CubeGeometry;
use crate::graphics_device::{CommandList, GraphicsDevice, ProgramHandle, ResourceUsage, Surface};
use crate::{engine_debug, engine_error, engine_info, engine_trace, engine_warn};

/// Drain bound used by `Drop` when no acquire timeout is configured
const DROP_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Vertex-stage binding points
pub const ARGUMENT_TABLE_BINDING: u32 = 0;
pub const INSTANCE_BINDING: u32 = 1;
pub const CAMERA_BINDING: u32 = 2;

/// Where the most recent tick stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// Waiting for admission, or the last tick was aborted before claiming
    Idle,
    /// A ring slot is claimed for this tick
    SlotClaimed,
    /// Instance and camera data written and flushed
    DataWritten,
    /// Work handed to the device queue
    Submitted,
    /// A completion was lost; the pipeline refuses further ticks
    Failed,
}

pub struct FramePipeline<D: GraphicsDevice> {
    program: ProgramHandle,
    config: PipelineConfig,
    admission: AdmissionSemaphore,
    ring: FrameSlotRing,
    argument_table: ArgumentTable,
    geometry: CubeGeometry,
    generator: InstanceGenerator,
    animation: AnimationState,
    frame_index: u64,
    state: FrameState,
    shut_down: bool,
    device: D,
}

/// Keep memory and initialization failures as they are, wrap everything else
fn setup_error(stage: &str, error: Error) -> Error {
    let error = if error.is_fatal() {
        error
    } else {
        Error::InitializationFailed(format!("{}: {}", stage, error))
    };
    engine_error!("orbit::FramePipeline", "Setup failed ({}): {}", stage, error);
    error
}

impl<D: GraphicsDevice> FramePipeline<D> {
    /// Upload geometry, build the argument table, allocate the ring
    pub fn new(mut device: D, program: ProgramHandle, config: PipelineConfig) -> Result<Self> {
        config.validate().map_err(|e| setup_error("config", e))?;

        let geometry = CubeGeometry::upload(&mut device).map_err(|e| setup_error("geometry", e))?;

        let argument_table = ArgumentTable::build(
            &mut device,
            ArgumentSchema::geometry(),
            &[
                (geometry.positions().clone(), 0),
                (geometry.colors().clone(), 1),
            ],
        )
        .map_err(|e| setup_error("argument table", e))?;

        let ring = FrameSlotRing::new(&mut device, config.instance_count, config.frames_in_flight)
            .map_err(|e| setup_error("frame ring", e))?;

        engine_info!("orbit::FramePipeline",
            "Pipeline ready: {} instances, {} frames in flight",
            config.instance_count, config.frames_in_flight);

        Ok(Self {
            program,
            admission: AdmissionSemaphore::new(config.frames_in_flight),
            ring,
            argument_table,
            geometry,
            generator: InstanceGenerator::new(config.instances, config.instance_count),
            animation: AnimationState::new(config.angle_step),
            frame_index: 0,
            state: FrameState::Idle,
            shut_down: false,
            config,
            device,
        })
    }

    /// Resume from a previously captured animation state
    pub fn with_animation(mut self, animation: AnimationState) -> Self {
        self.animation = animation;
        self
    }

    /// Run one tick against `surface`
    ///
    /// `DeviceHang` aborts the tick before any slot is claimed; the pipeline
    /// can be ticked again. A tick that fails before its frame is queued gives
    /// back its slot and its animation step, so the next tick reuses both.
    /// `PresentFailed` still counts the frame as submitted. `LostCompletion`
    /// is fatal.
    pub fn draw(&mut self, surface: &D::Surface) -> Result<()> {
        if self.state == FrameState::Failed || self.admission.is_failed() {
            self.state = FrameState::Failed;
            return Err(Error::LostCompletion);
        }
        self.state = FrameState::Idle;

        let acquired = match self.config.acquire_timeout {
            Some(timeout) => self.admission.acquire_timeout(timeout),
            None => self.admission.acquire(),
        };
        let token = match acquired {
            Ok(token) => token,
            Err(Error::LostCompletion) => {
                engine_error!("orbit::FramePipeline",
                    "Lost completion detected at frame {}", self.frame_index);
                self.state = FrameState::Failed;
                return Err(Error::LostCompletion);
            }
            Err(e) => {
                engine_warn!("orbit::FramePipeline",
                    "Frame {} not admitted: {}", self.frame_index, e);
                return Err(e);
            }
        };

        let slot = self.ring.advance();
        self.state = FrameState::SlotClaimed;
        let token = token.for_frame(slot, self.frame_index);

        let animation = self.animation;
        let commands = match self.write_and_record(slot, surface) {
            Ok(commands) => commands,
            Err(e) => {
                // nothing reached the queue, hand the permit straight back
                token.release();
                self.abort_tick(animation);
                return Err(e);
            }
        };
        self.state = FrameState::DataWritten;

        let submitted = match self.device.submit(commands, surface, token) {
            Ok(()) => Ok(()),
            Err(Error::PresentFailed(msg)) => {
                engine_warn!("orbit::FramePipeline",
                    "Frame {} queued on slot {} but not presented: {}", self.frame_index, slot, msg);
                Err(Error::PresentFailed(msg))
            }
            Err(e) => {
                engine_warn!("orbit::FramePipeline",
                    "Frame {} not submitted: {}", self.frame_index, e);
                self.abort_tick(animation);
                return Err(e);
            }
        };
        self.state = FrameState::Submitted;

        engine_trace!("orbit::FramePipeline",
            "Frame {} submitted on slot {}", self.frame_index, slot);
        self.frame_index += 1;
        submitted
    }

    /// Undo the slot claim and angle step of a tick that never reached the queue
    fn abort_tick(&mut self, animation: AnimationState) {
        self.ring.rewind();
        self.animation = animation;
        self.state = FrameState::Idle;
    }

    fn write_and_record(&mut self, slot: usize, surface: &D::Surface) -> Result<CommandList> {
        let angle = self.animation.advance();

        let object = self.generator.object_transform(angle);
        for i in 0..self.config.instance_count {
            let data = self.generator.generate_with(object, i, angle);
            self.ring.write_instance(i, &data)?;
        }
        self.ring.write_camera(&self.config.camera.camera_data())?;
        self.ring.flush()?;

        let current = self.ring.current();
        let mut cmd = CommandList::new(self.frame_index, slot);
        cmd.begin_render_pass(surface.render_pass(), surface.width(), surface.height())?;
        cmd.bind_program(self.program)?;
        cmd.set_depth_state(self.config.depth)?;
        cmd.set_vertex_buffer(ARGUMENT_TABLE_BINDING, self.argument_table.handle(), 0)?;
        for resource in self.argument_table.resources() {
            cmd.use_resource(resource.handle(), ResourceUsage::READ)?;
        }
        cmd.set_vertex_buffer(INSTANCE_BINDING, current.instance_handle(), 0)?;
        cmd.set_vertex_buffer(CAMERA_BINDING, current.camera_handle(), 0)?;
        cmd.set_cull_mode(self.config.cull_mode)?;
        cmd.set_front_face(self.config.front_face)?;
        cmd.draw_indexed(
            self.geometry.index_count(),
            self.geometry.index_type(),
            self.geometry.indices().handle(),
            0,
            self.config.instance_count as u32,
        )?;
        cmd.end_render_pass()?;
        cmd.present()?;
        Ok(cmd)
    }

    /// Drain every outstanding frame, then wait for the device to go idle
    pub fn shutdown(mut self) -> Result<()> {
        self.finish(None)
    }

    fn finish(&mut self, timeout: Option<Duration>) -> Result<()> {
        if self.shut_down {
            return Ok(());
        }
        self.shut_down = true;

        let drained = self.admission.drain(timeout);
        let idle = self.device.wait_idle();
        engine_debug!("orbit::FramePipeline",
            "Shut down after {} frames", self.frame_index);
        drained.and(idle)
    }

    // ===== ACCESSORS =====

    /// Number of frames submitted so far
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Snapshot of the animation state
    pub fn animation(&self) -> AnimationState {
        self.animation
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    pub fn argument_table(&self) -> &ArgumentTable {
        &self.argument_table
    }

    pub fn ring(&self) -> &FrameSlotRing {
        &self.ring
    }

    pub fn admission(&self) -> &AdmissionSemaphore {
        &self.admission
    }

    pub fn geometry(&self) -> &CubeGeometry {
        &self.geometry
    }

    pub fn generator(&self) -> &InstanceGenerator {
        &self.generator
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn program(&self) -> ProgramHandle {
        self.program
    }
}

impl<D: GraphicsDevice> Drop for FramePipeline<D> {
    fn drop(&mut self) {
        let timeout = self.config.acquire_timeout.unwrap_or(DROP_DRAIN_TIMEOUT);
        if let Err(e) = self.finish(Some(timeout)) {
            engine_error!("orbit::FramePipeline", "Shutdown on drop failed: {}", e);
        }
    }
}

#[cfg(test)]
#[path = "frame_pipeline_tests.rs"]
mod tests;
