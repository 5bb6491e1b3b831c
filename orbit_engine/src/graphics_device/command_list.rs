/// CommandList - backend-agnostic recording of one frame's GPU work
///
/// The pipeline records plain commands referencing buffers by [`BufferHandle`];
/// the device encodes them into native command buffers at submit time.
/// Recording is single threaded and a list is submitted exactly once.

use bitflags::bitflags;
use crate::error::Result;
use crate::graphics_device::BufferHandle;
use crate::engine_bail;

// ===== FIXED-FUNCTION STATE =====

/// Face culling mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullMode {
    /// No culling
    None,
    /// Cull front faces
    Front,
    /// Cull back faces
    Back,
}

/// Front face winding order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontFace {
    /// Counter-clockwise vertices define front face
    CounterClockwise,
    /// Clockwise vertices define front face
    Clockwise,
}

/// Comparison operator for depth tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Never,
    Less,
    Equal,
    LessOrEqual,
    Greater,
    NotEqual,
    GreaterOrEqual,
    Always,
}

/// Depth testing state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthState {
    /// Enable the depth test
    pub test_enabled: bool,
    /// Write passing fragments to the depth buffer
    pub write_enabled: bool,
    /// Comparison against the stored depth
    pub compare: CompareOp,
}

impl Default for DepthState {
    fn default() -> Self {
        Self {
            test_enabled: true,
            write_enabled: true,
            compare: CompareOp::Less,
        }
    }
}

/// Index element type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    U16,
    U32,
}

impl IndexType {
    /// Size of one index in bytes
    pub fn size_bytes(&self) -> u64 {
        match self {
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }
}

bitflags! {
    /// How a resource reached only through an argument table is accessed
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ResourceUsage: u32 {
        const READ = 0x01;
        const WRITE = 0x02;
    }
}

/// Opaque identifier of an externally compiled graphics program
/// (vertex + fragment stages with their pipeline state)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub u64);

/// Render pass description supplied by the presentable surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderPassDesc {
    /// Clear color for the color attachment
    pub clear_color: [f32; 4],
    /// Clear value for the depth attachment
    pub clear_depth: f32,
}

impl Default for RenderPassDesc {
    fn default() -> Self {
        Self {
            clear_color: [0.0, 0.0, 0.0, 1.0],
            clear_depth: 1.0,
        }
    }
}

// ===== COMMANDS =====

/// One recorded command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    BeginRenderPass {
        desc: RenderPassDesc,
        width: u32,
        height: u32,
    },
    BindProgram(ProgramHandle),
    SetDepthState(DepthState),
    /// Bind `buffer` at vertex-stage binding point `index`
    SetVertexBuffer {
        index: u32,
        buffer: BufferHandle,
        offset: u64,
    },
    /// Declare a buffer referenced indirectly (through an argument table)
    UseResource {
        buffer: BufferHandle,
        usage: ResourceUsage,
    },
    SetCullMode(CullMode),
    SetFrontFace(FrontFace),
    DrawIndexed {
        index_count: u32,
        index_type: IndexType,
        index_buffer: BufferHandle,
        index_offset: u64,
        instance_count: u32,
    },
    EndRenderPass,
    /// Request presentation of the surface once the work completes
    Present,
}

/// Recorded commands of one frame
#[derive(Debug, Clone)]
pub struct CommandList {
    /// Frame number this list was recorded for
    frame_index: u64,
    /// Ring slot whose buffers the list references
    slot: usize,
    commands: Vec<Command>,
    in_render_pass: bool,
    program_bound: bool,
    presented: bool,
}

impl CommandList {
    /// Start recording for `frame_index`, referencing ring slot `slot`
    pub fn new(frame_index: u64, slot: usize) -> Self {
        Self {
            frame_index,
            slot,
            commands: Vec::with_capacity(16),
            in_render_pass: false,
            program_bound: false,
            presented: false,
        }
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Recorded commands in submission order
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Whether the list ended outside a render pass with a present request
    pub fn is_complete(&self) -> bool {
        !self.in_render_pass && self.presented
    }

    pub fn begin_render_pass(&mut self, desc: RenderPassDesc, width: u32, height: u32) -> Result<()> {
        if self.in_render_pass {
            engine_bail!("orbit::CommandList", "Already inside a render pass");
        }
        if self.presented {
            engine_bail!("orbit::CommandList", "Render pass begun after present");
        }
        self.in_render_pass = true;
        self.commands.push(Command::BeginRenderPass { desc, width, height });
        Ok(())
    }

    pub fn end_render_pass(&mut self) -> Result<()> {
        self.require_render_pass("end_render_pass")?;
        self.in_render_pass = false;
        self.commands.push(Command::EndRenderPass);
        Ok(())
    }

    pub fn bind_program(&mut self, program: ProgramHandle) -> Result<()> {
        self.require_render_pass("bind_program")?;
        self.program_bound = true;
        self.commands.push(Command::BindProgram(program));
        Ok(())
    }

    pub fn set_depth_state(&mut self, state: DepthState) -> Result<()> {
        self.require_render_pass("set_depth_state")?;
        self.commands.push(Command::SetDepthState(state));
        Ok(())
    }

    pub fn set_vertex_buffer(&mut self, index: u32, buffer: BufferHandle, offset: u64) -> Result<()> {
        self.require_render_pass("set_vertex_buffer")?;
        self.commands.push(Command::SetVertexBuffer { index, buffer, offset });
        Ok(())
    }

    pub fn use_resource(&mut self, buffer: BufferHandle, usage: ResourceUsage) -> Result<()> {
        self.require_render_pass("use_resource")?;
        self.commands.push(Command::UseResource { buffer, usage });
        Ok(())
    }

    pub fn set_cull_mode(&mut self, mode: CullMode) -> Result<()> {
        self.require_render_pass("set_cull_mode")?;
        self.commands.push(Command::SetCullMode(mode));
        Ok(())
    }

    pub fn set_front_face(&mut self, face: FrontFace) -> Result<()> {
        self.require_render_pass("set_front_face")?;
        self.commands.push(Command::SetFrontFace(face));
        Ok(())
    }

    pub fn draw_indexed(
        &mut self,
        index_count: u32,
        index_type: IndexType,
        index_buffer: BufferHandle,
        index_offset: u64,
        instance_count: u32,
    ) -> Result<()> {
        self.require_render_pass("draw_indexed")?;
        if !self.program_bound {
            engine_bail!("orbit::CommandList", "draw_indexed without a bound program");
        }
        self.commands.push(Command::DrawIndexed {
            index_count,
            index_type,
            index_buffer,
            index_offset,
            instance_count,
        });
        Ok(())
    }

    pub fn present(&mut self) -> Result<()> {
        if self.in_render_pass {
            engine_bail!("orbit::CommandList", "present inside a render pass");
        }
        if self.presented {
            engine_bail!("orbit::CommandList", "present requested twice");
        }
        self.presented = true;
        self.commands.push(Command::Present);
        Ok(())
    }

    fn require_render_pass(&self, op: &str) -> Result<()> {
        if !self.in_render_pass {
            engine_bail!("orbit::CommandList", "{} outside a render pass", op);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "command_list_tests.rs"]
mod tests;
