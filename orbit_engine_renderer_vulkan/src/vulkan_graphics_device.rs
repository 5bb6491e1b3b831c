/// VulkanGraphicsDevice - Vulkan implementation of the orbit GraphicsDevice trait
///
/// Encodes each recorded `CommandList` into a primary command buffer, submits
/// it with a fence and lets the fence watcher release the frame's completion
/// token once the GPU is done.

use orbit_engine::orbit::{Error, Result};
use orbit_engine::orbit::device::{
    Buffer, BufferDesc, Command, CommandList, GraphicsDevice, ProgramHandle,
};
use orbit_engine::orbit::frame::CompletionToken;
use orbit_engine::{engine_bail, engine_err, engine_error, engine_info, engine_warn};
use ash::vk::{self, Handle};
use rustc_hash::FxHashMap;
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;

use crate::vulkan_buffer::VulkanBuffer;
use crate::vulkan_context::GpuContext;
use crate::vulkan_fence_watcher::{settle, FenceWatcher, FrameResources, InFlightFrame};
use crate::vulkan_format::{
    clear_values, compare_op_to_vk, cull_mode_to_vk, front_face_to_vk, index_type_to_vk,
    vertex_binding_push_constant,
};
use crate::vulkan_surface::VulkanSurface;

/// Graphics pipeline registered by the caller
#[derive(Debug, Clone, Copy)]
struct RegisteredProgram {
    pipeline: vk::Pipeline,
    layout: vk::PipelineLayout,
}

/// Vulkan graphics device
///
/// Pipelines are compiled by the caller and registered with
/// [`register_program`](Self::register_program). They must declare
/// [`REQUIRED_DYNAMIC_STATES`](crate::REQUIRED_DYNAMIC_STATES) and a vertex
/// push-constant range from
/// [`vertex_bindings_push_constant_range`](crate::vertex_bindings_push_constant_range).
pub struct VulkanGraphicsDevice {
    ctx: Arc<GpuContext>,
    swapchain_loader: ash::khr::swapchain::Device,
    /// Pool for per-frame command buffers (RESET_COMMAND_BUFFER)
    command_pool: vk::CommandPool,
    /// Fence/command buffer pairs ready for reuse
    free_frames: Vec<FrameResources>,
    /// Pairs handed back by the watcher
    recycled: Receiver<FrameResources>,
    /// Every pair ever created, destroyed on drop
    all_frames: Vec<FrameResources>,
    programs: FxHashMap<ProgramHandle, RegisteredProgram>,
    next_program: u64,
    watcher: Option<FenceWatcher>,
}

impl VulkanGraphicsDevice {
    /// Wrap a caller-created device
    ///
    /// `instance` is only used to load the swapchain functions.
    pub fn new(ctx: Arc<GpuContext>, instance: &ash::Instance) -> Result<Self> {
        let swapchain_loader = ash::khr::swapchain::Device::new(instance, &ctx.device);

        let command_pool = unsafe {
            let pool_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(ctx.graphics_queue_family)
                .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
            ctx.device.create_command_pool(&pool_info, None)
                .map_err(|e| engine_err!("orbit::vulkan", "Failed to create command pool: {:?}", e))?
        };

        let (recycle, recycled) = mpsc::channel();
        let watcher = match FenceWatcher::spawn(Arc::clone(&ctx), recycle) {
            Ok(watcher) => watcher,
            Err(e) => {
                unsafe { ctx.device.destroy_command_pool(command_pool, None) };
                return Err(e);
            }
        };

        engine_info!("orbit::vulkan",
            "Vulkan device ready (queue family {}, flush atom {} bytes)",
            ctx.graphics_queue_family, ctx.non_coherent_atom_size);

        Ok(Self {
            ctx,
            swapchain_loader,
            command_pool,
            free_frames: Vec::new(),
            recycled,
            all_frames: Vec::new(),
            programs: FxHashMap::default(),
            next_program: 1,
            watcher: Some(watcher),
        })
    }

    /// Make a compiled graphics pipeline bindable by `BindProgram`
    ///
    /// The pipeline and its layout stay owned by the caller and must outlive
    /// every submission using them.
    pub fn register_program(&mut self, pipeline: vk::Pipeline, layout: vk::PipelineLayout) -> ProgramHandle {
        let handle = ProgramHandle(self.next_program);
        self.next_program += 1;
        self.programs.insert(handle, RegisteredProgram { pipeline, layout });
        handle
    }

    pub fn context(&self) -> &Arc<GpuContext> {
        &self.ctx
    }

    /// Fence/command buffer pairs created so far
    pub fn frame_resource_count(&self) -> usize {
        self.all_frames.len()
    }

    fn acquire_frame_resources(&mut self) -> Result<FrameResources> {
        while let Ok(resources) = self.recycled.try_recv() {
            self.free_frames.push(resources);
        }

        let device = &self.ctx.device;
        if let Some(resources) = self.free_frames.pop() {
            unsafe {
                let reset = device.reset_fences(&[resources.fence])
                    .and_then(|_| device.reset_command_buffer(
                        resources.command_buffer,
                        vk::CommandBufferResetFlags::empty(),
                    ));
                if let Err(e) = reset {
                    self.free_frames.push(resources);
                    engine_bail!("orbit::vulkan", "Failed to reset frame resources: {:?}", e);
                }
            }
            return Ok(resources);
        }

        unsafe {
            let fence = device.create_fence(&vk::FenceCreateInfo::default(), None)
                .map_err(|e| engine_err!("orbit::vulkan", "Failed to create frame fence: {:?}", e))?;

            let allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(self.command_pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);
            let command_buffer = match device.allocate_command_buffers(&allocate_info) {
                Ok(buffers) if !buffers.is_empty() => buffers[0],
                Ok(_) => {
                    device.destroy_fence(fence, None);
                    engine_bail!("orbit::vulkan", "Command buffer allocation returned nothing");
                }
                Err(e) => {
                    device.destroy_fence(fence, None);
                    engine_bail!("orbit::vulkan", "Failed to allocate command buffer: {:?}", e);
                }
            };

            let resources = FrameResources { fence, command_buffer };
            self.all_frames.push(resources);
            Ok(resources)
        }
    }

    /// Record `commands` into `cb`; returns whether a present was requested
    fn encode(&self, cb: vk::CommandBuffer, commands: &CommandList, surface: &VulkanSurface) -> Result<bool> {
        let device = &self.ctx.device;
        let mut layout: Option<vk::PipelineLayout> = None;
        let mut present = false;

        unsafe {
            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            device.begin_command_buffer(cb, &begin_info)
                .map_err(|e| engine_err!("orbit::vulkan", "Failed to begin command buffer: {:?}", e))?;

            for command in commands.commands() {
                match command {
                    Command::BeginRenderPass { desc, width, height } => {
                        let extent = vk::Extent2D { width: *width, height: *height };
                        let clear = clear_values(desc);
                        let render_pass_info = vk::RenderPassBeginInfo::default()
                            .render_pass(surface.render_pass)
                            .framebuffer(surface.framebuffer)
                            .render_area(vk::Rect2D {
                                offset: vk::Offset2D { x: 0, y: 0 },
                                extent,
                            })
                            .clear_values(&clear);
                        device.cmd_begin_render_pass(cb, &render_pass_info, vk::SubpassContents::INLINE);

                        let viewport = vk::Viewport::default()
                            .width(*width as f32)
                            .height(*height as f32)
                            .min_depth(0.0)
                            .max_depth(1.0);
                        device.cmd_set_viewport(cb, 0, &[viewport]);
                        device.cmd_set_scissor(cb, 0, &[vk::Rect2D {
                            offset: vk::Offset2D { x: 0, y: 0 },
                            extent,
                        }]);
                    }
                    Command::BindProgram(handle) => {
                        let program = self.programs.get(handle).ok_or_else(|| {
                            Error::InvalidResource(format!("Program {} is not registered", handle.0))
                        })?;
                        device.cmd_bind_pipeline(cb, vk::PipelineBindPoint::GRAPHICS, program.pipeline);
                        layout = Some(program.layout);
                    }
                    Command::SetDepthState(state) => {
                        device.cmd_set_depth_test_enable(cb, state.test_enabled);
                        device.cmd_set_depth_write_enable(cb, state.write_enabled);
                        device.cmd_set_depth_compare_op(cb, compare_op_to_vk(state.compare));
                    }
                    Command::SetVertexBuffer { index, buffer, offset } => {
                        let Some(layout) = layout else {
                            engine_bail!("orbit::vulkan", "Vertex buffer {} bound before a program", index);
                        };
                        let (push_offset, address) = vertex_binding_push_constant(*index, *buffer, *offset);
                        device.cmd_push_constants(cb, layout, vk::ShaderStageFlags::VERTEX, push_offset, &address);
                    }
                    // Device addresses need no residency declaration; the queue
                    // submission makes flushed host writes visible
                    Command::UseResource { .. } => {}
                    Command::SetCullMode(mode) => device.cmd_set_cull_mode(cb, cull_mode_to_vk(*mode)),
                    Command::SetFrontFace(face) => device.cmd_set_front_face(cb, front_face_to_vk(*face)),
                    Command::DrawIndexed {
                        index_count,
                        index_type,
                        index_buffer,
                        index_offset,
                        instance_count,
                    } => {
                        device.cmd_bind_index_buffer(
                            cb,
                            vk::Buffer::from_raw(index_buffer.id),
                            *index_offset,
                            index_type_to_vk(*index_type),
                        );
                        device.cmd_draw_indexed(cb, *index_count, *instance_count, 0, 0, 0);
                    }
                    Command::EndRenderPass => device.cmd_end_render_pass(cb),
                    Command::Present => present = true,
                }
            }

            device.end_command_buffer(cb)
                .map_err(|e| engine_err!("orbit::vulkan", "Failed to end command buffer: {:?}", e))?;
        }

        Ok(present)
    }

    /// Encode and queue one frame; the fence signals on completion
    fn queue_frame(&self, resources: FrameResources, commands: &CommandList, surface: &VulkanSurface) -> Result<bool> {
        let present = self.encode(resources.command_buffer, commands, surface)?;

        let command_buffers = [resources.command_buffer];
        let wait_semaphores = [surface.image_available];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let signal_semaphores = [surface.render_finished];

        let mut submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);
        if surface.is_presentable() {
            submit_info = submit_info
                .wait_semaphores(&wait_semaphores)
                .wait_dst_stage_mask(&wait_stages)
                .signal_semaphores(&signal_semaphores);
        }

        unsafe {
            self.ctx.device
                .queue_submit(self.ctx.graphics_queue, &[submit_info], resources.fence)
                .map_err(|e| engine_err!("orbit::vulkan", "Failed to submit commands to GPU queue: {:?}", e))?;
        }
        Ok(present)
    }

    fn present(&self, surface: &VulkanSurface) -> Result<()> {
        let swapchains = [surface.swapchain];
        let image_indices = [surface.image_index];
        let wait_semaphores = [surface.render_finished];
        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        match unsafe { self.swapchain_loader.queue_present(self.ctx.graphics_queue, &present_info) } {
            Ok(false) => Ok(()),
            Ok(true) => {
                engine_warn!("orbit::vulkan", "Swapchain is suboptimal for the surface");
                Ok(())
            }
            Err(e) => {
                // the frame is already queued and its token is with the watcher
                engine_error!("orbit::vulkan", "Failed to present: {:?}", e);
                Err(Error::PresentFailed(format!("{:?}", e)))
            }
        }
    }
}

impl GraphicsDevice for VulkanGraphicsDevice {
    type Surface = VulkanSurface;

    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<Box<dyn Buffer>> {
        Ok(Box::new(VulkanBuffer::new(Arc::clone(&self.ctx), desc)?))
    }

    fn submit(
        &mut self,
        commands: CommandList,
        surface: &VulkanSurface,
        completion: CompletionToken,
    ) -> Result<()> {
        let resources = match self.acquire_frame_resources() {
            Ok(resources) => resources,
            Err(e) => {
                completion.release();
                return Err(e);
            }
        };

        let present = match self.queue_frame(resources, &commands, surface) {
            Ok(present) => present,
            Err(e) => {
                // Nothing reached the queue
                self.free_frames.push(resources);
                completion.release();
                return Err(e);
            }
        };

        let frame = InFlightFrame {
            resources,
            token: completion,
            frame_index: commands.frame_index(),
        };
        let untracked = match self.watcher.as_ref() {
            Some(watcher) => watcher.track(frame).err(),
            None => Some(frame),
        };
        if let Some(frame) = untracked {
            engine_warn!("orbit::vulkan", "Fence watcher gone, waiting for frame {} inline", frame.frame_index);
            if let Some(resources) = settle(&self.ctx, frame) {
                self.free_frames.push(resources);
            }
        }

        if present && surface.is_presentable() {
            self.present(surface)?;
        }
        Ok(())
    }

    fn wait_idle(&mut self) -> Result<()> {
        unsafe {
            self.ctx.device
                .device_wait_idle()
                .map_err(|e| engine_err!("orbit::vulkan", "Failed to wait idle: {:?}", e))
        }
    }
}

impl Drop for VulkanGraphicsDevice {
    fn drop(&mut self) {
        unsafe {
            // Wait for device to finish so the watcher can settle every frame
            self.ctx.device.device_wait_idle().ok();
        }
        self.watcher.take();

        unsafe {
            for resources in self.all_frames.drain(..) {
                self.ctx.device.destroy_fence(resources.fence, None);
            }
            // Command buffers are freed with their pool
            self.ctx.device.destroy_command_pool(self.command_pool, None);
        }
    }
}
