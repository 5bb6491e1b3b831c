/// Mock GraphicsDevice for unit tests (no GPU required)
///
/// Buffers keep two copies of their bytes: the host-mapped view the CPU writes
/// and a "GPU-visible" copy that is only updated on flush. Submissions are
/// recorded and their completion tokens parked until a test completes them,
/// possibly from another thread through a [`MockController`].

use std::collections::VecDeque;
use std::ops::Range;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::frame::CompletionToken;
use crate::graphics_device::{
    check_range, Buffer, BufferDesc, BufferHandle, BufferUsage, Command, CommandList,
    GraphicsDevice, RenderPassDesc, StorageMode, Surface,
};
use crate::engine_bail;

const GPU_ADDRESS_BASE: u64 = 0x1_0000_0000;
const GPU_ADDRESS_SPAN: u64 = 0x10_0000;

// ============================================================================
// Shared state
// ============================================================================

/// What the mock knows about one created buffer
#[derive(Debug, Clone)]
pub struct MockBufferRecord {
    pub label: String,
    pub size: u64,
    pub usage: BufferUsage,
    pub storage: StorageMode,
    /// Bytes the GPU would observe: updated only by flush
    pub gpu_visible: Vec<u8>,
}

/// One recorded submission
#[derive(Debug, Clone)]
pub struct MockSubmission {
    pub frame_index: u64,
    pub slot: usize,
    pub commands: Vec<Command>,
    pub surface_size: (u32, u32),
}

#[derive(Default)]
struct MockState {
    buffers: FxHashMap<u64, MockBufferRecord>,
    flushes: Vec<(u64, Range<u64>)>,
    submissions: Vec<MockSubmission>,
    pending: VecDeque<CompletionToken>,
    auto_complete: bool,
    fail_next_submit: Option<String>,
    fail_next_present: Option<String>,
    buffer_budget: Option<usize>,
    wait_idle_calls: usize,
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Mock Buffer
// ============================================================================

pub struct MockBuffer {
    handle: BufferHandle,
    size: u64,
    storage: StorageMode,
    host: Vec<u8>,
    state: Arc<Mutex<MockState>>,
}

impl Buffer for MockBuffer {
    fn handle(&self) -> BufferHandle {
        self.handle
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn storage(&self) -> StorageMode {
        self.storage
    }

    fn contents(&self) -> Result<&[u8]> {
        if self.storage != StorageMode::HostVisible {
            return Err(Error::InvalidResource("buffer is not host visible".to_string()));
        }
        Ok(&self.host)
    }

    fn contents_mut(&mut self) -> Result<&mut [u8]> {
        if self.storage != StorageMode::HostVisible {
            return Err(Error::InvalidResource("buffer is not host visible".to_string()));
        }
        Ok(&mut self.host)
    }

    fn flush(&mut self, range: Range<u64>) -> Result<()> {
        check_range(&range, self.size)?;
        let mut state = lock(&self.state);
        if let Some(record) = state.buffers.get_mut(&self.handle.id) {
            let (start, end) = (range.start as usize, range.end as usize);
            record.gpu_visible[start..end].copy_from_slice(&self.host[start..end]);
        }
        state.flushes.push((self.handle.id, range));
        Ok(())
    }
}

// ============================================================================
// Mock Surface
// ============================================================================

#[derive(Debug, Clone)]
pub struct MockSurface {
    pub width: u32,
    pub height: u32,
    pub render_pass: RenderPassDesc,
}

impl MockSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height, render_pass: RenderPassDesc::default() }
    }
}

impl Surface for MockSurface {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn render_pass(&self) -> RenderPassDesc {
        self.render_pass
    }
}

// ============================================================================
// Mock Controller
// ============================================================================

/// Test-side handle on the mock's state, usable from any thread
#[derive(Clone)]
pub struct MockController {
    state: Arc<Mutex<MockState>>,
}

impl MockController {
    /// Complete the oldest pending submission; false if none is pending
    pub fn complete_next(&self) -> bool {
        let token = lock(&self.state).pending.pop_front();
        match token {
            Some(token) => {
                token.release();
                true
            }
            None => false,
        }
    }

    /// Complete every pending submission, returning how many completed
    pub fn complete_all(&self) -> usize {
        let tokens: Vec<_> = lock(&self.state).pending.drain(..).collect();
        let count = tokens.len();
        for token in tokens {
            token.release();
        }
        count
    }

    /// Drop the oldest pending token without releasing it (device lost)
    pub fn lose_next(&self) -> bool {
        let token = lock(&self.state).pending.pop_front();
        token.is_some()
    }

    /// Release tokens as soon as they are submitted
    pub fn set_auto_complete(&self, enabled: bool) {
        lock(&self.state).auto_complete = enabled;
    }

    /// Make the next submit fail before reaching the queue
    pub fn fail_next_submit(&self, message: &str) {
        lock(&self.state).fail_next_submit = Some(message.to_string());
    }

    /// Queue the next submission normally, then report a present failure
    pub fn fail_next_present(&self, message: &str) {
        lock(&self.state).fail_next_present = Some(message.to_string());
    }

    /// Let only `count` more buffers be created; later ones fail with OutOfMemory
    pub fn set_buffer_budget(&self, count: usize) {
        lock(&self.state).buffer_budget = Some(count);
    }

    pub fn pending_count(&self) -> usize {
        lock(&self.state).pending.len()
    }

    /// Slots of the pending submissions, oldest first
    pub fn pending_slots(&self) -> Vec<usize> {
        lock(&self.state).pending.iter().map(|t| t.slot()).collect()
    }

    pub fn submissions(&self) -> Vec<MockSubmission> {
        lock(&self.state).submissions.clone()
    }

    pub fn submission_count(&self) -> usize {
        lock(&self.state).submissions.len()
    }

    pub fn buffer(&self, id: u64) -> Option<MockBufferRecord> {
        lock(&self.state).buffers.get(&id).cloned()
    }

    pub fn buffer_count(&self) -> usize {
        lock(&self.state).buffers.len()
    }

    /// Bytes the GPU would read from `handle`
    pub fn gpu_visible(&self, handle: BufferHandle) -> Option<Vec<u8>> {
        lock(&self.state).buffers.get(&handle.id).map(|b| b.gpu_visible.clone())
    }

    pub fn flushes(&self) -> Vec<(u64, Range<u64>)> {
        lock(&self.state).flushes.clone()
    }

    pub fn flushes_of(&self, handle: BufferHandle) -> Vec<Range<u64>> {
        lock(&self.state)
            .flushes
            .iter()
            .filter(|(id, _)| *id == handle.id)
            .map(|(_, r)| r.clone())
            .collect()
    }

    pub fn wait_idle_calls(&self) -> usize {
        lock(&self.state).wait_idle_calls
    }
}

// ============================================================================
// Mock GraphicsDevice
// ============================================================================

pub struct MockGraphicsDevice {
    state: Arc<Mutex<MockState>>,
    next_id: u64,
}

impl MockGraphicsDevice {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
            next_id: 1,
        }
    }

    /// Mock whose submissions complete immediately
    pub fn auto_completing() -> Self {
        let device = Self::new();
        device.controller().set_auto_complete(true);
        device
    }

    pub fn controller(&self) -> MockController {
        MockController { state: Arc::clone(&self.state) }
    }
}

impl Default for MockGraphicsDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphicsDevice for MockGraphicsDevice {
    type Surface = MockSurface;

    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<Box<dyn Buffer>> {
        let mut state = lock(&self.state);
        if let Some(budget) = state.buffer_budget.as_mut() {
            if *budget == 0 {
                return Err(Error::OutOfMemory);
            }
            *budget -= 1;
        }

        let id = self.next_id;
        self.next_id += 1;
        let handle = BufferHandle {
            id,
            gpu_address: GPU_ADDRESS_BASE + id * GPU_ADDRESS_SPAN,
        };
        state.buffers.insert(id, MockBufferRecord {
            label: desc.label.clone(),
            size: desc.size,
            usage: desc.usage,
            storage: desc.storage,
            gpu_visible: vec![0; desc.size as usize],
        });

        Ok(Box::new(MockBuffer {
            handle,
            size: desc.size,
            storage: desc.storage,
            host: vec![0; desc.size as usize],
            state: Arc::clone(&self.state),
        }))
    }

    fn submit(
        &mut self,
        commands: CommandList,
        surface: &MockSurface,
        completion: CompletionToken,
    ) -> Result<()> {
        let mut state = lock(&self.state);
        if let Some(message) = state.fail_next_submit.take() {
            drop(state);
            completion.release();
            engine_bail!("orbit::MockGraphicsDevice", "Submit failed: {}", message);
        }

        state.submissions.push(MockSubmission {
            frame_index: commands.frame_index(),
            slot: commands.slot(),
            commands: commands.commands().to_vec(),
            surface_size: (surface.width, surface.height),
        });

        let present_failure = state.fail_next_present.take();
        if state.auto_complete {
            drop(state);
            completion.release();
        } else {
            state.pending.push_back(completion);
        }
        match present_failure {
            Some(message) => Err(Error::PresentFailed(message)),
            None => Ok(()),
        }
    }

    fn wait_idle(&mut self) -> Result<()> {
        let tokens: Vec<_> = {
            let mut state = lock(&self.state);
            state.wait_idle_calls += 1;
            state.pending.drain(..).collect()
        };
        for token in tokens {
            token.release();
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "mock_graphics_device_tests.rs"]
mod tests;
