/// Unit tests for MockGraphicsDevice and its controller.

use crate::error::Error;
use crate::frame::AdmissionSemaphore;
use crate::graphics_device::mock_graphics_device::*;
use crate::graphics_device::{
    Buffer, BufferDesc, BufferUsage, CommandList, GraphicsDevice, StorageMode,
};

fn presented_list(frame_index: u64, slot: usize) -> CommandList {
    let mut cmd = CommandList::new(frame_index, slot);
    cmd.present().unwrap();
    cmd
}

// ============================================================================
// MockBuffer Tests
// ============================================================================

#[test]
fn test_buffers_get_distinct_handles() {
    let mut device = MockGraphicsDevice::new();
    let a = device.create_buffer(&BufferDesc::host_visible("a", 16, BufferUsage::Vertex)).unwrap();
    let b = device.create_buffer(&BufferDesc::host_visible("b", 16, BufferUsage::Vertex)).unwrap();
    assert_ne!(a.handle(), b.handle());
    assert_ne!(a.handle().gpu_address, 0);
    assert_eq!(device.controller().buffer_count(), 2);
}

#[test]
fn test_gpu_view_changes_only_on_flush() {
    let mut device = MockGraphicsDevice::new();
    let controller = device.controller();
    let mut buffer = device
        .create_buffer(&BufferDesc::host_visible("data", 8, BufferUsage::Storage))
        .unwrap();

    buffer.write(0, &[9, 9, 9, 9]).unwrap();
    assert_eq!(controller.gpu_visible(buffer.handle()).unwrap(), vec![0; 8]);

    buffer.flush(0..2).unwrap();
    assert_eq!(controller.gpu_visible(buffer.handle()).unwrap(), vec![9, 9, 0, 0, 0, 0, 0, 0]);
    assert_eq!(controller.flushes_of(buffer.handle()), vec![0..2]);
}

#[test]
fn test_flush_out_of_range() {
    let mut device = MockGraphicsDevice::new();
    let mut buffer = device
        .create_buffer(&BufferDesc::host_visible("data", 8, BufferUsage::Storage))
        .unwrap();
    assert!(matches!(buffer.flush(4..12), Err(Error::OutOfBounds { .. })));
}

#[test]
fn test_device_private_has_no_host_view() {
    let mut device = MockGraphicsDevice::new();
    let desc = BufferDesc {
        storage: StorageMode::DevicePrivate,
        ..BufferDesc::host_visible("private", 8, BufferUsage::Storage)
    };
    let mut buffer = device.create_buffer(&desc).unwrap();
    assert!(matches!(buffer.contents(), Err(Error::InvalidResource(_))));
    assert!(matches!(buffer.write(0, &[1]), Err(Error::InvalidResource(_))));
}

#[test]
fn test_buffer_budget() {
    let mut device = MockGraphicsDevice::new();
    device.controller().set_buffer_budget(1);
    let desc = BufferDesc::host_visible("x", 4, BufferUsage::Vertex);
    assert!(device.create_buffer(&desc).is_ok());
    assert!(matches!(device.create_buffer(&desc), Err(Error::OutOfMemory)));
}

// ============================================================================
// Submission Tests
// ============================================================================

#[test]
fn test_submissions_park_tokens() {
    let gate = AdmissionSemaphore::new(2);
    let mut device = MockGraphicsDevice::new();
    let controller = device.controller();
    let surface = MockSurface::new(640, 480);

    let token = gate.acquire().unwrap().for_frame(1, 0);
    device.submit(presented_list(0, 1), &surface, token).unwrap();

    assert_eq!(controller.pending_count(), 1);
    assert_eq!(controller.pending_slots(), vec![1]);
    assert_eq!(gate.available(), 1);

    let submission = &controller.submissions()[0];
    assert_eq!(submission.slot, 1);
    assert_eq!(submission.surface_size, (640, 480));

    assert!(controller.complete_next());
    assert!(!controller.complete_next());
    assert_eq!(gate.available(), 2);
}

#[test]
fn test_auto_complete() {
    let gate = AdmissionSemaphore::new(1);
    let mut device = MockGraphicsDevice::auto_completing();
    let surface = MockSurface::new(1, 1);
    for frame in 0..5 {
        let token = gate.acquire().unwrap();
        device.submit(presented_list(frame, 0), &surface, token).unwrap();
    }
    assert_eq!(gate.completed(), 5);
}

#[test]
fn test_failed_submit_releases_token() {
    let gate = AdmissionSemaphore::new(1);
    let mut device = MockGraphicsDevice::new();
    device.controller().fail_next_submit("queue full");

    let token = gate.acquire().unwrap();
    let result = device.submit(presented_list(0, 0), &MockSurface::new(1, 1), token);
    assert!(result.is_err());
    assert_eq!(gate.available(), 1);
    assert!(!gate.is_failed());
    assert_eq!(device.controller().submission_count(), 0);
}

#[test]
fn test_present_failure_keeps_the_queued_frame() {
    let gate = AdmissionSemaphore::new(1);
    let mut device = MockGraphicsDevice::new();
    let controller = device.controller();
    controller.fail_next_present("out of date");

    let token = gate.acquire().unwrap();
    let result = device.submit(presented_list(0, 0), &MockSurface::new(1, 1), token);
    assert!(matches!(result, Err(Error::PresentFailed(_))));
    assert_eq!(controller.submission_count(), 1);
    assert_eq!(gate.available(), 0);

    controller.complete_all();
    assert_eq!(gate.available(), 1);
}

#[test]
fn test_lose_next_fails_gate() {
    let gate = AdmissionSemaphore::new(2);
    let mut device = MockGraphicsDevice::new();
    let token = gate.acquire().unwrap();
    device.submit(presented_list(0, 0), &MockSurface::new(1, 1), token).unwrap();

    assert!(device.controller().lose_next());
    assert!(gate.is_failed());
}

#[test]
fn test_wait_idle_completes_everything() {
    let gate = AdmissionSemaphore::new(3);
    let mut device = MockGraphicsDevice::new();
    let surface = MockSurface::new(1, 1);
    for frame in 0..3 {
        let token = gate.acquire().unwrap();
        device.submit(presented_list(frame, frame as usize), &surface, token).unwrap();
    }
    device.wait_idle().unwrap();
    assert_eq!(gate.available(), 3);
    assert_eq!(device.controller().wait_idle_calls(), 1);
}
