use std::thread;
use std::time::Duration;
use crate::animation::InstanceGenerator;
use crate::config::PipelineConfig;
use crate::error::Error;
use crate::frame::{CameraData, InstanceData, SlotState};
use crate::graphics_device::mock_graphics_device::{MockController, MockGraphicsDevice, MockSurface};
use crate::graphics_device::{
    Command, CullMode, DepthState, FrontFace, IndexType, ProgramHandle, RenderPassDesc,
    ResourceUsage,
};
use super::*;

const PROGRAM: ProgramHandle = ProgramHandle(7);

fn build(device: MockGraphicsDevice, config: PipelineConfig) -> (FramePipeline<MockGraphicsDevice>, MockController) {
    let controller = device.controller();
    let pipeline = FramePipeline::new(device, PROGRAM, config).unwrap();
    (pipeline, controller)
}

fn surface() -> MockSurface {
    MockSurface::new(800, 600)
}

// ============================================================================
// SETUP
// ============================================================================

#[test]
fn test_new_allocates_everything_once() {
    let (pipeline, controller) = build(MockGraphicsDevice::new(), PipelineConfig::default());
    // 3 geometry + 1 argument table + 2 per slot
    assert_eq!(controller.buffer_count(), 10);
    assert_eq!(pipeline.frame_index(), 0);
    assert_eq!(pipeline.state(), FrameState::Idle);
    assert_eq!(pipeline.admission().capacity(), 3);
    assert_eq!(pipeline.ring().len(), 3);
    assert_eq!(pipeline.program(), PROGRAM);
    pipeline.shutdown().unwrap();
}

#[test]
fn test_invalid_config_is_initialization_failure() {
    let result = FramePipeline::new(
        MockGraphicsDevice::new(),
        PROGRAM,
        PipelineConfig::default().with_instance_count(0),
    );
    assert!(matches!(result, Err(Error::InitializationFailed(_))));
}

#[test]
fn test_allocation_failure_is_out_of_memory() {
    let device = MockGraphicsDevice::new();
    device.controller().set_buffer_budget(5);
    let result = FramePipeline::new(device, PROGRAM, PipelineConfig::default());
    assert!(matches!(result, Err(Error::OutOfMemory)));
}

// ============================================================================
// ONE TICK
// ============================================================================

#[test]
fn test_tick_records_expected_commands() {
    let (mut pipeline, controller) = build(MockGraphicsDevice::auto_completing(), PipelineConfig::default());
    pipeline.draw(&surface()).unwrap();
    assert_eq!(pipeline.state(), FrameState::Submitted);

    let submission = &controller.submissions()[0];
    assert_eq!(submission.frame_index, 0);
    assert_eq!(submission.slot, 0);

    let table = pipeline.argument_table();
    let slot = pipeline.ring().slot(0).unwrap();
    let geometry = pipeline.geometry();
    let expected = vec![
        Command::BeginRenderPass { desc: RenderPassDesc::default(), width: 800, height: 600 },
        Command::BindProgram(PROGRAM),
        Command::SetDepthState(DepthState::default()),
        Command::SetVertexBuffer { index: 0, buffer: table.handle(), offset: 0 },
        Command::UseResource { buffer: geometry.positions().handle(), usage: ResourceUsage::READ },
        Command::UseResource { buffer: geometry.colors().handle(), usage: ResourceUsage::READ },
        Command::SetVertexBuffer { index: 1, buffer: slot.instance_handle(), offset: 0 },
        Command::SetVertexBuffer { index: 2, buffer: slot.camera_handle(), offset: 0 },
        Command::SetCullMode(CullMode::Back),
        Command::SetFrontFace(FrontFace::CounterClockwise),
        Command::DrawIndexed {
            index_count: 36,
            index_type: IndexType::U16,
            index_buffer: geometry.indices().handle(),
            index_offset: 0,
            instance_count: 32,
        },
        Command::EndRenderPass,
        Command::Present,
    ];
    assert_eq!(submission.commands, expected);
}

#[test]
fn test_tick_writes_flushed_instance_and_camera_data() {
    let config = PipelineConfig::default();
    let (mut pipeline, controller) = build(MockGraphicsDevice::auto_completing(), config.clone());
    pipeline.draw(&surface()).unwrap();

    let slot = pipeline.ring().slot(0).unwrap();
    assert_eq!(slot.state(), SlotState::Sealed);

    let generator = InstanceGenerator::new(config.instances, config.instance_count);
    let gpu = controller.gpu_visible(slot.instance_handle()).unwrap();
    for i in [0usize, 16, 31] {
        let at = i * 80;
        let decoded = InstanceData::decode(&gpu[at..at + 80]).unwrap();
        // the angle advances before the first tick is generated
        assert_eq!(decoded, generator.generate(i, 0.01));
    }
    // only the first instance_count records are touched
    assert!(gpu[32 * 80..].iter().all(|b| *b == 0));

    let camera = CameraData::decode(&controller.gpu_visible(slot.camera_handle()).unwrap()).unwrap();
    assert_eq!(camera, config.camera.camera_data());
}

#[test]
fn test_angle_advances_once_per_tick() {
    let (mut pipeline, _controller) = build(MockGraphicsDevice::auto_completing(), PipelineConfig::default());
    for _ in 0..10 {
        pipeline.draw(&surface()).unwrap();
    }
    assert_eq!(pipeline.animation().ticks, 10);
    assert!((pipeline.animation().angle - 0.1).abs() < 1e-5);
    assert_eq!(pipeline.frame_index(), 10);
}

// ============================================================================
// RING AND ADMISSION
// ============================================================================

#[test]
fn test_slot_sequence_is_frame_mod_n() {
    let (mut pipeline, controller) = build(MockGraphicsDevice::auto_completing(), PipelineConfig::default());
    for _ in 0..7 {
        pipeline.draw(&surface()).unwrap();
    }
    let slots: Vec<usize> = controller.submissions().iter().map(|s| s.slot).collect();
    assert_eq!(slots, vec![0, 1, 2, 0, 1, 2, 0]);
}

#[test]
fn test_fourth_tick_waits_for_a_completion() {
    let config = PipelineConfig::default().with_acquire_timeout(Duration::from_millis(50));
    let (mut pipeline, controller) = build(MockGraphicsDevice::new(), config);

    for _ in 0..3 {
        pipeline.draw(&surface()).unwrap();
    }
    assert_eq!(pipeline.admission().in_flight(), 3);

    let err = pipeline.draw(&surface()).unwrap_err();
    assert!(matches!(err, Error::DeviceHang { .. }));
    assert_eq!(pipeline.state(), FrameState::Idle);
    // aborted before the ring advanced
    assert_eq!(pipeline.ring().current_index(), 2);
    assert_eq!(controller.submission_count(), 3);

    assert!(controller.complete_next());
    pipeline.draw(&surface()).unwrap();
    assert_eq!(controller.submissions()[3].slot, 0);

    controller.complete_all();
    pipeline.shutdown().unwrap();
}

#[test]
fn test_blocked_tick_resumes_on_completion_from_another_thread() {
    let (mut pipeline, controller) = build(MockGraphicsDevice::new(), PipelineConfig::default());
    for _ in 0..3 {
        pipeline.draw(&surface()).unwrap();
    }

    let completer = {
        let controller = controller.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            controller.complete_next()
        })
    };
    pipeline.draw(&surface()).unwrap();
    assert!(completer.join().unwrap());
    assert_eq!(controller.submission_count(), 4);

    controller.complete_all();
    pipeline.shutdown().unwrap();
}

#[test]
fn test_never_more_than_n_in_flight() {
    let (mut pipeline, controller) = build(MockGraphicsDevice::new(), PipelineConfig::default());
    for frame in 0..12 {
        if pipeline.admission().available() == 0 {
            assert!(controller.complete_next());
        }
        pipeline.draw(&surface()).unwrap();
        assert!(controller.pending_count() <= 3, "frame {}", frame);
    }
    controller.complete_all();
    pipeline.shutdown().unwrap();
}

#[test]
fn test_argument_table_unchanged_over_many_frames() {
    let (mut pipeline, controller) = build(MockGraphicsDevice::auto_completing(), PipelineConfig::default());
    let table = pipeline.argument_table().handle();
    let before = controller.gpu_visible(table).unwrap();

    for _ in 0..1000 {
        pipeline.draw(&surface()).unwrap();
    }
    assert_eq!(controller.gpu_visible(table).unwrap(), before);
    assert_eq!(controller.flushes_of(table).len(), 1);
}

// ============================================================================
// FAILURES
// ============================================================================

#[test]
fn test_lost_completion_is_fatal() {
    let (mut pipeline, controller) = build(MockGraphicsDevice::new(), PipelineConfig::default());
    pipeline.draw(&surface()).unwrap();
    assert!(controller.lose_next());

    assert!(matches!(pipeline.draw(&surface()), Err(Error::LostCompletion)));
    assert_eq!(pipeline.state(), FrameState::Failed);
    assert!(matches!(pipeline.draw(&surface()), Err(Error::LostCompletion)));
    assert_eq!(controller.submission_count(), 1);

    assert!(matches!(pipeline.shutdown(), Err(Error::LostCompletion)));
    assert_eq!(controller.wait_idle_calls(), 1);
}

#[test]
fn test_failed_submit_returns_the_permit() {
    let (mut pipeline, controller) = build(MockGraphicsDevice::new(), PipelineConfig::default());
    controller.fail_next_submit("device busy");

    assert!(pipeline.draw(&surface()).is_err());
    assert_eq!(pipeline.admission().available(), 3);
    assert!(!pipeline.admission().is_failed());

    pipeline.draw(&surface()).unwrap();
    controller.complete_all();
    pipeline.shutdown().unwrap();
}

#[test]
fn test_failed_submit_gives_back_slot_and_angle() {
    let (mut pipeline, controller) = build(MockGraphicsDevice::auto_completing(), PipelineConfig::default());
    pipeline.draw(&surface()).unwrap();
    controller.fail_next_submit("device busy");

    assert!(matches!(pipeline.draw(&surface()), Err(Error::BackendError(_))));
    assert_eq!(pipeline.state(), FrameState::Idle);
    assert_eq!(pipeline.frame_index(), 1);
    assert_eq!(pipeline.animation().ticks, 1);
    assert_eq!(pipeline.ring().current_index(), 0);

    for _ in 0..3 {
        pipeline.draw(&surface()).unwrap();
    }
    let submissions = controller.submissions();
    let frames: Vec<u64> = submissions.iter().map(|s| s.frame_index).collect();
    let slots: Vec<usize> = submissions.iter().map(|s| s.slot).collect();
    assert_eq!(frames, vec![0, 1, 2, 3]);
    assert_eq!(slots, vec![0, 1, 2, 0]);
    assert_eq!(pipeline.animation().ticks, 4);
}

#[test]
fn test_present_failure_still_counts_the_frame() {
    let (mut pipeline, controller) = build(MockGraphicsDevice::new(), PipelineConfig::default());
    controller.fail_next_present("swapchain out of date");

    assert!(matches!(pipeline.draw(&surface()), Err(Error::PresentFailed(_))));
    assert_eq!(pipeline.state(), FrameState::Submitted);
    assert_eq!(pipeline.frame_index(), 1);
    // the queued frame keeps its permit until it completes
    assert_eq!(pipeline.admission().in_flight(), 1);

    pipeline.draw(&surface()).unwrap();
    let submissions = controller.submissions();
    let frames: Vec<u64> = submissions.iter().map(|s| s.frame_index).collect();
    let slots: Vec<usize> = submissions.iter().map(|s| s.slot).collect();
    assert_eq!(frames, vec![0, 1]);
    assert_eq!(slots, vec![0, 1]);

    controller.complete_all();
    assert_eq!(controller.pending_count(), 0);
    pipeline.shutdown().unwrap();
}

#[test]
fn test_unbounded_acquire_timeout_draws() {
    let config = PipelineConfig::default().with_acquire_timeout(Duration::MAX);
    let (mut pipeline, controller) = build(MockGraphicsDevice::auto_completing(), config);
    for _ in 0..5 {
        pipeline.draw(&surface()).unwrap();
    }
    assert_eq!(pipeline.frame_index(), 5);
    // drop drains with the configured timeout
    drop(pipeline);
    assert_eq!(controller.wait_idle_calls(), 1);
}

// ============================================================================
// ANIMATION SNAPSHOT
// ============================================================================

#[test]
fn test_restored_animation_replays_frames() {
    let (mut first, first_ctl) = build(MockGraphicsDevice::auto_completing(), PipelineConfig::default());
    for _ in 0..5 {
        first.draw(&surface()).unwrap();
    }
    let snapshot = first.animation();
    first.draw(&surface()).unwrap();
    let expected = first_ctl.gpu_visible(first.ring().slot(2).unwrap().instance_handle()).unwrap();

    let (second, second_ctl) = build(MockGraphicsDevice::auto_completing(), PipelineConfig::default());
    let mut second = second.with_animation(snapshot);
    second.draw(&surface()).unwrap();
    let replayed = second_ctl.gpu_visible(second.ring().slot(0).unwrap().instance_handle()).unwrap();

    assert_eq!(replayed, expected);
}

// ============================================================================
// SHUTDOWN
// ============================================================================

#[test]
fn test_shutdown_waits_for_outstanding_frames() {
    let (mut pipeline, controller) = build(MockGraphicsDevice::new(), PipelineConfig::default());
    pipeline.draw(&surface()).unwrap();
    pipeline.draw(&surface()).unwrap();

    let completer = {
        let controller = controller.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            controller.complete_all()
        })
    };
    pipeline.shutdown().unwrap();
    assert_eq!(completer.join().unwrap(), 2);
    assert_eq!(controller.wait_idle_calls(), 1);
}

#[test]
fn test_drop_drains_with_bounded_wait() {
    let config = PipelineConfig::default().with_acquire_timeout(Duration::from_millis(20));
    let (mut pipeline, controller) = build(MockGraphicsDevice::new(), config);
    pipeline.draw(&surface()).unwrap();

    drop(pipeline);
    assert_eq!(controller.wait_idle_calls(), 1);
    assert_eq!(controller.pending_count(), 0);
}

#[test]
fn test_idle_pipeline_drop_calls_wait_idle_once() {
    let (pipeline, controller) = build(MockGraphicsDevice::new(), PipelineConfig::default());
    pipeline.shutdown().unwrap();
    assert_eq!(controller.wait_idle_calls(), 1);
}
