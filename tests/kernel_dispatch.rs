// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Dispatch on explicit devices: argument checks, bindings, specialization and retention.

use kernels_and_images::context::{Context, ContextConfig};
use kernels_and_images::error::ExecuteError;
use kernels_and_images::explicit::simulated::{SimulatedConfig, SimulatedDriver};
use kernels_and_images::explicit::{AccessFlags, BoundArgument, ImageLayout};
use kernels_and_images::indirect::{ALL_COMMANDS, IndirectCommandPipeline};
use kernels_and_images::kernel::{ArgSpec, KernelDesc, KernelProgram};
use kernels_and_images::memory_flags::MemoryFlags;
use kernels_and_images::pixel_formats::{Access, ImageExtent, ImageFormat};
use std::sync::Arc;

fn simulated() -> (Arc<SimulatedDriver>, Context) {
    let driver = Arc::new(SimulatedDriver::new(SimulatedConfig {
        cooperative_dispatch: true,
        ..SimulatedConfig::default()
    }));
    let context = Context::explicit(driver.clone(), &ContextConfig::default());
    (driver, context)
}

fn binary() -> KernelProgram {
    KernelProgram::Binary(vec![0x07, 0x23, 0x02, 0x03])
}

#[test]
fn dispatches_bind_every_argument() {
    let (driver, context) = simulated();
    let queue = context.create_queue(context.device()).unwrap();
    let buffer = context.create_buffer(&queue, 256, MemoryFlags::READ_WRITE, None);
    let image = context.create_image(
        &queue,
        ImageExtent::new_2d(64, 32),
        ImageFormat::IMAGE_2D | ImageFormat::RGBA8,
        MemoryFlags::READ_WRITE,
        None,
        None,
    );
    let kernel = context
        .create_kernel(
            KernelDesc::new("blur")
                .arg(ArgSpec::Buffer)
                .arg(ArgSpec::Image {
                    access: Access::Read,
                })
                .arg(ArgSpec::scalar::<u32>()),
            binary(),
        )
        .unwrap();
    driver.clear_logs();
    queue
        .execute(&kernel, [64, 32], [8, 8], (&buffer, &image, 5u32))
        .unwrap();
    queue.finish().unwrap();

    let dispatches = driver.dispatches();
    assert_eq!(dispatches.len(), 1);
    let dispatch = &dispatches[0];
    assert_eq!(dispatch.local_size, [8, 8, 1]);
    assert_eq!(dispatch.groups, [8, 4, 1]);
    assert_eq!(dispatch.arguments.len(), 3);
    assert_eq!(
        dispatch.arguments[0],
        BoundArgument::Buffer(buffer.native_handle().unwrap())
    );
    match &dispatch.arguments[1] {
        BoundArgument::Image { view, layout, .. } => {
            assert_eq!(Some(*view), image.native_view());
            //general with read access serves reads as is
            assert_eq!(*layout, ImageLayout::General);
        }
        other => panic!("unexpected binding {other:?}"),
    }
    assert_eq!(dispatch.arguments[2], BoundArgument::Bytes(5u32.to_le_bytes().to_vec()));
    assert!(driver.submitted_barriers().is_empty());
}

#[test]
fn written_images_are_transitioned_before_the_dispatch() {
    let (driver, context) = simulated();
    let queue = context.create_queue(context.device()).unwrap();
    let image = context.create_image(
        &queue,
        ImageExtent::new_2d(16, 16),
        ImageFormat::IMAGE_2D | ImageFormat::R8,
        MemoryFlags::READ,
        None,
        None,
    );
    assert_eq!(image.layout(), Some(ImageLayout::ShaderReadOnlyOptimal));
    let kernel = context
        .create_kernel(
            KernelDesc::new("fill").arg(ArgSpec::Image {
                access: Access::Write,
            }),
            binary(),
        )
        .unwrap();
    driver.clear_logs();
    queue.execute(&kernel, [16, 16], [16, 16], (&image,)).unwrap();
    queue.finish().unwrap();

    let barriers = driver.submitted_barriers();
    assert_eq!(barriers.len(), 1);
    assert_eq!(barriers[0].old_layout, ImageLayout::ShaderReadOnlyOptimal);
    assert_eq!(barriers[0].new_layout, ImageLayout::General);
    assert_eq!(barriers[0].dst_access, AccessFlags::SHADER_WRITE);
    assert_eq!(image.layout(), Some(ImageLayout::General));
    assert_eq!(driver.dispatches().len(), 1);
}

#[test]
fn arguments_are_checked_against_the_signature() {
    let (driver, context) = simulated();
    let queue = context.create_queue(context.device()).unwrap();
    let buffer = context.create_buffer(&queue, 16, MemoryFlags::READ_WRITE, None);
    let kernel = context
        .create_kernel(
            KernelDesc::new("scale")
                .arg(ArgSpec::Buffer)
                .arg(ArgSpec::scalar::<f32>()),
            binary(),
        )
        .unwrap();
    assert!(matches!(
        queue.execute(&kernel, 16u32, 16u32, (&buffer,)),
        Err(ExecuteError::ArgumentCount {
            expected: 2,
            actual: 1,
            ..
        })
    ));
    assert!(matches!(
        queue.execute(&kernel, 16u32, 16u32, (2.0f32, &buffer)),
        Err(ExecuteError::ArgumentKind { index: 0, .. })
    ));
    assert!(matches!(
        queue.execute(&kernel, 16u32, 16u32, (&buffer, 2.0f64)),
        Err(ExecuteError::ArgumentKind { index: 1, .. })
    ));
    assert_eq!(
        queue.execute(&kernel, 16u32, 0u32, (&buffer, 2.0f32)),
        Err(ExecuteError::ZeroLocalSize)
    );
    assert_eq!(
        queue.execute(&kernel, [64, 64], [64, 32], (&buffer, 2.0f32)),
        Err(ExecuteError::LocalSizeTooLarge {
            size: 2048,
            max: 1024
        })
    );
    assert!(driver.dispatches().is_empty());
    assert_eq!(driver.pipelines_created(), 0);
}

#[test]
fn pipelines_are_specialized_once_per_local_size() {
    let (driver, context) = simulated();
    let queue = context.create_queue(context.device()).unwrap();
    let kernel = context
        .create_kernel(KernelDesc::new("noop"), binary())
        .unwrap();
    queue.execute(&kernel, 64u32, 8u32, ()).unwrap();
    queue.execute(&kernel, 128u32, 8u32, ()).unwrap();
    queue.execute(&kernel, [64, 64], [8, 8], ()).unwrap();
    queue.finish().unwrap();
    assert_eq!(driver.pipelines_created(), 2);

    let dispatches = driver.dispatches();
    assert_eq!(dispatches[0].pipeline, dispatches[1].pipeline);
    assert_ne!(dispatches[0].pipeline, dispatches[2].pipeline);
    assert_eq!(dispatches[1].groups, [16, 1, 1]);

    drop(kernel);
    assert_eq!(driver.live_objects().pipelines, 0);
}

#[test]
fn partial_groups_round_up() {
    let (driver, context) = simulated();
    let queue = context.create_queue(context.device()).unwrap();
    let kernel = context
        .create_kernel(KernelDesc::new("noop"), binary())
        .unwrap();
    queue.execute(&kernel, [100, 10, 3], [32, 4, 1], ()).unwrap();
    assert_eq!(driver.dispatches()[0].groups, [4, 3, 3]);
}

#[test]
fn arguments_live_until_the_work_completes() {
    let (driver, context) = simulated();
    let queue = context.create_queue(context.device()).unwrap();
    let buffer = context.create_buffer(&queue, 64, MemoryFlags::READ_WRITE, None);
    let kernel = context
        .create_kernel(KernelDesc::new("touch").arg(ArgSpec::Buffer), binary())
        .unwrap();
    queue.execute(&kernel, 64u32, 64u32, (&buffer,)).unwrap();
    assert_eq!(queue.pending_submissions(), 1);
    assert_eq!(Arc::strong_count(&buffer), 2);
    assert_eq!(Arc::strong_count(&kernel), 2);

    queue.finish().unwrap();
    assert_eq!(queue.pending_submissions(), 0);
    assert_eq!(Arc::strong_count(&buffer), 1);
    assert_eq!(Arc::strong_count(&kernel), 1);

    //the simulated device completes work on submission, so flushing releases it too
    queue.execute(&kernel, 64u32, 64u32, (&buffer,)).unwrap();
    queue.flush();
    assert_eq!(queue.pending_submissions(), 0);
    assert_eq!(Arc::strong_count(&buffer), 1);
    assert_eq!(driver.live_objects().command_recordings, 0);
}

#[test]
fn cooperative_dispatch_follows_the_device() {
    let (driver, context) = simulated();
    let queue = context.create_queue(context.device()).unwrap();
    let kernel = context
        .create_kernel(KernelDesc::new("reduce"), binary())
        .unwrap();
    queue
        .execute_cooperative(&kernel, 256u32, 64u32, ())
        .unwrap();
    assert_eq!(driver.dispatches().len(), 1);

    let plain = Context::with_config(&ContextConfig {
        cooperative_dispatch: false,
        ..ContextConfig::default()
    });
    let queue = plain.create_queue(plain.device()).unwrap();
    let kernel = plain
        .create_kernel(KernelDesc::new("reduce"), binary())
        .unwrap();
    assert_eq!(
        queue.execute_cooperative(&kernel, 256u32, 64u32, ()),
        Err(ExecuteError::CooperativeUnsupported)
    );
}

#[test]
fn kernels_need_an_entry_for_the_queue_device() {
    let (_driver, context) = simulated();
    let context = context.merge(Context::host());
    let queue = context.create_queue(&context.devices()[0]).unwrap();
    let host_only = context
        .create_kernel(KernelDesc::new("cpu"), KernelProgram::host(|_, _| {}))
        .unwrap();
    assert_eq!(
        queue.execute(&host_only, 1u32, 1u32, ()),
        Err(ExecuteError::NoEntry("cpu".to_string()))
    );
}

#[test]
fn arguments_must_belong_to_the_queue_device() {
    let (_first, context) = simulated();
    let (_second, other) = simulated();
    let context = context.merge(other);
    let queue = context.create_queue(&context.devices()[0]).unwrap();
    let other_queue = context.create_queue(&context.devices()[1]).unwrap();
    let foreign = context.create_buffer(&other_queue, 16, MemoryFlags::READ_WRITE, None);
    let kernel = context
        .create_kernel(KernelDesc::new("touch").arg(ArgSpec::Buffer), binary())
        .unwrap();
    assert!(kernel.has_entry(&context.devices()[1]));
    assert_eq!(
        queue.execute(&kernel, 16u32, 16u32, (&foreign,)),
        Err(ExecuteError::InvalidObject)
    );
    other_queue
        .execute(&kernel, 16u32, 16u32, (&foreign,))
        .unwrap();
}

#[test]
fn recordings_submit_together_or_not_at_all() {
    let (driver, context) = simulated();
    let queue = context.create_queue(context.device()).unwrap();
    let kernel = context
        .create_kernel(KernelDesc::new("noop"), binary())
        .unwrap();

    let mut recording = queue.begin_recording().unwrap();
    recording.execute(&kernel, 8u32, 8u32, ()).unwrap();
    recording.execute(&kernel, 8u32, 8u32, ()).unwrap();
    recording.discard();
    assert!(driver.dispatches().is_empty());
    assert_eq!(driver.live_objects().command_recordings, 0);

    let mut recording = queue.begin_recording().unwrap();
    recording.execute(&kernel, 8u32, 8u32, ()).unwrap();
    recording.execute(&kernel, 16u32, 8u32, ()).unwrap();
    assert!(driver.dispatches().is_empty());
    recording.submit().unwrap();
    assert_eq!(queue.pending_submissions(), 1);
    queue.finish().unwrap();
    assert_eq!(driver.dispatches().len(), 2);
}

#[test]
fn indirect_pipelines_replay_ranges() {
    let (driver, context) = simulated();
    let queue = context.create_queue(context.device()).unwrap();
    let kernel = context
        .create_kernel(
            KernelDesc::new("step").arg(ArgSpec::scalar::<u32>()),
            binary(),
        )
        .unwrap();
    let mut pipeline = IndirectCommandPipeline::new();
    for step in 0..4u32 {
        pipeline
            .add_command(&kernel, 64u32, 8u32, (step,))
            .unwrap();
    }

    queue.execute_indirect(&pipeline, 1, 2).unwrap();
    assert_eq!(queue.pending_submissions(), 1);
    let dispatches = driver.dispatches();
    assert_eq!(dispatches.len(), 2);
    assert_eq!(
        dispatches[0].arguments,
        vec![BoundArgument::Bytes(1u32.to_le_bytes().to_vec())]
    );
    assert_eq!(
        dispatches[1].arguments,
        vec![BoundArgument::Bytes(2u32.to_le_bytes().to_vec())]
    );

    driver.clear_logs();
    queue.execute_indirect(&pipeline, 2, ALL_COMMANDS).unwrap();
    assert_eq!(driver.dispatches().len(), 2);

    driver.clear_logs();
    queue.execute_indirect_all(&pipeline).unwrap();
    assert_eq!(driver.dispatches().len(), 4);

    assert_eq!(
        queue.execute_indirect(&pipeline, 3, 2),
        Err(ExecuteError::CommandRange {
            offset: 3,
            count: 2,
            len: 4
        })
    );
    queue.finish().unwrap();
}

#[test]
fn indirect_execution_needs_support() {
    let context = Context::with_config(&ContextConfig {
        indirect_compute: false,
        ..ContextConfig::default()
    });
    let queue = context.create_queue(context.device()).unwrap();
    let kernel = context
        .create_kernel(KernelDesc::new("noop"), binary())
        .unwrap();
    let mut pipeline = IndirectCommandPipeline::new();
    pipeline.add_command(&kernel, 8u32, 8u32, ()).unwrap();
    assert_eq!(
        queue.execute_indirect_all(&pipeline),
        Err(ExecuteError::IndirectUnsupported)
    );
}

#[test]
fn buffer_transfers_round_trip_through_the_device() {
    let (driver, context) = simulated();
    let queue = context.create_queue(context.device()).unwrap();
    let source = context.create_buffer(&queue, 8, MemoryFlags::READ_WRITE, None);
    let target = context.create_buffer(&queue, 8, MemoryFlags::READ_WRITE, None);
    source.write(&queue, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
    target.copy_from(&queue, None, &source).unwrap();
    assert_eq!(target.read(&queue).unwrap(), vec![1, 2, 3, 4, 5, 6, 7, 8]);
    target.zero(&queue).unwrap();
    assert_eq!(target.read(&queue).unwrap(), vec![0; 8]);

    drop(source);
    drop(target);
    queue.finish().unwrap();
    assert_eq!(driver.live_objects().buffers, 0);
    assert_eq!(driver.live_objects().memories, 0);
}
