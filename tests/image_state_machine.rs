// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Layout and access tracking of explicit images, observed through the simulated driver.

use kernels_and_images::context::{Context, ContextConfig};
use kernels_and_images::error::{CreateError, DriverErrorKind, TransitionError};
use kernels_and_images::explicit::simulated::{LiveObjects, SimulatedConfig, SimulatedDriver};
use kernels_and_images::explicit::{
    AccessFlags, Driver, ExternalImage, ImageCreateFlags, ImageDesc, ImageLayout, ImageType,
    ImageUsage, PipelineStages, QUEUE_FAMILY_IGNORED, ViewDesc, ViewType, ImageAspects,
};
use kernels_and_images::memory::{ForeignInterop, HostMemory};
use kernels_and_images::memory_flags::{ForeignKind, MapFlags, MemoryFlags};
use kernels_and_images::pixel_formats::vulkan::VkFormat;
use kernels_and_images::pixel_formats::{ImageExtent, ImageFlags, ImageFormat};
use std::sync::Arc;

fn simulated(config: &ContextConfig) -> (Arc<SimulatedDriver>, Context) {
    let driver = Arc::new(SimulatedDriver::new(SimulatedConfig::default()));
    let context = Context::explicit(driver.clone(), config);
    (driver, context)
}

fn rgba8() -> ImageFormat {
    ImageFormat::IMAGE_2D | ImageFormat::RGBA8
}

#[test]
fn new_images_make_one_transition_to_their_usage() {
    let (driver, context) = simulated(&ContextConfig::default());
    let queue = context.create_queue(context.device()).unwrap();
    let image = context.create_image(
        &queue,
        ImageExtent::new_2d(256, 256),
        rgba8(),
        MemoryFlags::empty(),
        None,
        None,
    );
    assert!(image.is_valid());
    assert_eq!(image.format().bytes_per_pixel(), 4);
    assert_eq!(image.corrections(), &[kernels_and_images::memory_flags::Correction::DeviceAccessDefaulted]);

    let barriers = driver.submitted_barriers();
    assert_eq!(barriers.len(), 1);
    let barrier = barriers[0];
    assert_eq!(barrier.old_layout, ImageLayout::Undefined);
    assert_eq!(barrier.new_layout, ImageLayout::General);
    assert_eq!(barrier.src_access, AccessFlags::empty());
    assert_eq!(
        barrier.dst_access,
        AccessFlags::SHADER_WRITE | AccessFlags::SHADER_READ
    );
    assert_eq!(barrier.level_count, 1);
    assert_eq!(barrier.layer_count, 1);
    assert_eq!(image.layout(), Some(ImageLayout::General));
}

#[test]
fn satisfied_transitions_record_nothing() {
    let (driver, context) = simulated(&ContextConfig::default());
    let queue = context.create_queue(context.device()).unwrap();
    let image = context.create_image(
        &queue,
        ImageExtent::new_2d(16, 16),
        rgba8(),
        MemoryFlags::READ_WRITE,
        None,
        None,
    );
    driver.clear_logs();

    //general with read access already satisfies a read that allows it
    image.transition_read(&queue, None, true).unwrap();
    assert!(driver.recorded_barriers().is_empty());

    image.transition_read(&queue, None, false).unwrap();
    image.transition_read(&queue, None, false).unwrap();
    let barriers = driver.submitted_barriers();
    assert_eq!(barriers.len(), 1);
    assert_eq!(barriers[0].old_layout, ImageLayout::General);
    assert_eq!(barriers[0].new_layout, ImageLayout::ShaderReadOnlyOptimal);
    assert_eq!(image.access_mask(), Some(AccessFlags::SHADER_READ));

    image
        .transition_write(&queue, None, true, false, false)
        .unwrap();
    image
        .transition_write(&queue, None, true, false, false)
        .unwrap();
    assert_eq!(driver.submitted_barriers().len(), 2);
    assert_eq!(image.layout(), Some(ImageLayout::General));
}

#[test]
fn deferred_transitions_run_on_submit() {
    let (driver, context) = simulated(&ContextConfig::default());
    let queue = context.create_queue(context.device()).unwrap();
    let image = context.create_image(
        &queue,
        ImageExtent::new_2d(8, 8),
        rgba8(),
        MemoryFlags::READ_WRITE,
        None,
        None,
    );
    driver.clear_logs();

    let mut recording = queue.begin_recording().unwrap();
    image
        .transition_read(&queue, Some(&mut recording), false)
        .unwrap();
    //tracked state follows the recording, not its execution
    assert_eq!(image.layout(), Some(ImageLayout::ShaderReadOnlyOptimal));
    assert_eq!(driver.recorded_barriers().len(), 1);
    assert!(driver.submitted_barriers().is_empty());

    recording.submit().unwrap();
    queue.finish().unwrap();
    assert_eq!(driver.submitted_barriers().len(), 1);
    assert_eq!(driver.live_objects().command_recordings, 0);
}

#[test]
fn recordings_of_other_queues_are_rejected() {
    let (_driver, context) = simulated(&ContextConfig::default());
    let queue = context.create_queue(context.device()).unwrap();
    let other = context.create_queue(context.device()).unwrap();
    let image = context.create_image(
        &queue,
        ImageExtent::new_2d(8, 8),
        rgba8(),
        MemoryFlags::READ_WRITE,
        None,
        None,
    );
    let mut recording = other.begin_recording().unwrap();
    assert_eq!(
        image.transition_read(&queue, Some(&mut recording), false),
        Err(TransitionError::ForeignQueue)
    );
    recording.discard();

    let (_other_driver, other_context) = simulated(&ContextConfig::default());
    let foreign = other_context
        .create_queue(other_context.device())
        .unwrap();
    assert_eq!(
        image.transition_read(&foreign, None, false),
        Err(TransitionError::ForeignQueue)
    );
}

#[test]
fn explicit_transitions_narrow_transfer_stages() {
    let (driver, context) = simulated(&ContextConfig::default());
    let queue = context.create_queue(context.device()).unwrap();
    let image = context.create_image(
        &queue,
        ImageExtent::new_2d(8, 8),
        rgba8(),
        MemoryFlags::READ_WRITE,
        None,
        None,
    );
    driver.clear_logs();
    image
        .transition(
            &queue,
            None,
            AccessFlags::TRANSFER_READ,
            ImageLayout::TransferSrcOptimal,
            PipelineStages::ALL_COMMANDS,
            PipelineStages::ALL_COMMANDS,
            QUEUE_FAMILY_IGNORED,
        )
        .unwrap();
    let barrier = driver.submitted_barriers()[0];
    assert_eq!(barrier.new_layout, ImageLayout::TransferSrcOptimal);
    assert_eq!(barrier.dst_stages, PipelineStages::TRANSFER);
    assert_eq!(barrier.src_queue_family, QUEUE_FAMILY_IGNORED);
}

#[test]
fn render_targets_start_in_their_attachment_layout() {
    let (driver, context) = simulated(&ContextConfig::default());
    let queue = context.create_queue(context.device()).unwrap();
    let image = context.create_image(
        &queue,
        ImageExtent::new_2d(32, 32),
        rgba8() | ImageFlags::RENDER_TARGET,
        MemoryFlags::WRITE,
        Some(HostMemory::zeroed(32 * 32 * 4)),
        None,
    );
    assert!(image.is_valid());
    let barriers = driver.submitted_barriers();
    assert_eq!(barriers.len(), 1);
    assert_eq!(barriers[0].new_layout, ImageLayout::ColorAttachmentOptimal);
    assert_eq!(barriers[0].dst_stages, PipelineStages::ALL_GRAPHICS);
    assert_eq!(
        image.transition_write(&queue, None, true, false, false),
        Err(TransitionError::ReadWriteRenderTarget)
    );
    //the attachment state already satisfies a plain write
    image
        .transition_write(&queue, None, false, false, false)
        .unwrap();
    assert_eq!(driver.submitted_barriers().len(), 1);
}

#[test]
fn render_targets_return_to_their_attachment_layout_after_host_access() {
    let (driver, context) = simulated(&ContextConfig::default());
    let queue = context.create_queue(context.device()).unwrap();
    let image = context.create_image(
        &queue,
        ImageExtent::new_2d(4, 4),
        rgba8() | ImageFlags::RENDER_TARGET,
        MemoryFlags::READ_WRITE,
        None,
        None,
    );
    assert!(image.is_valid());
    assert_eq!(image.layout(), Some(ImageLayout::ColorAttachmentOptimal));

    let texels: Vec<u8> = (0..64).collect();
    driver.clear_logs();
    image.write(&queue, &texels).unwrap();
    assert_eq!(image.layout(), Some(ImageLayout::ColorAttachmentOptimal));
    let layouts: Vec<_> = driver
        .submitted_barriers()
        .iter()
        .map(|b| b.new_layout)
        .collect();
    assert_eq!(
        layouts,
        [
            ImageLayout::TransferDstOptimal,
            ImageLayout::ColorAttachmentOptimal
        ]
    );

    assert_eq!(image.read(&queue).unwrap(), texels);
    assert_eq!(image.layout(), Some(ImageLayout::ColorAttachmentOptimal));

    let mut mapping = image.map(&queue, MapFlags::READ | MapFlags::WRITE).unwrap();
    mapping[0] = 200;
    mapping.unmap().unwrap();
    assert_eq!(image.layout(), Some(ImageLayout::ColorAttachmentOptimal));
    assert_eq!(image.read(&queue).unwrap()[0], 200);
}

#[test]
fn uploads_are_submitted_once() {
    let (driver, context) = simulated(&ContextConfig::default());
    let queue = context.create_queue(context.device()).unwrap();
    let image = context.create_image(
        &queue,
        ImageExtent::new_2d(2, 2),
        rgba8(),
        MemoryFlags::READ_WRITE,
        None,
        None,
    );
    driver.clear_logs();
    image.write(&queue, &[1; 16]).unwrap();
    assert_eq!(driver.submissions(), 1);
    let barriers = driver.submitted_barriers();
    assert_eq!(barriers.len(), 2);
    assert_eq!(barriers[0].new_layout, ImageLayout::TransferDstOptimal);
    assert_eq!(barriers[1].new_layout, ImageLayout::General);
    assert_eq!(image.layout(), Some(ImageLayout::General));
}

#[test]
fn aliased_array_layers_share_one_allocation() {
    let (driver, context) = simulated(&ContextConfig::default());
    let queue = context.create_queue(context.device()).unwrap();
    let image = context.create_image(
        &queue,
        ImageExtent::new_2d(64, 64).with_layers(4),
        ImageFormat::IMAGE_2D_ARRAY | ImageFormat::RGBA8,
        MemoryFlags::READ_WRITE | MemoryFlags::ALIASING,
        None,
        None,
    );
    assert!(image.is_valid());
    let layers = image.layer_handles();
    assert_eq!(layers.len(), 4);
    let layer_size = 64 * 64 * 4;
    assert_eq!(
        image.layer_offsets(),
        vec![0, layer_size, 2 * layer_size, 3 * layer_size]
    );
    let allocation = image.allocation_size().unwrap();
    assert!(allocation >= 4 * layer_size);

    let (memory, offset) = driver.image_binding(image.native_handle().unwrap()).unwrap();
    assert_eq!(offset, 0);
    assert_eq!(driver.memory_size(memory), Some(allocation));
    for (layer, expected) in layers.iter().zip(image.layer_offsets()) {
        assert_eq!(driver.image_binding(*layer), Some((memory, expected)));
        assert_eq!(driver.image_desc(*layer).unwrap().array_layers, 1);
    }
    let desc = driver.image_desc(image.native_handle().unwrap()).unwrap();
    assert!(desc.flags.contains(ImageCreateFlags::ALIAS));

    drop(image);
    assert_eq!(driver.live_objects().images, 0);
}

#[test]
fn failed_creation_releases_everything() {
    let (driver, context) = simulated(&ContextConfig::default());
    let queue = context.create_queue(context.device()).unwrap();
    driver.fail_on("create_image_view", 1);
    let image = context.create_image(
        &queue,
        ImageExtent::new_2d(16, 16),
        rgba8(),
        MemoryFlags::READ_WRITE,
        None,
        None,
    );
    assert!(!image.is_valid());
    match image.creation_error() {
        Some(CreateError::Driver(e)) => {
            assert_eq!(e.operation, "create_image_view");
            assert_eq!(e.kind, DriverErrorKind::Injected);
        }
        other => panic!("unexpected creation result {other:?}"),
    }
    assert!(image.read(&queue).is_err());
    drop(image);
    queue.finish().unwrap();
    assert_eq!(driver.live_objects(), LiveObjects::default());
}

#[test]
fn three_channel_images_are_stored_with_four() {
    let (driver, context) = simulated(&ContextConfig::default());
    let queue = context.create_queue(context.device()).unwrap();
    let image = context.create_image(
        &queue,
        ImageExtent::new_2d(2, 1),
        ImageFormat::IMAGE_2D | ImageFormat::RGB8,
        MemoryFlags::READ_WRITE,
        Some(HostMemory::new(vec![1, 2, 3, 4, 5, 6])),
        None,
    );
    assert!(image.is_valid());
    assert!(image.info().is_shimmed());
    assert_eq!(image.info().storage_format.channel_count(), 4);
    let desc = driver.image_desc(image.native_handle().unwrap()).unwrap();
    assert_eq!(desc.format, VkFormat::R8G8B8A8_UNORM);
    assert_eq!(image.read(&queue).unwrap(), vec![1, 2, 3, 255, 4, 5, 6, 255]);
    //reads leave the transfer layout again
    assert_eq!(image.layout(), Some(ImageLayout::General));
}

#[test]
fn host_data_must_cover_the_chain() {
    let (_driver, context) = simulated(&ContextConfig::default());
    let queue = context.create_queue(context.device()).unwrap();
    let image = context.create_image(
        &queue,
        ImageExtent::new_2d(4, 4),
        rgba8(),
        MemoryFlags::READ_WRITE,
        Some(HostMemory::zeroed(10)),
        None,
    );
    assert_eq!(
        image.creation_error(),
        Some(&CreateError::HostDataSize {
            expected: 64,
            actual: 10
        })
    );
}

#[test]
fn mip_maps_are_generated_from_level_zero() {
    let (driver, context) = simulated(&ContextConfig::default());
    let queue = context.create_queue(context.device()).unwrap();
    let texel = [8u8, 16, 32, 255];
    let image = context.create_image(
        &queue,
        ImageExtent::new_2d(4, 4),
        rgba8() | ImageFlags::MIPMAPPED,
        MemoryFlags::READ_WRITE | MemoryFlags::GENERATE_MIP_MAPS,
        Some(HostMemory::new(texel.repeat(16))),
        None,
    );
    assert!(image.is_valid());
    assert_eq!(image.info().mip_levels, 3);
    //one view per level, padded to the device's limit
    let views = image.level_views();
    assert_eq!(views.len(), 15);
    assert_eq!(driver.view_desc(views[2]).unwrap().base_level, 2);
    assert_eq!(views[14], views[2]);

    let data = image.read(&queue).unwrap();
    assert_eq!(data.len(), 64 + 16 + 4);
    assert_eq!(&data[64..68], &texel);
    assert_eq!(&data[80..84], &texel);

    let other = [100u8, 0, 0, 255];
    image.write(&queue, &other.repeat(16)).unwrap();
    let data = image.read(&queue).unwrap();
    assert_eq!(&data[80..84], &other);
}

#[test]
fn writing_mappings_upload_on_unmap() {
    let (_driver, context) = simulated(&ContextConfig::default());
    let queue = context.create_queue(context.device()).unwrap();
    let image = context.create_image(
        &queue,
        ImageExtent::new_2d(2, 2),
        ImageFormat::IMAGE_2D | ImageFormat::R8,
        MemoryFlags::READ_WRITE,
        None,
        None,
    );
    let mut mapping = image.map(&queue, MapFlags::WRITE_INVALIDATE).unwrap();
    mapping.copy_from_slice(&[9, 8, 7, 6]);
    mapping.unmap().unwrap();
    assert_eq!(image.read(&queue).unwrap(), vec![9, 8, 7, 6]);
    image.zero(&queue).unwrap();
    assert_eq!(image.read(&queue).unwrap(), vec![0; 4]);
}

#[test]
fn cube_maps_must_be_square() {
    let (driver, context) = simulated(&ContextConfig::default());
    let queue = context.create_queue(context.device()).unwrap();
    let image = context.create_image(
        &queue,
        ImageExtent::new_2d(4, 8),
        ImageFormat::IMAGE_CUBE | ImageFormat::RGBA8,
        MemoryFlags::READ_WRITE,
        None,
        None,
    );
    assert_eq!(
        image.creation_error(),
        Some(&CreateError::NonSquareCube {
            width: 4,
            height: 8
        })
    );
    assert_eq!(driver.live_objects().images, 0);

    let cube = context.create_image(
        &queue,
        ImageExtent::new_2d(8, 8),
        ImageFormat::IMAGE_CUBE | ImageFormat::RGBA8,
        MemoryFlags::READ_WRITE,
        None,
        None,
    );
    assert_eq!(cube.info().layers, 6);
    let desc = driver.image_desc(cube.native_handle().unwrap()).unwrap();
    assert!(desc.flags.contains(ImageCreateFlags::CUBE_COMPATIBLE));
    assert_eq!(desc.array_layers, 6);
}

#[test]
fn shared_images_export_their_allocation_once() {
    let (_driver, context) = simulated(&ContextConfig::default());
    let queue = context.create_queue(context.device()).unwrap();
    let image = context.create_image(
        &queue,
        ImageExtent::new_2d(8, 8),
        rgba8(),
        MemoryFlags::READ_WRITE | MemoryFlags::SHARING,
        None,
        Some(ForeignInterop {
            kind: ForeignKind::OpaqueFd,
            id: 3,
        }),
    );
    assert!(image.is_valid());
    let handle = image.shared_handle().unwrap();
    assert_eq!(handle.kind, ForeignKind::OpaqueFd);
    assert_eq!(image.shared_handle(), Some(handle));
}

#[test]
fn debug_labels_follow_the_configuration() {
    let (driver, context) = simulated(&ContextConfig {
        debug_labels: true,
        ..ContextConfig::default()
    });
    let queue = context.create_queue(context.device()).unwrap();
    let image = context.create_image(
        &queue,
        ImageExtent::new_2d(8, 8),
        rgba8(),
        MemoryFlags::READ_WRITE,
        None,
        None,
    );
    image.set_debug_label("albedo");
    let handle = image.native_handle().unwrap();
    assert_eq!(driver.debug_label(handle.0), Some("albedo".to_string()));

    let (quiet, context) = simulated(&ContextConfig::default());
    let queue = context.create_queue(context.device()).unwrap();
    let image = context.create_image(
        &queue,
        ImageExtent::new_2d(8, 8),
        rgba8(),
        MemoryFlags::READ_WRITE,
        None,
        None,
    );
    image.set_debug_label("albedo");
    assert_eq!(quiet.debug_label(image.native_handle().unwrap().0), None);
}

#[test]
fn wrapped_images_are_never_destroyed() {
    let (driver, context) = simulated(&ContextConfig::default());
    let queue = context.create_queue(context.device()).unwrap();
    let native = driver
        .create_image(&ImageDesc {
            image_type: ImageType::D2,
            format: VkFormat::R8G8B8A8_UNORM,
            extent: [16, 16, 1],
            mip_levels: 1,
            array_layers: 1,
            samples: 1,
            usage: ImageUsage::SAMPLED | ImageUsage::STORAGE,
            flags: ImageCreateFlags::empty(),
            export: None,
        })
        .unwrap();
    let view = driver
        .create_image_view(&ViewDesc {
            image: native,
            view_type: ViewType::D2,
            format: VkFormat::R8G8B8A8_UNORM,
            aspects: ImageAspects::COLOR,
            base_level: 0,
            level_count: 1,
            base_layer: 0,
            layer_count: 1,
        })
        .unwrap();
    let external = ExternalImage {
        image: native,
        view,
        format: VkFormat::R8G8B8A8_UNORM,
        shape: ImageFormat::IMAGE_2D,
        extent: ImageExtent::new_2d(16, 16),
        layout: ImageLayout::ShaderReadOnlyOptimal,
        access: AccessFlags::SHADER_READ,
    };
    let image = context.wrap_image(&queue, &external, MemoryFlags::READ_WRITE);
    assert!(image.is_valid());
    assert!(image.is_external());
    assert_eq!(image.format().channel_count(), 4);
    assert_eq!(image.layout(), Some(ImageLayout::ShaderReadOnlyOptimal));

    image
        .transition_write(&queue, None, true, false, false)
        .unwrap();
    let barrier = *driver.submitted_barriers().last().unwrap();
    assert_eq!(barrier.image, native);
    assert_eq!(barrier.old_layout, ImageLayout::ShaderReadOnlyOptimal);

    image
        .update_with_external_state(
            ImageLayout::ColorAttachmentOptimal,
            AccessFlags::COLOR_ATTACHMENT_WRITE,
        )
        .unwrap();
    assert_eq!(image.layout(), Some(ImageLayout::ColorAttachmentOptimal));

    drop(image);
    let live = driver.live_objects();
    assert_eq!(live.images, 1);
    assert_eq!(live.views, 1);
}

#[test]
fn wrapping_needs_an_explicit_device() {
    let context = Context::host();
    let queue = context.create_queue(context.device()).unwrap();
    let external = ExternalImage {
        image: kernels_and_images::explicit::ImageHandle(1),
        view: kernels_and_images::explicit::ViewHandle(2),
        format: VkFormat::R8G8B8A8_UNORM,
        shape: ImageFormat::IMAGE_2D,
        extent: ImageExtent::new_2d(16, 16),
        layout: ImageLayout::General,
        access: AccessFlags::empty(),
    };
    let image = context.wrap_image(&queue, &external, MemoryFlags::READ_WRITE);
    assert_eq!(
        image.creation_error(),
        Some(&CreateError::Unsupported("wrapping native images"))
    );
}
