// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Kernels on the host backend, reading and writing real bytes.

use kernels_and_images::buffer::ArgumentBuffer;
use kernels_and_images::context::Context;
use kernels_and_images::error::ExecuteError;
use kernels_and_images::indirect::IndirectCommandPipeline;
use kernels_and_images::kernel::{ArgSpec, KernelDesc, KernelProgram};
use kernels_and_images::memory::HostMemory;
use kernels_and_images::memory_flags::{Correction, MapFlags, MemoryFlags};
use kernels_and_images::pixel_formats::{Access, ImageExtent, ImageFlags, ImageFormat};
use std::sync::Arc;

#[test]
fn kernels_write_buffers() {
    let context = Context::host();
    let queue = context.create_queue(context.device()).unwrap();
    let buffer = context.create_buffer(&queue, 32, MemoryFlags::READ_WRITE, None);
    let iota = context
        .create_kernel(
            KernelDesc::new("iota")
                .arg(ArgSpec::Buffer)
                .arg(ArgSpec::scalar::<u32>()),
            KernelProgram::host(|item, args| {
                let base: u32 = args.scalar(1).unwrap();
                let i = item.global_id[0];
                args.write(0, i as usize, base + i);
            }),
        )
        .unwrap();
    queue.execute(&iota, 8u32, 4u32, (&buffer, 10u32)).unwrap();
    queue.finish().unwrap();
    let values: Vec<u32> = buffer
        .read(&queue)
        .unwrap()
        .chunks(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    assert_eq!(values, (10..18).collect::<Vec<u32>>());
}

#[test]
fn kernels_write_image_texels() {
    let context = Context::host();
    let queue = context.create_queue(context.device()).unwrap();
    let image = context.create_image(
        &queue,
        ImageExtent::new_2d(4, 4),
        ImageFormat::IMAGE_2D | ImageFormat::RGBA8,
        MemoryFlags::WRITE,
        None,
        None,
    );
    let coords = context
        .create_kernel(
            KernelDesc::new("coords").arg(ArgSpec::Image {
                access: Access::Write,
            }),
            KernelProgram::host(|item, args| {
                let [x, y, _] = item.global_id;
                let texel = args.texel_mut(0, [x, y, 0]).unwrap();
                texel.copy_from_slice(&[x as u8, y as u8, 0, 255]);
            }),
        )
        .unwrap();
    queue.execute(&coords, [4, 4], [2, 2], (&image,)).unwrap();
    let data = image.read(&queue).unwrap();
    assert_eq!(data.len(), 64);
    let offset = (2 * 4 + 1) * 4;
    assert_eq!(&data[offset..offset + 4], &[1, 2, 0, 255]);
}

#[test]
fn array_layers_are_addressed_after_the_spatial_coordinates() {
    let context = Context::host();
    let queue = context.create_queue(context.device()).unwrap();
    let image = context.create_image(
        &queue,
        ImageExtent::new_2d(2, 2).with_layers(3),
        ImageFormat::IMAGE_2D_ARRAY | ImageFormat::R8,
        MemoryFlags::READ_WRITE,
        None,
        None,
    );
    let layers = context
        .create_kernel(
            KernelDesc::new("layers").arg(ArgSpec::Image {
                access: Access::ReadWrite,
            }),
            KernelProgram::host(|item, args| {
                let info = args.image_info(0).unwrap();
                assert_eq!(info.layers, 3);
                let texel = args.texel_mut(0, item.global_id).unwrap();
                texel[0] = item.global_id[2] as u8 + 1;
            }),
        )
        .unwrap();
    queue.execute(&layers, [2, 2, 3], [1, 1, 1], (&image,)).unwrap();
    assert_eq!(
        image.read(&queue).unwrap(),
        vec![1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3]
    );
}

#[test]
fn mip_maps_average_the_level_above() {
    let context = Context::host();
    let queue = context.create_queue(context.device()).unwrap();
    let level0 = vec![0, 0, 0, 0, 4, 4, 4, 4, 8, 8, 8, 8, 12, 12, 12, 12];
    let image = context.create_image(
        &queue,
        ImageExtent::new_2d(2, 2),
        ImageFormat::IMAGE_2D | ImageFormat::RGBA8 | ImageFlags::MIPMAPPED,
        MemoryFlags::READ_WRITE | MemoryFlags::GENERATE_MIP_MAPS,
        Some(HostMemory::new(level0.clone())),
        None,
    );
    assert!(image.is_valid());
    assert_eq!(image.info().mip_levels, 2);
    let data = image.read(&queue).unwrap();
    assert_eq!(&data[..16], level0.as_slice());
    assert_eq!(&data[16..], &[6, 6, 6, 6]);

    {
        let mut mapping = image.map(&queue, MapFlags::WRITE_INVALIDATE).unwrap();
        mapping[..16].copy_from_slice(&[20; 16]);
    }
    assert_eq!(&image.read(&queue).unwrap()[16..], &[20, 20, 20, 20]);
}

#[test]
fn host_memory_is_aliased_when_requested() {
    let context = Context::host();
    let queue = context.create_queue(context.device()).unwrap();
    let memory = HostMemory::zeroed(16);
    let buffer = context.create_buffer(
        &queue,
        16,
        MemoryFlags::READ_WRITE | MemoryFlags::USE_HOST_MEMORY,
        Some(memory.clone()),
    );
    assert_eq!(buffer.corrections(), &[Correction::HostAccessForced]);
    assert!(buffer.flags().contains(MemoryFlags::HOST_READ_WRITE));
    let fill = context
        .create_kernel(
            KernelDesc::new("fill").arg(ArgSpec::Buffer),
            KernelProgram::host(|item, args| {
                args.write(0, item.global_id[0] as usize, 0xAAu8);
            }),
        )
        .unwrap();
    queue.execute(&fill, 16u32, 16u32, (&buffer,)).unwrap();
    //no read needed, the kernel wrote the caller's bytes
    assert_eq!(memory.to_vec(), vec![0xAA; 16]);

    let pixels = HostMemory::new(vec![1; 16]);
    let image = context.create_image(
        &queue,
        ImageExtent::new_2d(2, 2),
        ImageFormat::IMAGE_2D | ImageFormat::RGBA8,
        MemoryFlags::READ_WRITE | MemoryFlags::HOST_READ_WRITE | MemoryFlags::USE_HOST_MEMORY,
        Some(pixels.clone()),
        None,
    );
    assert!(image.corrections().is_empty());
    image.write(&queue, &[3; 16]).unwrap();
    assert_eq!(pixels.to_vec(), vec![3; 16]);
}

#[test]
fn host_images_keep_three_channels() {
    let context = Context::host();
    let queue = context.create_queue(context.device()).unwrap();
    let pixels = HostMemory::new(vec![7; 12]);
    let image = context.create_image(
        &queue,
        ImageExtent::new_2d(2, 2),
        ImageFormat::IMAGE_2D | ImageFormat::RGB8,
        MemoryFlags::READ_WRITE | MemoryFlags::USE_HOST_MEMORY,
        Some(pixels.clone()),
        None,
    );
    assert!(image.is_valid());
    //the host backend stores formats as given
    assert!(!image.info().is_shimmed());
    assert_eq!(image.read(&queue).unwrap(), vec![7; 12]);
}

#[test]
fn the_same_memory_cant_be_bound_twice() {
    let context = Context::host();
    let queue = context.create_queue(context.device()).unwrap();
    let buffer = context.create_buffer(&queue, 4, MemoryFlags::READ_WRITE, None);
    let copy = context
        .create_kernel(
            KernelDesc::new("copy")
                .arg(ArgSpec::Buffer)
                .arg(ArgSpec::Buffer),
            KernelProgram::host(|_, _| {}),
        )
        .unwrap();
    assert_eq!(
        queue.execute(&copy, 1u32, 1u32, (&buffer, &buffer)),
        Err(ExecuteError::AliasedArgument { index: 1 })
    );
}

#[test]
fn argument_buffers_are_bound_like_buffers() {
    let context = Context::host();
    let queue = context.create_queue(context.device()).unwrap();
    let table = context.create_buffer(
        &queue,
        8,
        MemoryFlags::READ,
        Some(HostMemory::new([3u32, 4u32].iter().flat_map(|v| v.to_le_bytes()).collect())),
    );
    let arguments = Arc::new(ArgumentBuffer::new(table));
    let out = context.create_buffer(&queue, 4, MemoryFlags::WRITE, None);
    let sum = context
        .create_kernel(
            KernelDesc::new("sum")
                .arg(ArgSpec::ArgumentBuffer)
                .arg(ArgSpec::Buffer),
            KernelProgram::host(|_, args| {
                let a: u32 = args.read(0, 0).unwrap();
                let b: u32 = args.read(0, 1).unwrap();
                args.write(1, 0, a + b);
            }),
        )
        .unwrap();
    queue.execute(&sum, 1u32, 1u32, (&arguments, &out)).unwrap();
    assert_eq!(out.read(&queue).unwrap(), 7u32.to_le_bytes().to_vec());
}

#[test]
fn recordings_run_in_order_on_submit() {
    let context = Context::host();
    let queue = context.create_queue(context.device()).unwrap();
    let buffer = context.create_buffer(&queue, 4, MemoryFlags::READ_WRITE, None);
    let set = context
        .create_kernel(
            KernelDesc::new("set").arg(ArgSpec::Buffer),
            KernelProgram::host(|_, args| {
                args.write(0, 0, 1u32);
            }),
        )
        .unwrap();
    let double = context
        .create_kernel(
            KernelDesc::new("double").arg(ArgSpec::Buffer),
            KernelProgram::host(|_, args| {
                let value: u32 = args.read(0, 0).unwrap();
                args.write(0, 0, value * 2);
            }),
        )
        .unwrap();
    let mut recording = queue.begin_recording().unwrap();
    recording.execute(&set, 1u32, 1u32, (&buffer,)).unwrap();
    recording.execute(&double, 1u32, 1u32, (&buffer,)).unwrap();
    recording.execute(&double, 1u32, 1u32, (&buffer,)).unwrap();
    assert_eq!(buffer.read(&queue).unwrap(), vec![0; 4]);
    recording.submit().unwrap();
    assert_eq!(buffer.read(&queue).unwrap(), 4u32.to_le_bytes().to_vec());
}

#[test]
fn indirect_and_cooperative_work_runs_on_the_host() {
    let context = Context::host();
    let queue = context.create_queue(context.device()).unwrap();
    let buffer = context.create_buffer(&queue, 4, MemoryFlags::READ_WRITE, None);
    let add = context
        .create_kernel(
            KernelDesc::new("add")
                .arg(ArgSpec::Buffer)
                .arg(ArgSpec::scalar::<u32>()),
            KernelProgram::host(|_, args| {
                let step: u32 = args.scalar(1).unwrap();
                let value: u32 = args.read(0, 0).unwrap();
                args.write(0, 0, value + step);
            }),
        )
        .unwrap();
    let mut pipeline = IndirectCommandPipeline::new();
    pipeline.add_command(&add, 1u32, 1u32, (&buffer, 1u32)).unwrap();
    pipeline.add_command(&add, 1u32, 1u32, (&buffer, 10u32)).unwrap();
    pipeline.add_command(&add, 1u32, 1u32, (&buffer, 100u32)).unwrap();
    queue.execute_indirect(&pipeline, 1, 2).unwrap();
    assert_eq!(buffer.read(&queue).unwrap(), 110u32.to_le_bytes().to_vec());

    queue
        .execute_cooperative(&add, 1u32, 1u32, (&buffer, 1u32))
        .unwrap();
    assert_eq!(buffer.read(&queue).unwrap(), 111u32.to_le_bytes().to_vec());
}

#[test]
fn profiling_reports_elapsed_time() {
    let context = Context::host();
    let queue = context.create_queue(context.device()).unwrap();
    assert_eq!(queue.stop_profiling().unwrap(), 0);
    queue.start_profiling();
    std::thread::sleep(std::time::Duration::from_millis(2));
    assert!(queue.stop_profiling().unwrap() >= 1000);
}
