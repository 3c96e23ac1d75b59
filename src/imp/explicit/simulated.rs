// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
An in-process [`Driver`].

The simulated driver keeps every object in host memory and executes a command recording when it
is submitted, so fences are signaled as soon as [`Driver::submit`] returns. Image contents are
stored level after level, each level holding all of its layers, in the bound allocation at the
bound offset; copies, fills and downsamples operate on those bytes. Dispatches are recorded but
compiled kernels are opaque to it, so they do not run.

Besides serving as a headless device, it exposes what a native driver would not:

* a log of every barrier, as recorded and as submitted, and of every dispatch
* counts of live objects, to check that teardown releases exactly what was created
* failure injection for any operation, through [`SimulatedDriver::fail_on`]

```
use kernels_and_images::explicit::simulated::{SimulatedDriver, SimulatedConfig};
use kernels_and_images::explicit::Driver;

let driver = SimulatedDriver::new(SimulatedConfig::default());
assert_eq!(driver.capabilities().device_name, "simulated");
assert_eq!(driver.live_objects().images, 0);
```
*/

use super::{
    BoundArgument, BufferHandle, BufferImageCopy, BufferUsage, CommandsHandle, Driver,
    DriverCapabilities, FenceHandle, ImageBarrier, ImageDesc, ImageHandle, ImageLayout,
    ImageType, MemoryHandle, MemoryLocation, MemoryRequirements, PipelineDesc, PipelineHandle,
    QueueHandle, ViewDesc, ViewHandle,
};
use crate::error::{DriverError, DriverErrorKind};
use crate::memory_flags::ForeignKind;
use crate::pixel_formats::convert;
use crate::pixel_formats::vulkan;
use crate::pixel_formats::{Dimensionality, ImageExtent, ImageFlags, ImageFormat};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

const ALLOCATION_ALIGNMENT: u64 = 256;

/// Capabilities of a simulated device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedConfig {
    pub device_name: String,
    pub cooperative_dispatch: bool,
    pub indirect_compute: bool,
    pub max_total_local_size: u32,
    pub max_mip_levels: u32,
    pub queue_family: u32,
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        SimulatedConfig {
            device_name: "simulated".to_string(),
            cooperative_dispatch: false,
            indirect_compute: true,
            max_total_local_size: 1024,
            max_mip_levels: 15,
            queue_family: 0,
        }
    }
}

/// Number of live objects of each kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LiveObjects {
    pub images: usize,
    pub views: usize,
    pub memories: usize,
    pub buffers: usize,
    pub pipelines: usize,
    pub command_recordings: usize,
}

/// A dispatch as it executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRecord {
    pub pipeline: PipelineHandle,
    /// Work-group size the pipeline was specialized with.
    pub local_size: [u32; 3],
    pub groups: [u32; 3],
    pub arguments: Vec<BoundArgument>,
}

#[derive(Debug, Clone)]
enum Command {
    Barrier(ImageBarrier),
    CopyBufferToImage {
        src: BufferHandle,
        dst: ImageHandle,
        regions: Vec<BufferImageCopy>,
    },
    CopyImageToBuffer {
        src: ImageHandle,
        dst: BufferHandle,
        regions: Vec<BufferImageCopy>,
    },
    CopyBuffer {
        src: BufferHandle,
        dst: BufferHandle,
        size: u64,
    },
    FillBuffer {
        dst: BufferHandle,
        offset: u64,
        size: u64,
        value: u32,
    },
    Downsample {
        image: ImageHandle,
        level: u32,
    },
    BindPipeline(PipelineHandle),
    BindArguments(Vec<BoundArgument>),
    Dispatch([u32; 3]),
}

#[derive(Debug)]
struct Image {
    desc: ImageDesc,
    //layered so that byte sizes cover every array layer
    format: ImageFormat,
    binding: Option<(MemoryHandle, u64)>,
}

impl Image {
    fn extent(&self) -> ImageExtent {
        ImageExtent {
            width: self.desc.extent[0],
            height: self.desc.extent[1],
            depth: self.desc.extent[2],
            layers: self.desc.array_layers,
        }
    }
    fn level_size(&self, level: u32) -> u64 {
        let extent = self.format.level_extent(self.extent(), level);
        self.format.total_byte_size(extent, self.desc.samples)
    }
    fn level_offset(&self, level: u32) -> u64 {
        (0..level).map(|l| self.level_size(l)).sum()
    }
    fn byte_size(&self) -> u64 {
        self.level_offset(self.desc.mip_levels)
    }
}

#[derive(Debug)]
struct Memory {
    bytes: Vec<u8>,
    location: MemoryLocation,
    export: Option<ForeignKind>,
}

#[derive(Debug)]
struct Buffer {
    size: u64,
    binding: Option<(MemoryHandle, u64)>,
}

#[derive(Debug)]
struct Recording {
    commands: Vec<Command>,
    fence: Option<FenceHandle>,
}

#[derive(Debug, Default)]
struct State {
    next_handle: u64,
    queues: Vec<QueueHandle>,
    images: HashMap<ImageHandle, Image>,
    views: HashMap<ViewHandle, ViewDesc>,
    memories: HashMap<MemoryHandle, Memory>,
    buffers: HashMap<BufferHandle, Buffer>,
    pipelines: HashMap<PipelineHandle, PipelineDesc>,
    recordings: HashMap<CommandsHandle, Recording>,
    signaled: Vec<FenceHandle>,
    labels: HashMap<u64, String>,
    recorded_barriers: Vec<ImageBarrier>,
    submitted_barriers: Vec<ImageBarrier>,
    dispatches: Vec<DispatchRecord>,
    pipelines_created: usize,
    submissions: usize,
    //operation and how many more successful calls remain before it fails
    injections: Vec<(&'static str, u32)>,
}

impl State {
    fn next(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    fn check(&mut self, operation: &'static str) -> Result<(), DriverError> {
        let mut failed = false;
        self.injections.retain_mut(|(op, remaining)| {
            if *op != operation || failed {
                return true;
            }
            if *remaining == 0 {
                failed = true;
                false
            } else {
                *remaining -= 1;
                true
            }
        });
        if failed {
            Err(DriverError::new(operation, DriverErrorKind::Injected))
        } else {
            Ok(())
        }
    }

    fn memory_range(
        &mut self,
        binding: Option<(MemoryHandle, u64)>,
        offset: u64,
        len: u64,
    ) -> Option<&mut [u8]> {
        let (memory, base) = binding?;
        let bytes = &mut self.memories.get_mut(&memory)?.bytes;
        let start = (base + offset) as usize;
        let end = start.checked_add(len as usize)?;
        bytes.get_mut(start..end)
    }

    fn read_range(&mut self, binding: Option<(MemoryHandle, u64)>, offset: u64, len: u64) -> Vec<u8> {
        self.memory_range(binding, offset, len)
            .map(|b| b.to_vec())
            .unwrap_or_default()
    }

    fn write_range(&mut self, binding: Option<(MemoryHandle, u64)>, offset: u64, data: &[u8]) {
        if let Some(range) = self.memory_range(binding, offset, data.len() as u64) {
            range.copy_from_slice(data);
        }
    }

    fn execute(&mut self, commands: Vec<Command>) {
        let mut pipeline = None;
        let mut arguments = Vec::new();
        for command in commands {
            match command {
                Command::Barrier(barrier) => self.submitted_barriers.push(barrier),
                Command::CopyBufferToImage { src, dst, regions } => {
                    let (Some(buffer), Some(image)) = (self.buffers.get(&src), self.images.get(&dst))
                    else {
                        continue;
                    };
                    let (buffer_binding, image_binding) = (buffer.binding, image.binding);
                    let sizes: Vec<(u64, u64, u64)> = regions
                        .iter()
                        .map(|r| (r.buffer_offset, image.level_offset(r.level), image.level_size(r.level)))
                        .collect();
                    for (buffer_offset, image_offset, size) in sizes {
                        let data = self.read_range(buffer_binding, buffer_offset, size);
                        self.write_range(image_binding, image_offset, &data);
                    }
                }
                Command::CopyImageToBuffer { src, dst, regions } => {
                    let (Some(image), Some(buffer)) = (self.images.get(&src), self.buffers.get(&dst))
                    else {
                        continue;
                    };
                    let (image_binding, buffer_binding) = (image.binding, buffer.binding);
                    let sizes: Vec<(u64, u64, u64)> = regions
                        .iter()
                        .map(|r| (r.buffer_offset, image.level_offset(r.level), image.level_size(r.level)))
                        .collect();
                    for (buffer_offset, image_offset, size) in sizes {
                        let data = self.read_range(image_binding, image_offset, size);
                        self.write_range(buffer_binding, buffer_offset, &data);
                    }
                }
                Command::CopyBuffer { src, dst, size } => {
                    let (Some(src), Some(dst)) = (self.buffers.get(&src), self.buffers.get(&dst))
                    else {
                        continue;
                    };
                    let (src_binding, dst_binding) = (src.binding, dst.binding);
                    let data = self.read_range(src_binding, 0, size);
                    self.write_range(dst_binding, 0, &data);
                }
                Command::FillBuffer {
                    dst,
                    offset,
                    size,
                    value,
                } => {
                    let Some(buffer) = self.buffers.get(&dst) else {
                        continue;
                    };
                    let binding = buffer.binding;
                    let pattern = value.to_le_bytes();
                    let data: Vec<u8> = (0..size as usize).map(|i| pattern[i % 4]).collect();
                    self.write_range(binding, offset, &data);
                }
                Command::Downsample { image, level } => {
                    let Some(image) = self.images.get(&image) else {
                        continue;
                    };
                    if level == 0 || level >= image.desc.mip_levels {
                        continue;
                    }
                    let binding = image.binding;
                    let format = image.format;
                    let src_extent = format.level_extent(image.extent(), level - 1);
                    let dst_extent = format.level_extent(image.extent(), level);
                    let (src_offset, src_size) =
                        (image.level_offset(level - 1), image.level_size(level - 1));
                    let dst_offset = image.level_offset(level);
                    let src = self.read_range(binding, src_offset, src_size);
                    let dst = convert::downsample(format, &src, src_extent, dst_extent);
                    self.write_range(binding, dst_offset, &dst);
                }
                Command::BindPipeline(bound) => pipeline = Some(bound),
                Command::BindArguments(bound) => arguments = bound,
                Command::Dispatch(groups) => {
                    let Some(pipeline) = pipeline else {
                        continue;
                    };
                    let local_size = self
                        .pipelines
                        .get(&pipeline)
                        .map_or([0; 3], |desc| desc.local_size);
                    self.dispatches.push(DispatchRecord {
                        pipeline,
                        local_size,
                        groups,
                        arguments: arguments.clone(),
                    });
                }
            }
        }
    }
}

/// The software device. See the [module documentation](self).
#[derive(Debug)]
pub struct SimulatedDriver {
    config: SimulatedConfig,
    state: Mutex<State>,
}

impl SimulatedDriver {
    pub fn new(config: SimulatedConfig) -> Self {
        SimulatedDriver {
            config,
            state: Mutex::new(State::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Makes the `nth` following call (counting from 1) to `operation` fail with
    /// [`DriverErrorKind::Injected`]. Operations are named after the [`Driver`] method, such as
    /// `"allocate_memory"`.
    pub fn fail_on(&self, operation: &'static str, nth: u32) {
        self.state()
            .injections
            .push((operation, nth.saturating_sub(1)));
    }

    pub fn live_objects(&self) -> LiveObjects {
        let state = self.state();
        LiveObjects {
            images: state.images.len(),
            views: state.views.len(),
            memories: state.memories.len(),
            buffers: state.buffers.len(),
            pipelines: state.pipelines.len(),
            command_recordings: state.recordings.len(),
        }
    }

    /// Barriers in the order they were recorded, submitted or not.
    pub fn recorded_barriers(&self) -> Vec<ImageBarrier> {
        self.state().recorded_barriers.clone()
    }

    /// Barriers in the order they executed.
    pub fn submitted_barriers(&self) -> Vec<ImageBarrier> {
        self.state().submitted_barriers.clone()
    }

    pub fn dispatches(&self) -> Vec<DispatchRecord> {
        self.state().dispatches.clone()
    }

    /// Recordings submitted since the logs were last cleared.
    pub fn submissions(&self) -> usize {
        self.state().submissions
    }

    /// How many pipelines were ever created.
    pub fn pipelines_created(&self) -> usize {
        self.state().pipelines_created
    }

    pub fn clear_logs(&self) {
        let mut state = self.state();
        state.recorded_barriers.clear();
        state.submitted_barriers.clear();
        state.dispatches.clear();
        state.submissions = 0;
    }

    pub fn image_desc(&self, image: ImageHandle) -> Option<ImageDesc> {
        self.state().images.get(&image).map(|i| i.desc.clone())
    }

    pub fn view_desc(&self, view: ViewHandle) -> Option<ViewDesc> {
        self.state().views.get(&view).cloned()
    }

    /// Size of an allocation, or `None` once freed.
    pub fn memory_size(&self, memory: MemoryHandle) -> Option<u64> {
        self.state()
            .memories
            .get(&memory)
            .map(|m| m.bytes.len() as u64)
    }

    /// The allocation and offset an image is bound at.
    pub fn image_binding(&self, image: ImageHandle) -> Option<(MemoryHandle, u64)> {
        self.state().images.get(&image).and_then(|i| i.binding)
    }

    pub fn debug_label(&self, object: u64) -> Option<String> {
        self.state().labels.get(&object).cloned()
    }

    fn record(&self, commands: CommandsHandle, command: Command) {
        let mut state = self.state();
        if let Command::Barrier(barrier) = &command {
            state.recorded_barriers.push(*barrier);
        }
        match state.recordings.get_mut(&commands) {
            Some(recording) if recording.fence.is_none() => recording.commands.push(command),
            _ => logwise::warn_sync!("command recorded into an unknown or submitted recording"),
        }
    }
}

impl Default for SimulatedDriver {
    fn default() -> Self {
        SimulatedDriver::new(SimulatedConfig::default())
    }
}

fn align(size: u64) -> u64 {
    size.div_ceil(ALLOCATION_ALIGNMENT).max(1) * ALLOCATION_ALIGNMENT
}

fn invalid(operation: &'static str) -> DriverError {
    DriverError::new(operation, DriverErrorKind::InvalidHandle)
}

impl Driver for SimulatedDriver {
    fn capabilities(&self) -> DriverCapabilities {
        DriverCapabilities {
            device_name: self.config.device_name.clone(),
            cooperative_dispatch: self.config.cooperative_dispatch,
            indirect_compute: self.config.indirect_compute,
            max_total_local_size: self.config.max_total_local_size,
            max_mip_levels: self.config.max_mip_levels,
            queue_family: self.config.queue_family,
        }
    }

    fn get_queue(&self, family: u32, index: u32) -> Result<QueueHandle, DriverError> {
        let mut state = self.state();
        state.check("get_queue")?;
        if family != self.config.queue_family || index != 0 {
            return Err(DriverError::new("get_queue", DriverErrorKind::Unsupported));
        }
        let queue = QueueHandle(state.next());
        state.queues.push(queue);
        Ok(queue)
    }

    fn create_image(&self, desc: &ImageDesc) -> Result<ImageHandle, DriverError> {
        let mut state = self.state();
        state.check("create_image")?;
        let Some(key) = vulkan::format_from_native(desc.format) else {
            return Err(DriverError::new("create_image", DriverErrorKind::Unsupported));
        };
        let dimensionality = match desc.image_type {
            ImageType::D1 => Dimensionality::D1,
            ImageType::D2 => Dimensionality::D2,
            ImageType::D3 => Dimensionality::D3,
        };
        let mut format = key.with_dimensionality(dimensionality).with(ImageFlags::ARRAY);
        if desc.samples > 1 {
            format = format.with(ImageFlags::MSAA);
        }
        let handle = ImageHandle(state.next());
        state.images.insert(
            handle,
            Image {
                desc: desc.clone(),
                format,
                binding: None,
            },
        );
        Ok(handle)
    }

    fn image_memory_requirements(&self, image: ImageHandle) -> MemoryRequirements {
        let size = self.state().images.get(&image).map_or(0, Image::byte_size);
        MemoryRequirements {
            size: align(size),
            alignment: ALLOCATION_ALIGNMENT,
        }
    }

    fn allocate_memory(
        &self,
        size: u64,
        location: MemoryLocation,
        export: Option<ForeignKind>,
    ) -> Result<MemoryHandle, DriverError> {
        let mut state = self.state();
        state.check("allocate_memory")?;
        let handle = MemoryHandle(state.next());
        state.memories.insert(
            handle,
            Memory {
                bytes: vec![0; size as usize],
                location,
                export,
            },
        );
        Ok(handle)
    }

    fn bind_image_memory(
        &self,
        image: ImageHandle,
        memory: MemoryHandle,
        offset: u64,
    ) -> Result<(), DriverError> {
        let mut state = self.state();
        state.check("bind_image_memory")?;
        let memory_size = state
            .memories
            .get(&memory)
            .map(|m| m.bytes.len() as u64)
            .ok_or(invalid("bind_image_memory"))?;
        let image = state
            .images
            .get_mut(&image)
            .ok_or(invalid("bind_image_memory"))?;
        if offset + image.byte_size() > memory_size {
            return Err(DriverError::new(
                "bind_image_memory",
                DriverErrorKind::OutOfDeviceMemory,
            ));
        }
        image.binding = Some((memory, offset));
        Ok(())
    }

    fn create_image_view(&self, desc: &ViewDesc) -> Result<ViewHandle, DriverError> {
        let mut state = self.state();
        state.check("create_image_view")?;
        if !state.images.contains_key(&desc.image) {
            return Err(invalid("create_image_view"));
        }
        let handle = ViewHandle(state.next());
        state.views.insert(handle, desc.clone());
        Ok(handle)
    }

    fn create_buffer(&self, size: u64, _usage: BufferUsage) -> Result<BufferHandle, DriverError> {
        let mut state = self.state();
        state.check("create_buffer")?;
        let handle = BufferHandle(state.next());
        state.buffers.insert(
            handle,
            Buffer {
                size,
                binding: None,
            },
        );
        Ok(handle)
    }

    fn buffer_memory_requirements(&self, buffer: BufferHandle) -> MemoryRequirements {
        let size = self.state().buffers.get(&buffer).map_or(0, |b| b.size);
        MemoryRequirements {
            size: align(size),
            alignment: ALLOCATION_ALIGNMENT,
        }
    }

    fn bind_buffer_memory(
        &self,
        buffer: BufferHandle,
        memory: MemoryHandle,
        offset: u64,
    ) -> Result<(), DriverError> {
        let mut state = self.state();
        state.check("bind_buffer_memory")?;
        if !state.memories.contains_key(&memory) {
            return Err(invalid("bind_buffer_memory"));
        }
        let buffer = state
            .buffers
            .get_mut(&buffer)
            .ok_or(invalid("bind_buffer_memory"))?;
        buffer.binding = Some((memory, offset));
        Ok(())
    }

    fn create_compute_pipeline(&self, desc: &PipelineDesc) -> Result<PipelineHandle, DriverError> {
        let mut state = self.state();
        state.check("create_compute_pipeline")?;
        let handle = PipelineHandle(state.next());
        state.pipelines.insert(handle, desc.clone());
        state.pipelines_created += 1;
        Ok(handle)
    }

    fn write_memory(&self, memory: MemoryHandle, offset: u64, data: &[u8]) -> Result<(), DriverError> {
        let mut state = self.state();
        state.check("write_memory")?;
        let memory = state.memories.get_mut(&memory).ok_or(invalid("write_memory"))?;
        if memory.location != MemoryLocation::HostVisible {
            return Err(DriverError::new("write_memory", DriverErrorKind::Unsupported));
        }
        let start = offset as usize;
        let range = memory
            .bytes
            .get_mut(start..start + data.len())
            .ok_or(invalid("write_memory"))?;
        range.copy_from_slice(data);
        Ok(())
    }

    fn read_memory(&self, memory: MemoryHandle, offset: u64, out: &mut [u8]) -> Result<(), DriverError> {
        let mut state = self.state();
        state.check("read_memory")?;
        let memory = state.memories.get(&memory).ok_or(invalid("read_memory"))?;
        if memory.location != MemoryLocation::HostVisible {
            return Err(DriverError::new("read_memory", DriverErrorKind::Unsupported));
        }
        let start = offset as usize;
        let range = memory
            .bytes
            .get(start..start + out.len())
            .ok_or(invalid("read_memory"))?;
        out.copy_from_slice(range);
        Ok(())
    }

    fn export_memory(&self, memory: MemoryHandle, kind: ForeignKind) -> Result<u64, DriverError> {
        let mut state = self.state();
        state.check("export_memory")?;
        match state.memories.get(&memory) {
            Some(m) if m.export == Some(kind) => Ok(memory.0),
            Some(_) => Err(DriverError::new("export_memory", DriverErrorKind::Unsupported)),
            None => Err(invalid("export_memory")),
        }
    }

    fn set_debug_label(&self, object: u64, label: &str) {
        self.state().labels.insert(object, label.to_string());
    }

    fn begin_commands(&self, queue: QueueHandle) -> Result<CommandsHandle, DriverError> {
        let mut state = self.state();
        state.check("begin_commands")?;
        if !state.queues.contains(&queue) {
            return Err(invalid("begin_commands"));
        }
        let handle = CommandsHandle(state.next());
        state.recordings.insert(
            handle,
            Recording {
                commands: Vec::new(),
                fence: None,
            },
        );
        Ok(handle)
    }

    fn cmd_pipeline_barrier(&self, commands: CommandsHandle, barrier: &ImageBarrier) {
        self.record(commands, Command::Barrier(*barrier));
    }

    fn cmd_copy_buffer_to_image(
        &self,
        commands: CommandsHandle,
        src: BufferHandle,
        dst: ImageHandle,
        _layout: ImageLayout,
        regions: &[BufferImageCopy],
    ) {
        self.record(
            commands,
            Command::CopyBufferToImage {
                src,
                dst,
                regions: regions.to_vec(),
            },
        );
    }

    fn cmd_copy_image_to_buffer(
        &self,
        commands: CommandsHandle,
        src: ImageHandle,
        _layout: ImageLayout,
        dst: BufferHandle,
        regions: &[BufferImageCopy],
    ) {
        self.record(
            commands,
            Command::CopyImageToBuffer {
                src,
                dst,
                regions: regions.to_vec(),
            },
        );
    }

    fn cmd_copy_buffer(&self, commands: CommandsHandle, src: BufferHandle, dst: BufferHandle, size: u64) {
        self.record(commands, Command::CopyBuffer { src, dst, size });
    }

    fn cmd_fill_buffer(
        &self,
        commands: CommandsHandle,
        dst: BufferHandle,
        offset: u64,
        size: u64,
        value: u32,
    ) {
        self.record(
            commands,
            Command::FillBuffer {
                dst,
                offset,
                size,
                value,
            },
        );
    }

    fn cmd_downsample(&self, commands: CommandsHandle, image: ImageHandle, level: u32) {
        self.record(commands, Command::Downsample { image, level });
    }

    fn cmd_bind_pipeline(&self, commands: CommandsHandle, pipeline: PipelineHandle) {
        self.record(commands, Command::BindPipeline(pipeline));
    }

    fn cmd_bind_arguments(
        &self,
        commands: CommandsHandle,
        _pipeline: PipelineHandle,
        arguments: &[BoundArgument],
    ) {
        self.record(commands, Command::BindArguments(arguments.to_vec()));
    }

    fn cmd_dispatch(&self, commands: CommandsHandle, groups: [u32; 3]) {
        self.record(commands, Command::Dispatch(groups));
    }

    fn submit(&self, commands: CommandsHandle) -> Result<FenceHandle, DriverError> {
        let mut state = self.state();
        state.check("submit")?;
        let fence = FenceHandle(state.next());
        let recorded = match state.recordings.get_mut(&commands) {
            Some(recording) if recording.fence.is_none() => {
                recording.fence = Some(fence);
                std::mem::take(&mut recording.commands)
            }
            _ => return Err(invalid("submit")),
        };
        state.submissions += 1;
        state.execute(recorded);
        state.signaled.push(fence);
        Ok(fence)
    }

    fn wait(&self, fence: FenceHandle) -> Result<(), DriverError> {
        let mut state = self.state();
        state.check("wait")?;
        if state.signaled.contains(&fence) {
            Ok(())
        } else {
            Err(invalid("wait"))
        }
    }

    fn fence_signaled(&self, fence: FenceHandle) -> bool {
        self.state().signaled.contains(&fence)
    }

    fn free_commands(&self, commands: CommandsHandle) {
        let mut state = self.state();
        if let Some(recording) = state.recordings.remove(&commands)
            && let Some(fence) = recording.fence
        {
            state.signaled.retain(|f| *f != fence);
        }
    }

    fn destroy_image(&self, image: ImageHandle) {
        if self.state().images.remove(&image).is_none() {
            logwise::warn_sync!("destroying an unknown image");
        }
    }

    fn destroy_image_view(&self, view: ViewHandle) {
        if self.state().views.remove(&view).is_none() {
            logwise::warn_sync!("destroying an unknown image view");
        }
    }

    fn free_memory(&self, memory: MemoryHandle) {
        if self.state().memories.remove(&memory).is_none() {
            logwise::warn_sync!("freeing unknown memory");
        }
    }

    fn destroy_buffer(&self, buffer: BufferHandle) {
        if self.state().buffers.remove(&buffer).is_none() {
            logwise::warn_sync!("destroying an unknown buffer");
        }
    }

    fn destroy_pipeline(&self, pipeline: PipelineHandle) {
        if self.state().pipelines.remove(&pipeline).is_none() {
            logwise::warn_sync!("destroying an unknown pipeline");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel_formats::vulkan::VkFormat;

    fn desc(levels: u32, layers: u32) -> ImageDesc {
        ImageDesc {
            image_type: ImageType::D2,
            format: VkFormat::R8G8B8A8_UNORM,
            extent: [8, 8, 1],
            mip_levels: levels,
            array_layers: layers,
            samples: 1,
            usage: super::super::ImageUsage::STORAGE,
            flags: super::super::ImageCreateFlags::empty(),
            export: None,
        }
    }

    #[test]
    fn requirements_cover_every_level_and_layer() {
        let driver = SimulatedDriver::default();
        let image = driver.create_image(&desc(4, 2)).unwrap();
        //8x8 + 4x4 + 2x2 + 1x1 texels, two layers, four bytes each
        let bytes = (64 + 16 + 4 + 1) * 2 * 4;
        assert_eq!(driver.image_memory_requirements(image).size, align(bytes));
    }

    #[test]
    fn injected_failure_hits_the_nth_call() {
        let driver = SimulatedDriver::default();
        driver.fail_on("create_buffer", 2);
        assert!(driver.create_buffer(16, BufferUsage::STORAGE).is_ok());
        let err = driver.create_buffer(16, BufferUsage::STORAGE).unwrap_err();
        assert_eq!(err.kind, DriverErrorKind::Injected);
        assert!(driver.create_buffer(16, BufferUsage::STORAGE).is_ok());
        assert_eq!(driver.live_objects().buffers, 2);
    }

    #[test]
    fn binding_past_the_allocation_fails() {
        let driver = SimulatedDriver::default();
        let image = driver.create_image(&desc(1, 1)).unwrap();
        let memory = driver
            .allocate_memory(256, MemoryLocation::DeviceLocal, None)
            .unwrap();
        assert!(driver.bind_image_memory(image, memory, 0).is_ok());
        assert!(driver.bind_image_memory(image, memory, 128).is_err());
    }

    #[test]
    fn commands_run_at_submit() {
        let driver = SimulatedDriver::default();
        let queue = driver.get_queue(0, 0).unwrap();
        let buffer = driver.create_buffer(8, BufferUsage::TRANSFER_DST).unwrap();
        let memory = driver
            .allocate_memory(256, MemoryLocation::HostVisible, None)
            .unwrap();
        driver.bind_buffer_memory(buffer, memory, 0).unwrap();
        let commands = driver.begin_commands(queue).unwrap();
        driver.cmd_fill_buffer(commands, buffer, 0, 8, 0x0403_0201);
        let mut out = [0u8; 8];
        driver.read_memory(memory, 0, &mut out).unwrap();
        assert_eq!(out, [0; 8]);
        let fence = driver.submit(commands).unwrap();
        assert!(driver.fence_signaled(fence));
        driver.read_memory(memory, 0, &mut out).unwrap();
        assert_eq!(out, [1, 2, 3, 4, 1, 2, 3, 4]);
        driver.free_commands(commands);
        assert!(!driver.fence_signaled(fence));
        assert_eq!(driver.live_objects().command_recordings, 0);
    }
}
