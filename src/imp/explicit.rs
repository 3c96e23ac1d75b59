// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
The explicit (Vulkan-class) backend.

Explicit APIs make the application responsible for memory binding, image layouts and
synchronization. This backend reaches the native API through the [`Driver`] trait, which
mirrors the small part of such an API the resource layer needs: object creation with opaque
handles, command recording, submission and fences. Enumerations carry the native values so a
driver can pass them through unchanged.

[`simulated::SimulatedDriver`] implements [`Driver`] in process and is the software device used
for headless contexts and tests.
*/

pub(crate) mod buffer;
pub(crate) mod image;
pub(crate) mod kernel;
pub(crate) mod queue;
pub mod simulated;

pub use image::ExternalImage;

use crate::error::DriverError;
use crate::memory_flags::ForeignKind;
use crate::pixel_formats::vulkan::VkFormat;
use std::fmt::Debug;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(transparent)]
        pub struct $name(pub u64);
    };
}

handle!(
    /// `VkImage`
    ImageHandle
);
handle!(
    /// `VkImageView`
    ViewHandle
);
handle!(
    /// `VkDeviceMemory`
    MemoryHandle
);
handle!(
    /// `VkBuffer`
    BufferHandle
);
handle!(
    /// A compute `VkPipeline` with its layout.
    PipelineHandle
);
handle!(
    /// A `VkCommandBuffer` in the recording state.
    CommandsHandle
);
handle!(FenceHandle);
handle!(QueueHandle);

/// `VK_QUEUE_FAMILY_IGNORED`
pub const QUEUE_FAMILY_IGNORED: u32 = u32::MAX;

/// `VkImageLayout`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ImageLayout {
    Undefined = 0,
    General = 1,
    ColorAttachmentOptimal = 2,
    DepthStencilAttachmentOptimal = 3,
    DepthStencilReadOnlyOptimal = 4,
    ShaderReadOnlyOptimal = 5,
    TransferSrcOptimal = 6,
    TransferDstOptimal = 7,
}

impl ImageLayout {
    pub const fn is_transfer(self) -> bool {
        matches!(
            self,
            ImageLayout::TransferSrcOptimal | ImageLayout::TransferDstOptimal
        )
    }
    pub const fn is_attachment(self) -> bool {
        matches!(
            self,
            ImageLayout::ColorAttachmentOptimal
                | ImageLayout::DepthStencilAttachmentOptimal
                | ImageLayout::DepthStencilReadOnlyOptimal
        )
    }
}

bitflags::bitflags! {
    /// `VkAccessFlags`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AccessFlags: u32 {
        const INPUT_ATTACHMENT_READ = 0x10;
        const SHADER_READ = 0x20;
        const SHADER_WRITE = 0x40;
        const COLOR_ATTACHMENT_READ = 0x80;
        const COLOR_ATTACHMENT_WRITE = 0x100;
        const DEPTH_STENCIL_ATTACHMENT_READ = 0x200;
        const DEPTH_STENCIL_ATTACHMENT_WRITE = 0x400;
        const TRANSFER_READ = 0x800;
        const TRANSFER_WRITE = 0x1000;
        const HOST_READ = 0x2000;
        const HOST_WRITE = 0x4000;
        const MEMORY_READ = 0x8000;
        const MEMORY_WRITE = 0x10000;
    }
}

impl AccessFlags {
    /// Any attachment access, which marks a foreign image as a render target.
    pub const ATTACHMENT: AccessFlags = AccessFlags::INPUT_ATTACHMENT_READ
        .union(AccessFlags::COLOR_ATTACHMENT_READ)
        .union(AccessFlags::COLOR_ATTACHMENT_WRITE)
        .union(AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ)
        .union(AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE);
}

bitflags::bitflags! {
    /// `VkPipelineStageFlags`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PipelineStages: u32 {
        const TOP_OF_PIPE = 0x1;
        const VERTEX_SHADER = 0x8;
        const FRAGMENT_SHADER = 0x80;
        const EARLY_FRAGMENT_TESTS = 0x100;
        const LATE_FRAGMENT_TESTS = 0x200;
        const COLOR_ATTACHMENT_OUTPUT = 0x400;
        const COMPUTE_SHADER = 0x800;
        const TRANSFER = 0x1000;
        const BOTTOM_OF_PIPE = 0x2000;
        const HOST = 0x4000;
        const ALL_GRAPHICS = 0x8000;
        const ALL_COMMANDS = 0x10000;
    }
}

bitflags::bitflags! {
    /// `VkImageUsageFlags`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ImageUsage: u32 {
        const TRANSFER_SRC = 0x1;
        const TRANSFER_DST = 0x2;
        const SAMPLED = 0x4;
        const STORAGE = 0x8;
        const COLOR_ATTACHMENT = 0x10;
        const DEPTH_STENCIL_ATTACHMENT = 0x20;
        const INPUT_ATTACHMENT = 0x80;
    }
}

bitflags::bitflags! {
    /// `VkBufferUsageFlags`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        const TRANSFER_SRC = 0x1;
        const TRANSFER_DST = 0x2;
        const UNIFORM = 0x10;
        const STORAGE = 0x20;
        const INDIRECT = 0x100;
    }
}

bitflags::bitflags! {
    /// `VkImageAspectFlags`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ImageAspects: u32 {
        const COLOR = 0x1;
        const DEPTH = 0x2;
        const STENCIL = 0x4;
    }
}

bitflags::bitflags! {
    /// `VkImageCreateFlags`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ImageCreateFlags: u32 {
        const CUBE_COMPATIBLE = 0x10;
        const ALIAS = 0x400;
    }
}

/// `VkImageType`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ImageType {
    D1 = 0,
    D2 = 1,
    D3 = 2,
}

/// `VkImageViewType`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ViewType {
    D1 = 0,
    D2 = 1,
    D3 = 2,
    Cube = 3,
    D1Array = 4,
    D2Array = 5,
    CubeArray = 6,
}

/// Where an allocation lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryLocation {
    /// Fast device memory, not mappable.
    DeviceLocal,
    /// Host-visible, coherent memory, used for staging.
    HostVisible,
}

/// `VkMemoryRequirements`, without the type bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRequirements {
    pub size: u64,
    pub alignment: u64,
}

/// `VkImageCreateInfo`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDesc {
    pub image_type: ImageType,
    pub format: VkFormat,
    pub extent: [u32; 3],
    pub mip_levels: u32,
    pub array_layers: u32,
    pub samples: u32,
    pub usage: ImageUsage,
    pub flags: ImageCreateFlags,
    /// Export handle type, when the memory will be shared.
    pub export: Option<ForeignKind>,
}

/// `VkImageViewCreateInfo`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewDesc {
    pub image: ImageHandle,
    pub view_type: ViewType,
    pub format: VkFormat,
    pub aspects: ImageAspects,
    pub base_level: u32,
    pub level_count: u32,
    pub base_layer: u32,
    pub layer_count: u32,
}

/// `VkBufferImageCopy` for a tightly packed buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferImageCopy {
    pub buffer_offset: u64,
    pub aspects: ImageAspects,
    pub level: u32,
    pub base_layer: u32,
    pub layer_count: u32,
    pub extent: [u32; 3],
}

/// `VkImageMemoryBarrier` over a whole resource, plus the stage masks of the
/// `vkCmdPipelineBarrier` call it is recorded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageBarrier {
    pub image: ImageHandle,
    pub old_layout: ImageLayout,
    pub new_layout: ImageLayout,
    pub src_access: AccessFlags,
    pub dst_access: AccessFlags,
    pub src_stages: PipelineStages,
    pub dst_stages: PipelineStages,
    pub src_queue_family: u32,
    pub dst_queue_family: u32,
    pub aspects: ImageAspects,
    pub level_count: u32,
    pub layer_count: u32,
}

/// A compiled compute pipeline to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineDesc {
    /// Entry point name.
    pub entry: String,
    /// The compiled module.
    pub code: Vec<u8>,
    /// Specialized work-group size.
    pub local_size: [u32; 3],
}

/// One bound kernel argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundArgument {
    /// Inline (push constant or uniform) bytes.
    Bytes(Vec<u8>),
    Buffer(BufferHandle),
    Image {
        view: ViewHandle,
        /// One view per mip level, padded to the device's maximum level count, when the kernel
        /// may write individual levels.
        level_views: Vec<ViewHandle>,
        layout: ImageLayout,
    },
}

/// Capabilities a driver reports for its device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverCapabilities {
    pub device_name: String,
    pub cooperative_dispatch: bool,
    pub indirect_compute: bool,
    /// Largest `x * y * z` work-group size.
    pub max_total_local_size: u32,
    /// Length of the longest supported mip chain.
    pub max_mip_levels: u32,
    pub queue_family: u32,
}

/**
The native API surface of an explicit backend.

Creation calls return opaque handles or a [`DriverError`] naming the failed operation.
`cmd_*` calls record into a command recording started with [`Driver::begin_commands`] and can't
fail; problems surface on [`Driver::submit`]. Destruction calls accept only handles the driver
returned and that were not destroyed yet.
*/
pub trait Driver: Send + Sync + Debug {
    fn capabilities(&self) -> DriverCapabilities;
    fn get_queue(&self, family: u32, index: u32) -> Result<QueueHandle, DriverError>;

    fn create_image(&self, desc: &ImageDesc) -> Result<ImageHandle, DriverError>;
    fn image_memory_requirements(&self, image: ImageHandle) -> MemoryRequirements;
    fn allocate_memory(
        &self,
        size: u64,
        location: MemoryLocation,
        export: Option<ForeignKind>,
    ) -> Result<MemoryHandle, DriverError>;
    fn bind_image_memory(
        &self,
        image: ImageHandle,
        memory: MemoryHandle,
        offset: u64,
    ) -> Result<(), DriverError>;
    fn create_image_view(&self, desc: &ViewDesc) -> Result<ViewHandle, DriverError>;
    fn create_buffer(&self, size: u64, usage: BufferUsage) -> Result<BufferHandle, DriverError>;
    fn buffer_memory_requirements(&self, buffer: BufferHandle) -> MemoryRequirements;
    fn bind_buffer_memory(
        &self,
        buffer: BufferHandle,
        memory: MemoryHandle,
        offset: u64,
    ) -> Result<(), DriverError>;
    fn create_compute_pipeline(&self, desc: &PipelineDesc)
    -> Result<PipelineHandle, DriverError>;

    /// Copies into host-visible memory.
    fn write_memory(&self, memory: MemoryHandle, offset: u64, data: &[u8])
    -> Result<(), DriverError>;
    /// Copies out of host-visible memory.
    fn read_memory(
        &self,
        memory: MemoryHandle,
        offset: u64,
        out: &mut [u8],
    ) -> Result<(), DriverError>;
    /// Exports an allocation made with an export handle type.
    fn export_memory(&self, memory: MemoryHandle, kind: ForeignKind) -> Result<u64, DriverError>;
    fn set_debug_label(&self, object: u64, label: &str);

    fn begin_commands(&self, queue: QueueHandle) -> Result<CommandsHandle, DriverError>;
    fn cmd_pipeline_barrier(&self, commands: CommandsHandle, barrier: &ImageBarrier);
    fn cmd_copy_buffer_to_image(
        &self,
        commands: CommandsHandle,
        src: BufferHandle,
        dst: ImageHandle,
        layout: ImageLayout,
        regions: &[BufferImageCopy],
    );
    fn cmd_copy_image_to_buffer(
        &self,
        commands: CommandsHandle,
        src: ImageHandle,
        layout: ImageLayout,
        dst: BufferHandle,
        regions: &[BufferImageCopy],
    );
    fn cmd_copy_buffer(
        &self,
        commands: CommandsHandle,
        src: BufferHandle,
        dst: BufferHandle,
        size: u64,
    );
    fn cmd_fill_buffer(
        &self,
        commands: CommandsHandle,
        dst: BufferHandle,
        offset: u64,
        size: u64,
        value: u32,
    );
    /// Filters `level - 1` into `level` (a linear blit).
    fn cmd_downsample(&self, commands: CommandsHandle, image: ImageHandle, level: u32);
    fn cmd_bind_pipeline(&self, commands: CommandsHandle, pipeline: PipelineHandle);
    fn cmd_bind_arguments(
        &self,
        commands: CommandsHandle,
        pipeline: PipelineHandle,
        arguments: &[BoundArgument],
    );
    fn cmd_dispatch(&self, commands: CommandsHandle, groups: [u32; 3]);

    /// Ends and submits a recording. The recording must not be used afterwards, other than to
    /// free it once the fence signals.
    fn submit(&self, commands: CommandsHandle) -> Result<FenceHandle, DriverError>;
    fn wait(&self, fence: FenceHandle) -> Result<(), DriverError>;
    fn fence_signaled(&self, fence: FenceHandle) -> bool;
    /// Frees a recording, submitted or not, and the fence it was submitted with.
    fn free_commands(&self, commands: CommandsHandle);

    fn destroy_image(&self, image: ImageHandle);
    fn destroy_image_view(&self, view: ViewHandle);
    fn free_memory(&self, memory: MemoryHandle);
    fn destroy_buffer(&self, buffer: BufferHandle);
    fn destroy_pipeline(&self, pipeline: PipelineHandle);
}

/// Logs and forwards a failed native call.
pub(crate) fn logged<T>(result: Result<T, DriverError>, what: &'static str) -> Result<T, DriverError> {
    if let Err(e) = &result {
        logwise::error_sync!(
            "{what}: {err}",
            what = what,
            err = logwise::privacy::LogIt(e)
        );
    }
    result
}
