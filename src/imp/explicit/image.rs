// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
The explicit image resource.

An explicit image owns a native image (plus one single-layer image per layer for aliased
arrays), one allocation, a default view, optional per-level views, and two pieces of tracked
GPU state: the current layout and the current access mask. Tracking is whole-resource: every
barrier covers all levels and layers, and the tracked pair always equals the state the most
recently recorded transition established.

All layout changes go through [`ExplicitImage::transition`]. [`ExplicitImage::transition_read`]
and [`ExplicitImage::transition_write`] choose the destination for normal images and render
targets, and record nothing when the tracked state already satisfies the request.
*/

use super::buffer::Staging;
use super::queue::{ExplicitQueue, Recorder};
use super::{
    AccessFlags, BufferImageCopy, Driver, ImageAspects, ImageBarrier, ImageCreateFlags, ImageDesc,
    ImageHandle, ImageLayout, ImageType, ImageUsage, MemoryHandle, MemoryLocation,
    PipelineStages, QUEUE_FAMILY_IGNORED, ViewDesc, ViewHandle, ViewType, logged,
};
use crate::error::{CreateError, DriverError, DriverErrorKind, TransferError, TransitionError};
use crate::image::ImageInfo;
use crate::imp::ImageRequest;
use crate::memory::SharedHandle;
use crate::memory_flags::{MapFlags, MemoryFlags};
use crate::pixel_formats::vulkan::{self, VkFormat};
use crate::pixel_formats::{Dimensionality, ImageExtent, ImageFlags, ImageFormat};
use std::sync::Arc;

/// Stages kernels and shaders touch images in.
const SHADER_STAGES: PipelineStages = PipelineStages::ALL_GRAPHICS.union(PipelineStages::COMPUTE_SHADER);

/// A native image created and owned by someone else, to be wrapped without taking ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExternalImage {
    pub image: ImageHandle,
    pub view: ViewHandle,
    pub format: VkFormat,
    /// Dimensionality and shape flags (array, cube, depth, ...). Channel fields are taken from
    /// `format`.
    pub shape: ImageFormat,
    pub extent: ImageExtent,
    /// Layout the image is in right now.
    pub layout: ImageLayout,
    /// Access mask of the last use.
    pub access: AccessFlags,
}

impl ExternalImage {
    /// The descriptor of the wrapped image, or `None` when its native format is unknown.
    ///
    /// Any attachment layout or access marks the image as a render target.
    pub fn descriptor(&self, flags: MemoryFlags) -> Option<ImageFormat> {
        let native = vulkan::format_from_native(self.format)?;
        let shape_flags = self.shape.flags()
            & (ImageFlags::ARRAY
                | ImageFlags::BUFFER
                | ImageFlags::CUBE
                | ImageFlags::DEPTH
                | ImageFlags::STENCIL
                | ImageFlags::MSAA);
        let mut format = ImageFormat::NONE
            .with_dimensionality(self.shape.dimensionality()?)
            .with(shape_flags)
            .union(native);
        format = format.with_access(crate::image::access_of(flags));
        if self.access.intersects(AccessFlags::ATTACHMENT) || self.layout.is_attachment() {
            format = format.with(ImageFlags::RENDER_TARGET);
        }
        Some(format)
    }
}

#[derive(Debug)]
pub(crate) struct ExplicitImage {
    driver: Arc<dyn Driver>,
    image: Option<ImageHandle>,
    layer_images: Vec<ImageHandle>,
    layer_offsets: Vec<u64>,
    memory: Option<MemoryHandle>,
    allocation_size: u64,
    view: Option<ViewHandle>,
    //padded to the device's max mip levels with the last created view
    level_views: Vec<ViewHandle>,
    created_level_views: usize,
    layout: ImageLayout,
    access: AccessFlags,
    external: bool,
    info: Option<ImageInfo>,
    read_only: bool,
    shared_handle: Option<SharedHandle>,
}

impl ExplicitImage {
    pub(crate) fn new(driver: Arc<dyn Driver>) -> Self {
        ExplicitImage {
            driver,
            image: None,
            layer_images: Vec::new(),
            layer_offsets: Vec::new(),
            memory: None,
            allocation_size: 0,
            view: None,
            level_views: Vec::new(),
            created_level_views: 0,
            layout: ImageLayout::Undefined,
            access: AccessFlags::empty(),
            external: false,
            info: None,
            read_only: false,
            shared_handle: None,
        }
    }

    /// Wraps a foreign-owned image. Nothing is created, and nothing is destroyed on drop.
    pub(crate) fn wrap(
        driver: Arc<dyn Driver>,
        external: &ExternalImage,
        info: ImageInfo,
        flags: MemoryFlags,
    ) -> Self {
        let mut image = ExplicitImage::new(driver);
        image.image = Some(external.image);
        image.view = Some(external.view);
        image.layout = external.layout;
        image.access = external.access;
        image.external = true;
        image.info = Some(info);
        image.read_only = flags.is_read_only();
        image
    }

    pub(crate) fn layout(&self) -> ImageLayout {
        self.layout
    }
    pub(crate) fn access(&self) -> AccessFlags {
        self.access
    }
    pub(crate) fn handle(&self) -> Option<ImageHandle> {
        self.image
    }
    pub(crate) fn view(&self) -> Option<ViewHandle> {
        self.view
    }
    pub(crate) fn level_views(&self) -> &[ViewHandle] {
        &self.level_views
    }
    pub(crate) fn layer_images(&self) -> &[ImageHandle] {
        &self.layer_images
    }
    pub(crate) fn layer_offsets(&self) -> &[u64] {
        &self.layer_offsets
    }
    pub(crate) fn allocation_size(&self) -> u64 {
        self.allocation_size
    }
    pub(crate) fn shared_handle(&self) -> Option<SharedHandle> {
        self.shared_handle
    }
    pub(crate) fn is_external(&self) -> bool {
        self.external
    }

    /// Adopts a layout and access mask established outside this object, for instance by a
    /// render pass.
    pub(crate) fn update_with_external_state(&mut self, layout: ImageLayout, access: AccessFlags) {
        self.layout = layout;
        self.access = access;
    }

    fn format(&self) -> ImageFormat {
        self.info.map_or(ImageFormat::NONE, |info| info.format)
    }

    fn aspects(&self) -> ImageAspects {
        aspects_of(self.format())
    }

    pub(crate) fn allocate(
        &mut self,
        queue: &ExplicitQueue,
        request: &ImageRequest<'_>,
    ) -> Result<(), CreateError> {
        let info = *request.info;
        self.info = Some(info);
        let format = info.format;
        let flags = request.flags;
        self.read_only = flags.is_read_only();
        let render_target = format.has_render_target();
        let depth = format.has_depth();
        let generate_mips = flags.contains(MemoryFlags::GENERATE_MIP_MAPS) && info.mip_levels > 1;

        let Some(vk_format) = vulkan::native_from_format(info.storage_format) else {
            logwise::error_sync!(
                "unsupported image format: {format}",
                format = logwise::privacy::LogIt(&format)
            );
            return Err(CreateError::UnsupportedFormat(format));
        };
        if format.has_cube() && info.extent.width != info.extent.height {
            logwise::error_sync!("cube map width and height must be equal");
            return Err(CreateError::NonSquareCube {
                width: info.extent.width,
                height: info.extent.height,
            });
        }

        let mut usage = ImageUsage::TRANSFER_SRC | ImageUsage::TRANSFER_DST;
        if flags.device_reads() {
            usage |= ImageUsage::SAMPLED;
        }
        if flags.device_writes() || generate_mips {
            usage |= ImageUsage::STORAGE;
        }
        if render_target {
            usage |= if depth {
                ImageUsage::DEPTH_STENCIL_ATTACHMENT
            } else {
                ImageUsage::COLOR_ATTACHMENT
            };
            if flags.device_reads() {
                usage |= ImageUsage::INPUT_ATTACHMENT;
            }
        }
        let mut create_flags = ImageCreateFlags::empty();
        if format.has_cube() {
            create_flags |= ImageCreateFlags::CUBE_COMPATIBLE;
        }
        let aliasing = flags.contains(MemoryFlags::ALIASING);
        if aliasing {
            create_flags |= ImageCreateFlags::ALIAS;
        }
        let dims = format.dimension_count();
        let extent = [
            info.extent.width,
            if dims >= 2 { info.extent.height } else { 1 },
            if dims == 3 { info.extent.depth } else { 1 },
        ];
        let desc = ImageDesc {
            image_type: match format.dimensionality() {
                Some(Dimensionality::D1) => ImageType::D1,
                Some(Dimensionality::D3) => ImageType::D3,
                _ => ImageType::D2,
            },
            format: vk_format,
            extent,
            mip_levels: info.mip_levels,
            array_layers: info.layers,
            samples: info.sample_count,
            usage,
            flags: create_flags,
            export: request.export,
        };
        let driver = self.driver.clone();
        let image = logged(driver.create_image(&desc), "image creation failed")?;
        self.image = Some(image);

        let aliased_array = aliasing && format.has_array();
        if aliased_array {
            let layer_desc = ImageDesc {
                array_layers: 1,
                extent: [extent[0], extent[1], 1],
                ..desc.clone()
            };
            for _ in 0..info.layers {
                let layer = logged(
                    driver.create_image(&layer_desc),
                    "image layer creation failed",
                )?;
                self.layer_images.push(layer);
            }
        }

        let requirements = driver.image_memory_requirements(image);
        //layer size is read back from the first layer and assumed uniform
        let per_layer_size = self
            .layer_images
            .first()
            .map(|layer| driver.image_memory_requirements(*layer).size);
        self.allocation_size = match per_layer_size {
            Some(per_layer) => requirements.size.max(per_layer * info.layers as u64),
            None => requirements.size,
        };
        let memory = logged(
            driver.allocate_memory(
                self.allocation_size,
                MemoryLocation::DeviceLocal,
                request.export,
            ),
            "image allocation failed",
        )?;
        self.memory = Some(memory);
        logged(
            driver.bind_image_memory(image, memory, 0),
            "image allocation binding failed",
        )?;
        if let Some(per_layer) = per_layer_size {
            for (index, layer) in self.layer_images.iter().enumerate() {
                let offset = per_layer * index as u64;
                logged(
                    driver.bind_image_memory(*layer, memory, offset),
                    "image layer allocation binding failed",
                )?;
                self.layer_offsets.push(offset);
            }
        }

        let view_type = view_type_of(format);
        let aspects = aspects_of(format);
        let view_desc = ViewDesc {
            image,
            view_type,
            format: vk_format,
            aspects,
            base_level: 0,
            level_count: info.mip_levels,
            base_layer: 0,
            layer_count: info.layers,
        };
        let view = logged(
            driver.create_image_view(&view_desc),
            "image view creation failed",
        )?;
        self.view = Some(view);

        //kernels can't address a single level of a multi-level view for writing, so writable
        //or mip-generated images get a view per level
        if format.has_mipmaps() && (generate_mips || flags.device_writes()) {
            for level in 0..info.mip_levels {
                let level_view = logged(
                    driver.create_image_view(&ViewDesc {
                        base_level: level,
                        level_count: 1,
                        ..view_desc.clone()
                    }),
                    "mip-map image view creation failed",
                )?;
                self.level_views.push(level_view);
                self.created_level_views += 1;
            }
        } else {
            self.level_views.push(view);
        }
        let last = *self.level_views.last().unwrap_or(&view);
        let padded = request.max_mip_levels.max(self.level_views.len() as u32) as usize;
        self.level_views.resize(padded, last);

        self.layout = ImageLayout::Undefined;
        self.access = AccessFlags::empty();
        let mut recorder = Recorder::Immediate(queue);
        if render_target {
            let (layout, access) = attachment_state(format);
            self.transition(
                &mut recorder,
                access,
                layout,
                PipelineStages::ALL_GRAPHICS,
                PipelineStages::ALL_GRAPHICS,
                QUEUE_FAMILY_IGNORED,
            )?;
        }

        if let Some(data) = request.initial {
            if flags.contains(MemoryFlags::NO_INITIAL_COPY) {
                logwise::trace_sync!("skipping initial copy");
            } else if render_target {
                logwise::error_sync!("can't initialize a render target with host data");
            } else {
                self.upload(queue, data)?;
            }
        }

        if generate_mips {
            self.generate_mip_maps(&mut recorder)?;
        }

        //the first usage transition starts from whatever creation left behind, which is
        //UNDEFINED when nothing was uploaded
        if !render_target {
            self.restore_usage(&mut recorder)?;
        }

        if let Some(kind) = request.export {
            let handle = logged(
                driver.export_memory(memory, kind),
                "failed to retrieve shared memory handle",
            )?;
            self.shared_handle = Some(SharedHandle { kind, handle });
        }
        Ok(())
    }

    pub(crate) fn set_debug_label(&self, label: &str) {
        if let Some(image) = self.image {
            self.driver.set_debug_label(image.0, label);
        }
        if let Some(view) = self.view {
            self.driver.set_debug_label(view.0, label);
        }
    }

    /**
    Records one barrier moving the whole image to `new_layout` with `dst_access`, and updates
    the tracked state.

    Transfer accesses narrow the corresponding stage mask to the transfer stage.
    */
    pub(crate) fn transition(
        &mut self,
        recorder: &mut Recorder<'_>,
        dst_access: AccessFlags,
        new_layout: ImageLayout,
        src_stages: PipelineStages,
        dst_stages: PipelineStages,
        dst_queue_family: u32,
    ) -> Result<(), DriverError> {
        let Some(image) = self.image else {
            return Err(DriverError::new("transition", DriverErrorKind::InvalidHandle));
        };
        let (level_count, layer_count) = self
            .info
            .map_or((1, 1), |info| (info.mip_levels, info.layers));
        let barrier = ImageBarrier {
            image,
            old_layout: self.layout,
            new_layout,
            src_access: self.access,
            dst_access,
            src_stages: stages_for_access(self.access, src_stages),
            dst_stages: stages_for_access(dst_access, dst_stages),
            src_queue_family: QUEUE_FAMILY_IGNORED,
            dst_queue_family,
            aspects: self.aspects(),
            level_count,
            layer_count,
        };
        logwise::trace_sync!(
            "image barrier {old} -> {new}",
            old = logwise::privacy::LogIt(&barrier.old_layout),
            new = logwise::privacy::LogIt(&barrier.new_layout)
        );
        recorder.record(|driver, commands| driver.cmd_pipeline_barrier(commands, &barrier))?;
        self.access = dst_access;
        self.layout = new_layout;
        Ok(())
    }

    /// Makes the image readable by kernels and shaders.
    pub(crate) fn transition_read(
        &mut self,
        recorder: &mut Recorder<'_>,
        allow_general: bool,
    ) -> Result<(), TransitionError> {
        let format = self.format();
        let (layout, access) = if format.has_render_target() && format.has_depth() {
            (
                ImageLayout::DepthStencilReadOnlyOptimal,
                AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ,
            )
        } else {
            (ImageLayout::ShaderReadOnlyOptimal, AccessFlags::SHADER_READ)
        };
        if self.access.contains(access)
            && (self.layout == layout || (allow_general && self.layout == ImageLayout::General))
        {
            return Ok(());
        }
        self.transition(
            recorder,
            access,
            layout,
            SHADER_STAGES,
            SHADER_STAGES,
            QUEUE_FAMILY_IGNORED,
        )?;
        Ok(())
    }

    /**
    Makes the image writable.

    Normal images (and render targets written directly by a kernel) move to the general
    layout with shader write access, plus shader read when `read_write`. Render targets move to
    their attachment layout and can't be read-write.
    */
    pub(crate) fn transition_write(
        &mut self,
        recorder: &mut Recorder<'_>,
        read_write: bool,
        rt_direct_write: bool,
        allow_general: bool,
    ) -> Result<(), TransitionError> {
        let format = self.format();
        if !format.has_render_target() || rt_direct_write {
            let mut access = AccessFlags::SHADER_WRITE;
            if read_write {
                access |= AccessFlags::SHADER_READ;
            }
            if self.layout == ImageLayout::General && self.access.contains(access) {
                return Ok(());
            }
            self.transition(
                recorder,
                access,
                ImageLayout::General,
                SHADER_STAGES,
                SHADER_STAGES,
                QUEUE_FAMILY_IGNORED,
            )?;
            return Ok(());
        }
        if read_write {
            logwise::error_sync!("attachment / render-target can't be read-write");
            return Err(TransitionError::ReadWriteRenderTarget);
        }
        let (layout, access) = attachment_state(format);
        if self.access.contains(access)
            && (self.layout == layout || (allow_general && self.layout == ImageLayout::General))
        {
            return Ok(());
        }
        self.transition(
            recorder,
            access,
            layout,
            PipelineStages::ALL_GRAPHICS,
            PipelineStages::ALL_GRAPHICS,
            QUEUE_FAMILY_IGNORED,
        )?;
        Ok(())
    }

    /// Moves the image to the state its creation flags call for: read for read-only images,
    /// the attachment layout for render targets, read-write otherwise.
    fn restore_usage(&mut self, recorder: &mut Recorder<'_>) -> Result<(), TransitionError> {
        if self.read_only {
            self.transition_read(recorder, false)
        } else {
            let read_write = !self.format().has_render_target();
            self.transition_write(recorder, read_write, false, false)
        }
    }

    /// Regenerates levels 1.. from level 0: per level, a read barrier, a write barrier and a
    /// downsample.
    pub(crate) fn generate_mip_maps(
        &mut self,
        recorder: &mut Recorder<'_>,
    ) -> Result<(), TransitionError> {
        let Some(image) = self.image else {
            return Err(TransitionError::InvalidObject);
        };
        let levels = self.info.map_or(1, |info| info.mip_levels);
        for level in 1..levels {
            self.transition_read(recorder, false)?;
            self.transition_write(recorder, true, true, false)?;
            recorder.record(|driver, commands| driver.cmd_downsample(commands, image, level))?;
        }
        Ok(())
    }

    fn regions(&self) -> Vec<BufferImageCopy> {
        let Some(info) = self.info else {
            return Vec::new();
        };
        let format = info.storage_format;
        let dims = format.dimension_count();
        let aspects = self.aspects();
        let mut regions = Vec::with_capacity(info.mip_levels as usize);
        let mut offset = 0;
        info.for_each_level(|level, extent, _slice, level_size| {
            regions.push(BufferImageCopy {
                buffer_offset: offset,
                aspects,
                level,
                base_layer: 0,
                layer_count: info.layers,
                extent: [
                    extent.width,
                    if dims >= 2 { extent.height } else { 1 },
                    if dims == 3 { extent.depth } else { 1 },
                ],
            });
            offset += level_size;
            true
        });
        regions
    }

    /// Copies full-chain storage bytes to the image through a staging buffer, in one blocking
    /// submission. Leaves the image in the transfer-destination layout.
    pub(crate) fn upload(&mut self, queue: &ExplicitQueue, data: &[u8]) -> Result<(), TransferError> {
        let staging = self.stage(data)?;
        let mut recording = queue.begin()?;
        self.record_upload(&mut Recorder::Deferred(&mut recording), &staging)?;
        queue.submit_and_wait(recording)?;
        Ok(())
    }

    fn stage(&self, data: &[u8]) -> Result<Staging, TransferError> {
        let size = self.info.map_or(0, |info| info.storage_byte_size());
        if (data.len() as u64) < size {
            return Err(TransferError::SizeMismatch {
                expected: size,
                actual: data.len() as u64,
            });
        }
        let staging = Staging::new(&self.driver, size)?;
        staging.write(&data[..size as usize])?;
        Ok(staging)
    }

    fn record_upload(&mut self, recorder: &mut Recorder<'_>, staging: &Staging) -> Result<(), TransferError> {
        let Some(image) = self.image else {
            return Err(TransferError::InvalidObject);
        };
        let regions = self.regions();
        self.transition(
            recorder,
            AccessFlags::TRANSFER_WRITE,
            ImageLayout::TransferDstOptimal,
            PipelineStages::ALL_COMMANDS,
            PipelineStages::TRANSFER,
            QUEUE_FAMILY_IGNORED,
        )?;
        recorder.record(|driver, commands| {
            driver.cmd_copy_buffer_to_image(
                commands,
                staging.buffer,
                image,
                ImageLayout::TransferDstOptimal,
                &regions,
            )
        })?;
        Ok(())
    }

    /// Copies every level out through a staging buffer, in one blocking submission. Leaves the
    /// image in the transfer-source layout.
    pub(crate) fn download(&mut self, queue: &ExplicitQueue) -> Result<Vec<u8>, TransferError> {
        let Some(image) = self.image else {
            return Err(TransferError::InvalidObject);
        };
        let size = self.info.map_or(0, |info| info.storage_byte_size());
        let staging = Staging::new(&self.driver, size)?;
        let regions = self.regions();
        let mut recording = queue.begin()?;
        let mut recorder = Recorder::Deferred(&mut recording);
        self.transition(
            &mut recorder,
            AccessFlags::TRANSFER_READ,
            ImageLayout::TransferSrcOptimal,
            PipelineStages::ALL_COMMANDS,
            PipelineStages::TRANSFER,
            QUEUE_FAMILY_IGNORED,
        )?;
        recorder.record(|driver, commands| {
            driver.cmd_copy_image_to_buffer(
                commands,
                image,
                ImageLayout::TransferSrcOptimal,
                staging.buffer,
                &regions,
            )
        })?;
        queue.submit_and_wait(recording)?;
        let mut out = vec![0; size as usize];
        staging.read(&mut out)?;
        Ok(out)
    }

    pub(crate) fn map(&mut self, queue: &ExplicitQueue, flags: MapFlags) -> Result<Vec<u8>, TransferError> {
        if flags.needs_download() {
            self.download(queue)
        } else {
            let size = self.info.map_or(0, |info| info.storage_byte_size());
            Ok(vec![0; size as usize])
        }
    }

    /// Writes back a mapping and leaves transfer layouts, in one blocking submission.
    pub(crate) fn unmap(
        &mut self,
        queue: &ExplicitQueue,
        flags: MapFlags,
        data: &[u8],
    ) -> Result<(), TransferError> {
        let staging = if flags.writes() {
            Some(self.stage(data)?)
        } else {
            None
        };
        if staging.is_none() && !self.layout.is_transfer() {
            return Ok(());
        }
        let mut recording = queue.begin()?;
        let mut recorder = Recorder::Deferred(&mut recording);
        if let Some(staging) = &staging {
            self.record_upload(&mut recorder, staging)?;
        }
        self.restore_usage(&mut recorder)?;
        queue.submit_and_wait(recording)?;
        Ok(())
    }

    /// Releases every native object that was created. Wrapped images release nothing.
    pub(crate) fn destroy(&mut self) {
        if self.external {
            return;
        }
        let driver = self.driver.clone();
        //padding entries repeat the last created view
        for view in self.level_views.drain(..).take(self.created_level_views) {
            driver.destroy_image_view(view);
        }
        self.created_level_views = 0;
        if let Some(view) = self.view.take() {
            driver.destroy_image_view(view);
        }
        for layer in self.layer_images.drain(..) {
            driver.destroy_image(layer);
        }
        if let Some(image) = self.image.take() {
            driver.destroy_image(image);
        }
        if let Some(memory) = self.memory.take() {
            driver.free_memory(memory);
        }
    }
}

fn aspects_of(format: ImageFormat) -> ImageAspects {
    if format.has_depth() {
        let mut aspects = ImageAspects::DEPTH;
        if format.has_stencil() {
            aspects |= ImageAspects::STENCIL;
        }
        aspects
    } else {
        ImageAspects::COLOR
    }
}

fn view_type_of(format: ImageFormat) -> ViewType {
    let array = format.has_array();
    match format.dimension_count() {
        1 if array => ViewType::D1Array,
        1 => ViewType::D1,
        3 => ViewType::D3,
        _ if format.has_cube() => {
            if array {
                ViewType::CubeArray
            } else {
                ViewType::Cube
            }
        }
        _ if array => ViewType::D2Array,
        _ => ViewType::D2,
    }
}

fn attachment_state(format: ImageFormat) -> (ImageLayout, AccessFlags) {
    if format.has_depth() {
        (
            ImageLayout::DepthStencilAttachmentOptimal,
            AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
        )
    } else {
        (
            ImageLayout::ColorAttachmentOptimal,
            AccessFlags::COLOR_ATTACHMENT_WRITE,
        )
    }
}

/// Transfer-only access happens in the transfer stage, whatever the caller asked for.
fn stages_for_access(access: AccessFlags, stages: PipelineStages) -> PipelineStages {
    let transfer = AccessFlags::TRANSFER_READ | AccessFlags::TRANSFER_WRITE;
    if !access.is_empty() && transfer.contains(access) {
        PipelineStages::TRANSFER
    } else {
        stages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_types() {
        assert_eq!(view_type_of(ImageFormat::IMAGE_1D_ARRAY | ImageFormat::R8), ViewType::D1Array);
        assert_eq!(view_type_of(ImageFormat::IMAGE_2D | ImageFormat::R8), ViewType::D2);
        assert_eq!(view_type_of(ImageFormat::IMAGE_CUBE | ImageFormat::R8), ViewType::Cube);
        assert_eq!(
            view_type_of(ImageFormat::IMAGE_CUBE_ARRAY | ImageFormat::R8),
            ViewType::CubeArray
        );
        assert_eq!(view_type_of(ImageFormat::IMAGE_3D | ImageFormat::R8), ViewType::D3);
    }

    #[test]
    fn transfer_access_uses_transfer_stage() {
        assert_eq!(
            stages_for_access(AccessFlags::TRANSFER_WRITE, PipelineStages::ALL_COMMANDS),
            PipelineStages::TRANSFER
        );
        assert_eq!(
            stages_for_access(AccessFlags::empty(), PipelineStages::HOST),
            PipelineStages::HOST
        );
        assert_eq!(
            stages_for_access(
                AccessFlags::SHADER_READ | AccessFlags::TRANSFER_READ,
                SHADER_STAGES
            ),
            SHADER_STAGES
        );
    }

    #[test]
    fn depth_aspects() {
        assert_eq!(
            aspects_of(ImageFormat::IMAGE_DEPTH_STENCIL | ImageFormat::DS24_8),
            ImageAspects::DEPTH | ImageAspects::STENCIL
        );
        assert_eq!(aspects_of(ImageFormat::IMAGE_2D | ImageFormat::RGBA8), ImageAspects::COLOR);
    }

    #[test]
    fn wrapped_descriptor() {
        let external = ExternalImage {
            image: ImageHandle(1),
            view: ViewHandle(2),
            format: VkFormat::R8G8B8A8_UNORM,
            shape: ImageFormat::IMAGE_2D_ARRAY | ImageFormat::R32F,
            extent: ImageExtent::new_2d(4, 4).with_layers(2),
            layout: ImageLayout::ColorAttachmentOptimal,
            access: AccessFlags::COLOR_ATTACHMENT_WRITE,
        };
        let format = external.descriptor(MemoryFlags::READ).unwrap();
        assert_eq!(format.table_key(), ImageFormat::RGBA8);
        assert!(format.has_array() && format.has_render_target());
        let sampled = ExternalImage {
            layout: ImageLayout::ShaderReadOnlyOptimal,
            access: AccessFlags::SHADER_READ,
            ..external
        };
        assert!(!sampled.descriptor(MemoryFlags::READ).unwrap().has_render_target());
        let unknown = ExternalImage {
            format: VkFormat(-5),
            ..external
        };
        assert!(unknown.descriptor(MemoryFlags::READ).is_none());
    }
}
