// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Images: typed, possibly mipmapped, possibly layered pixel storage.

An [`Image`] is created through [`crate::context::Context::create_image`]. Creation never panics
and never returns an error directly; a failed image is still returned, reports `false` from
[`Image::is_valid`], and carries the reason in [`Image::creation_error`]. Every later operation on
an invalid image fails with an `InvalidObject` error.

# Storage

The device may not support a format natively. Three-channel formats without a native
counterpart are stored with four channels; [`ImageInfo::format`] is what the caller asked for and
[`ImageInfo::storage_format`] is what the device holds. Host data passed at creation or to
[`Image::write`] is in the logical format and widened on the way in. [`Image::read`] and
[`Image::map`] hand out storage-format bytes for the whole mip chain, level after level.

# State

On explicit devices the image tracks its layout and access mask. The transition operations record
at most one barrier and skip it entirely when the image is already usable as requested.
*/

use crate::device::Device;
use crate::error::{CreateError, ExecuteError, MemoryError, TransferError, TransitionError};
use crate::imp::explicit::image::{ExplicitImage, ExternalImage};
use crate::imp::explicit::queue::{ExplicitRecording, Recorder};
use crate::imp::explicit::{
    AccessFlags, BoundArgument, ImageHandle, ImageLayout, PipelineStages, ViewHandle,
};
use crate::imp::host::HostImage;
use crate::imp::{DeviceImp, ImageImp, ImageRequest, Target};
use crate::memory::{
    Exclusive, ForeignInterop, HostMemory, MemoryObject, SharedHandle, export_kind,
};
use crate::memory_flags::{Correction, MapFlags, MemoryFlags};
use crate::pixel_formats::{Access, ImageExtent, ImageFormat, convert, vulkan};
use crate::queue::{CommandRecording, Queue};
use std::ops::{Deref, DerefMut, Range};
use std::sync::Arc;

/// Samples per pixel of multisampled images.
pub const DEFAULT_SAMPLE_COUNT: u32 = 4;

/// The device access implied by memory flags.
pub(crate) fn access_of(flags: MemoryFlags) -> Access {
    match (flags.device_reads(), flags.device_writes()) {
        (true, true) => Access::ReadWrite,
        (false, true) => Access::Write,
        _ => Access::Read,
    }
}

/// Shape and layout of an image's storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    /// The format the image was created with, including its access.
    pub format: ImageFormat,
    /// The format the device stores. Differs from `format` when channels were added.
    pub storage_format: ImageFormat,
    pub extent: ImageExtent,
    pub mip_levels: u32,
    /// Array layers, times six for cube maps.
    pub layers: u32,
    pub sample_count: u32,
}

impl ImageInfo {
    pub(crate) fn new(
        format: ImageFormat,
        storage_format: ImageFormat,
        extent: ImageExtent,
        max_mip_levels: u32,
    ) -> Self {
        ImageInfo {
            format,
            storage_format,
            extent,
            mip_levels: format.mip_level_count(extent).min(max_mip_levels.max(1)),
            layers: format.layer_count(extent),
            sample_count: if format.has_msaa() {
                DEFAULT_SAMPLE_COUNT
            } else {
                1
            },
        }
    }

    pub fn level_extent(&self, level: u32) -> ImageExtent {
        self.format.level_extent(self.extent, level)
    }

    /// Storage bytes of one level, all layers and samples included.
    pub fn level_byte_size(&self, level: u32) -> u64 {
        self.storage_format
            .total_byte_size(self.level_extent(level), self.sample_count)
    }

    /// Where `level` starts in full-chain storage bytes.
    pub fn level_offset(&self, level: u32) -> u64 {
        (0..level.min(self.mip_levels))
            .map(|l| self.level_byte_size(l))
            .sum()
    }

    pub fn storage_byte_size(&self) -> u64 {
        self.level_offset(self.mip_levels)
    }

    /// Bytes of the first `levels` levels in the logical format.
    pub fn host_byte_size(&self, levels: u32) -> u64 {
        (0..levels.min(self.mip_levels))
            .map(|l| {
                self.format
                    .total_byte_size(self.level_extent(l), self.sample_count)
            })
            .sum()
    }

    /// Whether the device stores more channels than the format has.
    pub fn is_shimmed(&self) -> bool {
        self.format.channel_count() != self.storage_format.channel_count()
    }

    /**
    Calls `f(level, extent, slice_size, level_size)` for each mip level in order, with sizes in
    storage bytes. A slice is one layer of one level. Stops early when `f` returns `false`.

    ```
    use kernels_and_images::image::ImageInfo;
    # use kernels_and_images::context::Context;
    # use kernels_and_images::memory_flags::MemoryFlags;
    use kernels_and_images::pixel_formats::{ImageExtent, ImageFormat, ImageFlags};
    # let context = Context::host();
    # let queue = context.create_queue(context.device()).unwrap();
    let format = ImageFormat::IMAGE_2D
        .union(ImageFormat::RGBA8)
        .with(ImageFlags::MIPMAPPED);
    let image = context.create_image(&queue, ImageExtent::new_2d(4, 4), format, MemoryFlags::READ_WRITE, None, None);
    let mut sizes = Vec::new();
    image.info().for_each_level(|_level, _extent, slice, _size| {
        sizes.push(slice);
        true
    });
    assert_eq!(sizes, vec![64, 16, 4]);
    ```
    */
    pub fn for_each_level(&self, mut f: impl FnMut(u32, ImageExtent, u64, u64) -> bool) {
        for level in 0..self.mip_levels {
            let extent = self.level_extent(level);
            let slice = self
                .storage_format
                .slice_byte_size(extent, self.sample_count);
            if !f(level, extent, slice, self.level_byte_size(level)) {
                break;
            }
        }
    }

    /// Byte range of the first sample of a level-0 texel. The coordinate after the last spatial
    /// dimension selects the layer.
    pub(crate) fn texel_range(&self, coord: [u32; 3]) -> Option<Range<usize>> {
        let dims = self.storage_format.dimension_count() as usize;
        let size = [
            self.extent.width,
            if dims >= 2 { self.extent.height } else { 1 },
            if dims == 3 { self.extent.depth } else { 1 },
        ];
        let position: [u32; 3] = std::array::from_fn(|d| if d < dims { coord[d] } else { 0 });
        let layer = if dims < 3 { coord[dims] } else { 0 };
        if (0..3).any(|d| position[d] >= size[d]) || layer >= self.layers {
            return None;
        }
        let bytes = self.storage_format.bytes_per_pixel() as u64;
        let samples = if self.storage_format.has_msaa() {
            self.sample_count as u64
        } else {
            1
        };
        let [w, h, d] = size.map(u64::from);
        let index = ((layer as u64 * d + position[2] as u64) * h + position[1] as u64) * w
            + position[0] as u64;
        let start = (index * samples * bytes) as usize;
        Some(start..start + bytes as usize)
    }

    fn validate_extent(&self) -> Result<(), CreateError> {
        let dims = self.format.dimension_count();
        let extent = self.extent;
        if extent.width == 0
            || (dims >= 2 && extent.height == 0)
            || (dims == 3 && extent.depth == 0)
            || (self.format.has_array() && extent.layers == 0)
        {
            return Err(CreateError::InvalidExtent(extent));
        }
        Ok(())
    }
}

/// Converts logical host bytes for the first `levels` levels into full-chain storage bytes.
/// Levels that were not provided are zero.
pub(crate) fn to_storage(info: &ImageInfo, levels: u32, data: &[u8]) -> Result<Vec<u8>, TransferError> {
    let expected = info.host_byte_size(levels);
    if (data.len() as u64) < expected {
        return Err(TransferError::SizeMismatch {
            expected,
            actual: data.len() as u64,
        });
    }
    let mut storage = Vec::with_capacity(info.storage_byte_size() as usize);
    let mut offset = 0;
    for level in 0..levels.min(info.mip_levels) {
        let size = info
            .format
            .total_byte_size(info.level_extent(level), info.sample_count) as usize;
        let logical = &data[offset..offset + size];
        if info.is_shimmed() {
            let widened = convert::widen_to_four_channels(info.format, logical)
                .ok_or(TransferError::UnsupportedConversion(info.format))?;
            storage.extend_from_slice(&widened);
        } else {
            storage.extend_from_slice(logical);
        }
        offset += size;
    }
    storage.resize(info.storage_byte_size() as usize, 0);
    Ok(storage)
}

#[derive(Debug)]
pub struct Image {
    base: MemoryObject<ImageImp>,
    info: ImageInfo,
    creation_error: Option<CreateError>,
    debug_labels: bool,
}

impl Image {
    pub(crate) fn create(
        queue: &Queue,
        extent: ImageExtent,
        format: ImageFormat,
        flags: MemoryFlags,
        host_memory: Option<HostMemory>,
        interop: Option<ForeignInterop>,
    ) -> Image {
        let device = queue.device();
        let state = match &device.imp {
            DeviceImp::Explicit(explicit) => {
                ImageImp::Explicit(ExplicitImage::new(explicit.driver.clone()))
            }
            DeviceImp::Host => ImageImp::Host(HostImage::default()),
        };
        let mut image = Image {
            base: MemoryObject::new(device, host_memory, flags, interop, state),
            info: ImageInfo {
                format,
                storage_format: format,
                extent,
                mip_levels: 1,
                layers: 1,
                sample_count: 1,
            },
            creation_error: None,
            debug_labels: debug_labels(device),
        };
        if let Err(e) = image.allocate(queue) {
            logwise::error_sync!(
                "image creation failed: {err}",
                err = logwise::privacy::LogIt(&e)
            );
            image.creation_error = Some(e);
        }
        image
    }

    fn allocate(&mut self, queue: &Queue) -> Result<(), CreateError> {
        let flags = self.base.flags();
        let mut format = self.info.format;
        if !format.is_valid() {
            return Err(CreateError::InvalidFormat(format));
        }
        if format.access().is_none() {
            format = format.with_access(access_of(flags));
        }
        let device = queue.device();
        let max_mip_levels = device.info().max_mip_levels;
        let storage_format = match &device.imp {
            DeviceImp::Explicit(_) => {
                crate::pixel_formats::resolve_storage(format, vulkan::native_from_format)
                    .map(|(storage, _)| storage)
            }
            DeviceImp::Host => Some(format),
        }
        .ok_or(CreateError::UnsupportedFormat(format))?;
        if storage_format != format {
            logwise::info_sync!(
                "storing {format} as {storage}",
                format = logwise::privacy::LogIt(&format),
                storage = logwise::privacy::LogIt(&storage_format)
            );
        }
        let info = ImageInfo::new(format, storage_format, self.info.extent, max_mip_levels);
        info.validate_extent()?;
        self.info = info;

        let host_levels = if flags.contains(MemoryFlags::GENERATE_MIP_MAPS) {
            1
        } else {
            info.mip_levels
        };
        let initial = match self.base.host_memory() {
            Some(memory) => Some(memory.with(|bytes| to_storage(&info, host_levels, bytes)).map_err(
                |e| match e {
                    TransferError::SizeMismatch { expected, actual } => {
                        CreateError::HostDataSize { expected, actual }
                    }
                    e => CreateError::Transfer(e),
                },
            )?),
            None => None,
        };
        let export = flags
            .contains(MemoryFlags::SHARING)
            .then(|| export_kind(self.base.interop()));
        let request = ImageRequest {
            info: &info,
            flags,
            initial: initial.as_deref(),
            host_memory: self.base.aliased_host_memory(),
            export,
            max_mip_levels,
        };
        let mut state = self.base.acquire()?;
        state.backend_mut().allocate(&queue.imp, &request)
    }

    pub(crate) fn wrap(queue: &Queue, external: &ExternalImage, flags: MemoryFlags) -> Image {
        let device = queue.device();
        let format = external.descriptor(flags);
        let info = ImageInfo::new(
            format.unwrap_or(external.shape),
            format.unwrap_or(external.shape),
            external.extent,
            device.info().max_mip_levels,
        );
        let (state, creation_error) = match (&device.imp, format) {
            (DeviceImp::Explicit(explicit), Some(_)) => (
                ImageImp::Explicit(ExplicitImage::wrap(
                    explicit.driver.clone(),
                    external,
                    info,
                    flags,
                )),
                None,
            ),
            (DeviceImp::Explicit(_), None) => (
                ImageImp::Host(HostImage::default()),
                Some(CreateError::UnsupportedFormat(external.shape)),
            ),
            (DeviceImp::Host, _) => (
                ImageImp::Host(HostImage::default()),
                Some(CreateError::Unsupported("wrapping native images")),
            ),
        };
        if let Some(e) = &creation_error {
            logwise::error_sync!(
                "image wrapping failed: {err}",
                err = logwise::privacy::LogIt(e)
            );
        }
        Image {
            base: MemoryObject::new(device, None, flags, None, state),
            info,
            creation_error,
            debug_labels: debug_labels(device),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.creation_error.is_none()
    }
    pub fn creation_error(&self) -> Option<&CreateError> {
        self.creation_error.as_ref()
    }
    pub fn info(&self) -> &ImageInfo {
        &self.info
    }
    pub fn format(&self) -> ImageFormat {
        self.info.format
    }
    /// The normalized flags.
    pub fn flags(&self) -> MemoryFlags {
        self.base.flags()
    }
    pub fn corrections(&self) -> &[Correction] {
        self.base.corrections()
    }
    pub fn device(&self) -> Option<Arc<Device>> {
        self.base.device()
    }
    pub fn interop(&self) -> Option<ForeignInterop> {
        self.base.interop()
    }

    fn state<E: From<MemoryError>>(&self, invalid: E) -> Result<Exclusive<'_, ImageImp>, E> {
        if !self.is_valid() {
            return Err(invalid);
        }
        Ok(self.base.acquire()?)
    }

    /// Copies the whole mip chain out, in storage bytes.
    pub fn read(&self, queue: &Queue) -> Result<Vec<u8>, TransferError> {
        let mut state = self.state(TransferError::InvalidObject)?;
        let backend = state.backend_mut();
        let data = backend.map(&queue.imp, MapFlags::READ)?;
        backend.unmap(&queue.imp, MapFlags::READ, &[])?;
        self.refresh_host_memory(&data);
        Ok(data)
    }

    /// Like [`Image::read`], into `out`, which must hold the whole chain.
    pub fn read_into(&self, queue: &Queue, out: &mut [u8]) -> Result<(), TransferError> {
        let data = self.read(queue)?;
        let Some(target) = out.get_mut(..data.len()) else {
            return Err(TransferError::SizeMismatch {
                expected: data.len() as u64,
                actual: out.len() as u64,
            });
        };
        target.copy_from_slice(&data);
        Ok(())
    }

    /**
    Replaces the contents with logical host bytes.

    `data` holds every level, or only level 0 when the image generates its mip maps, which are
    then regenerated.
    */
    pub fn write(&self, queue: &Queue, data: &[u8]) -> Result<(), TransferError> {
        let mut state = self.state(TransferError::InvalidObject)?;
        let levels = if self.generates_mips() {
            1
        } else {
            self.info.mip_levels
        };
        let storage = to_storage(&self.info, levels, data)?;
        self.write_storage(&mut state, queue, &storage)?;
        if self.info.is_shimmed() {
            return Ok(());
        }
        if let Some(memory) = self.base.aliased_host_memory() {
            memory.with_mut(|bytes| {
                let len = bytes.len().min(data.len());
                bytes[..len].copy_from_slice(&data[..len]);
            });
        }
        Ok(())
    }

    pub fn zero(&self, queue: &Queue) -> Result<(), TransferError> {
        let mut state = self.state(TransferError::InvalidObject)?;
        let zeroes = vec![0; self.info.storage_byte_size() as usize];
        state
            .backend_mut()
            .unmap(&queue.imp, MapFlags::WRITE_INVALIDATE, &zeroes)
    }

    fn generates_mips(&self) -> bool {
        self.base.flags().contains(MemoryFlags::GENERATE_MIP_MAPS) && self.info.mip_levels > 1
    }

    fn write_storage(
        &self,
        state: &mut Exclusive<'_, ImageImp>,
        queue: &Queue,
        storage: &[u8],
    ) -> Result<(), TransferError> {
        let backend = state.backend_mut();
        backend.unmap(&queue.imp, MapFlags::WRITE_INVALIDATE, storage)?;
        if self.generates_mips() {
            backend.generate_mip_maps(Target::immediate(&queue.imp))?;
        }
        Ok(())
    }

    fn refresh_host_memory(&self, storage: &[u8]) {
        if self.info.is_shimmed() {
            return;
        }
        if let Some(memory) = self.base.aliased_host_memory() {
            memory.with_mut(|bytes| {
                if bytes.as_slice() != storage && bytes.len() <= storage.len() {
                    let len = bytes.len();
                    bytes.copy_from_slice(&storage[..len]);
                }
            });
        }
    }

    /**
    Maps the whole chain for host access.

    The image stays locked until the mapping is unmapped or dropped. Writing mappings are
    uploaded on unmap, after which mip maps are regenerated if the image generates them.
    */
    pub fn map<'a>(&'a self, queue: &'a Queue, flags: MapFlags) -> Result<MappedImage<'a>, TransferError> {
        let mut state = self.state(TransferError::InvalidObject)?;
        let data = state.backend_mut().map(&queue.imp, flags)?;
        Ok(MappedImage {
            image: self,
            queue,
            state: Some(state),
            flags,
            data,
        })
    }

    fn target<'a>(
        &self,
        queue: &'a Queue,
        recording: Option<&'a mut CommandRecording<'_>>,
    ) -> Result<Target<'a>, TransitionError> {
        if let Some(device) = self.base.device()
            && device.id() != queue.device().id()
        {
            return Err(TransitionError::ForeignQueue);
        }
        let recording = match recording {
            Some(recording) if !std::ptr::eq(recording.queue(), queue) => {
                return Err(TransitionError::ForeignQueue);
            }
            Some(recording) => Some(recording.imp_mut()),
            None => None,
        };
        Ok(Target {
            queue: &queue.imp,
            recording,
        })
    }

    /// Regenerates levels 1 and up from level 0.
    pub fn generate_mip_maps(
        &self,
        queue: &Queue,
        recording: Option<&mut CommandRecording<'_>>,
    ) -> Result<(), TransitionError> {
        let mut state = self.state(TransitionError::InvalidObject)?;
        if self.info.mip_levels < 2 {
            return Ok(());
        }
        state
            .backend_mut()
            .generate_mip_maps(self.target(queue, recording)?)
    }

    /// Makes the image readable by kernels and shaders. With `allow_general`, an image already
    /// in the general layout with read access is left alone.
    pub fn transition_read(
        &self,
        queue: &Queue,
        recording: Option<&mut CommandRecording<'_>>,
        allow_general: bool,
    ) -> Result<(), TransitionError> {
        let mut state = self.state(TransitionError::InvalidObject)?;
        state
            .backend_mut()
            .transition_read(self.target(queue, recording)?, allow_general)
    }

    /// Makes the image writable by kernels and shaders, or directly as an attachment with
    /// `rt_direct_write`.
    pub fn transition_write(
        &self,
        queue: &Queue,
        recording: Option<&mut CommandRecording<'_>>,
        read_write: bool,
        rt_direct_write: bool,
        allow_general: bool,
    ) -> Result<(), TransitionError> {
        let mut state = self.state(TransitionError::InvalidObject)?;
        state.backend_mut().transition_write(
            self.target(queue, recording)?,
            read_write,
            rt_direct_write,
            allow_general,
        )
    }

    /// Names the native objects in debugging tools, when the device enables labels.
    pub fn set_debug_label(&self, label: &str) {
        if !self.debug_labels {
            return;
        }
        match self.base.acquire() {
            Ok(state) => state.backend().set_debug_label(label),
            Err(e) => logwise::warn_sync!(
                "can't label image: {err}",
                err = logwise::privacy::LogIt(&e)
            ),
        }
    }

    fn explicit<R>(&self, f: impl FnOnce(&ExplicitImage) -> R) -> Option<R> {
        let state = self.base.acquire().ok()?;
        match &*state {
            ImageImp::Explicit(image) => Some(f(image)),
            ImageImp::Host(_) => None,
        }
    }

    /// Records one barrier to an arbitrary layout and access mask. Explicit devices only.
    #[allow(clippy::too_many_arguments)]
    pub fn transition(
        &self,
        queue: &Queue,
        recording: Option<&mut CommandRecording<'_>>,
        dst_access: AccessFlags,
        layout: ImageLayout,
        src_stages: PipelineStages,
        dst_stages: PipelineStages,
        dst_queue_family: u32,
    ) -> Result<(), TransitionError> {
        let mut state = self.state(TransitionError::InvalidObject)?;
        let ImageImp::Explicit(image) = &mut *state else {
            return Err(TransitionError::ForeignQueue);
        };
        let mut recorder = self.target(queue, recording)?.explicit()?;
        image.transition(
            &mut recorder,
            dst_access,
            layout,
            src_stages,
            dst_stages,
            dst_queue_family,
        )?;
        Ok(())
    }

    pub fn layout(&self) -> Option<ImageLayout> {
        self.explicit(|image| image.layout())
    }
    pub fn access_mask(&self) -> Option<AccessFlags> {
        self.explicit(|image| image.access())
    }
    pub fn native_handle(&self) -> Option<ImageHandle> {
        self.explicit(|image| image.handle()).flatten()
    }
    pub fn native_view(&self) -> Option<ViewHandle> {
        self.explicit(|image| image.view()).flatten()
    }
    /// One view per mip level, padded to the device's maximum level count.
    pub fn level_views(&self) -> Vec<ViewHandle> {
        self.explicit(|image| image.level_views().to_vec())
            .unwrap_or_default()
    }
    /// Per-layer images of an aliased array, sharing the array's allocation.
    pub fn layer_handles(&self) -> Vec<ImageHandle> {
        self.explicit(|image| image.layer_images().to_vec())
            .unwrap_or_default()
    }
    /// Where each per-layer image is bound in the allocation.
    pub fn layer_offsets(&self) -> Vec<u64> {
        self.explicit(|image| image.layer_offsets().to_vec())
            .unwrap_or_default()
    }
    pub fn allocation_size(&self) -> Option<u64> {
        self.explicit(|image| image.allocation_size())
    }
    /// The handle exported at creation, for images created with [`MemoryFlags::SHARING`].
    pub fn shared_handle(&self) -> Option<SharedHandle> {
        self.explicit(|image| image.shared_handle()).flatten()
    }
    pub fn is_external(&self) -> bool {
        self.explicit(|image| image.is_external()).unwrap_or(false)
    }

    /// Adopts a layout and access mask established outside this crate.
    pub fn update_with_external_state(
        &self,
        layout: ImageLayout,
        access: AccessFlags,
    ) -> Result<(), MemoryError> {
        let mut state = self.base.acquire()?;
        if let ImageImp::Explicit(image) = &mut *state {
            image.update_with_external_state(layout, access);
        }
        Ok(())
    }

    pub(crate) fn host_storage(&self) -> Result<(HostMemory, ImageInfo), ExecuteError> {
        let state = self.state(ExecuteError::InvalidObject)?;
        match &*state {
            ImageImp::Host(image) => image.storage().ok_or(ExecuteError::InvalidObject),
            ImageImp::Explicit(_) => Err(ExecuteError::InvalidObject),
        }
    }

    /// Records the transition `access` needs into `recording` and returns the binding.
    pub(crate) fn bind_explicit(
        &self,
        recording: &mut ExplicitRecording,
        access: Access,
    ) -> Result<BoundArgument, ExecuteError> {
        let mut state = self.state(ExecuteError::InvalidObject)?;
        let ImageImp::Explicit(image) = &mut *state else {
            return Err(ExecuteError::InvalidObject);
        };
        let mut recorder = Recorder::Deferred(recording);
        match access {
            Access::Read => image.transition_read(&mut recorder, true)?,
            Access::Write => image.transition_write(&mut recorder, false, false, true)?,
            Access::ReadWrite => image.transition_write(&mut recorder, true, false, true)?,
        }
        let view = image.view().ok_or(ExecuteError::InvalidObject)?;
        Ok(BoundArgument::Image {
            view,
            level_views: image.level_views().to_vec(),
            layout: image.layout(),
        })
    }
}

fn debug_labels(device: &Device) -> bool {
    matches!(&device.imp, DeviceImp::Explicit(explicit) if explicit.debug_labels)
}

impl Drop for Image {
    fn drop(&mut self) {
        if let Some(state) = self.base.teardown() {
            state.backend_mut().destroy();
        }
    }
}

/// Host access to an image's storage bytes. See [`Image::map`].
#[derive(Debug)]
pub struct MappedImage<'a> {
    image: &'a Image,
    queue: &'a Queue,
    state: Option<Exclusive<'a, ImageImp>>,
    flags: MapFlags,
    data: Vec<u8>,
}

impl MappedImage<'_> {
    pub fn flags(&self) -> MapFlags {
        self.flags
    }

    /// Ends the mapping, reporting upload failures that dropping would only log.
    pub fn unmap(mut self) -> Result<(), TransferError> {
        self.finish()
    }

    fn finish(&mut self) -> Result<(), TransferError> {
        let Some(mut state) = self.state.take() else {
            return Ok(());
        };
        let backend = state.backend_mut();
        backend.unmap(&self.queue.imp, self.flags, &self.data)?;
        if self.flags.writes() {
            if self.image.generates_mips() {
                backend.generate_mip_maps(Target::immediate(&self.queue.imp))?;
            }
        } else {
            self.image.refresh_host_memory(&self.data);
        }
        Ok(())
    }
}

impl Deref for MappedImage<'_> {
    type Target = [u8];
    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl DerefMut for MappedImage<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl Drop for MappedImage<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            logwise::error_sync!(
                "unmapping image failed: {err}",
                err = logwise::privacy::LogIt(&e)
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::pixel_formats::ImageFlags;

    fn info(format: ImageFormat, extent: ImageExtent) -> ImageInfo {
        ImageInfo::new(format, format, extent, 15)
    }

    #[test]
    fn mip_chain_offsets() {
        let format = ImageFormat::IMAGE_2D
            .union(ImageFormat::R8)
            .with(ImageFlags::MIPMAPPED);
        let info = info(format, ImageExtent::new_2d(8, 4));
        assert_eq!(info.mip_levels, 4);
        assert_eq!(info.level_byte_size(0), 32);
        assert_eq!(info.level_offset(1), 32);
        assert_eq!(info.level_offset(2), 40);
        assert_eq!(info.storage_byte_size(), 32 + 8 + 2 + 1);
    }

    #[test]
    fn mip_levels_respect_device_limit() {
        let format = ImageFormat::IMAGE_2D
            .union(ImageFormat::R8)
            .with(ImageFlags::MIPMAPPED);
        let info = ImageInfo::new(format, format, ImageExtent::new_2d(256, 256), 3);
        assert_eq!(info.mip_levels, 3);
    }

    #[test]
    fn texel_ranges_address_layers() {
        let format = ImageFormat::IMAGE_2D_ARRAY.union(ImageFormat::RGBA8);
        let info = info(format, ImageExtent::new_2d(4, 2).with_layers(3));
        assert_eq!(info.texel_range([1, 0, 0]), Some(4..8));
        assert_eq!(info.texel_range([0, 1, 0]), Some(16..20));
        assert_eq!(info.texel_range([0, 0, 2]), Some(64..68));
        assert_eq!(info.texel_range([4, 0, 0]), None);
        assert_eq!(info.texel_range([0, 0, 3]), None);
    }

    #[test]
    fn access_follows_flags() {
        assert_eq!(access_of(MemoryFlags::READ), Access::Read);
        assert_eq!(access_of(MemoryFlags::WRITE), Access::Write);
        assert_eq!(access_of(MemoryFlags::READ_WRITE), Access::ReadWrite);
    }

    #[test]
    fn host_data_is_widened() {
        let format = ImageFormat::IMAGE_2D.union(ImageFormat::RGB8);
        let info = ImageInfo::new(
            format,
            format.four_channel_storage(),
            ImageExtent::new_2d(2, 1),
            15,
        );
        assert!(info.is_shimmed());
        let storage = to_storage(&info, 1, &[1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(storage, vec![1, 2, 3, 255, 4, 5, 6, 255]);
        assert_eq!(
            to_storage(&info, 1, &[1, 2, 3]),
            Err(TransferError::SizeMismatch {
                expected: 6,
                actual: 3
            })
        );
    }

    #[test]
    fn invalid_images_report_their_error() {
        let context = Context::host();
        let queue = context.create_queue(context.device()).unwrap();
        let image = context.create_image(
            &queue,
            ImageExtent::new_2d(0, 4),
            ImageFormat::IMAGE_2D.union(ImageFormat::R8),
            MemoryFlags::READ_WRITE,
            None,
            None,
        );
        assert!(!image.is_valid());
        assert_eq!(
            image.creation_error(),
            Some(&CreateError::InvalidExtent(ImageExtent::new_2d(0, 4)))
        );
        assert_eq!(image.read(&queue), Err(TransferError::InvalidObject));
    }

    #[test]
    fn mapping_writes_back_on_drop() {
        let context = Context::host();
        let queue = context.create_queue(context.device()).unwrap();
        let image = context.create_image(
            &queue,
            ImageExtent::new_2d(2, 2),
            ImageFormat::IMAGE_2D.union(ImageFormat::R8),
            MemoryFlags::READ_WRITE,
            None,
            None,
        );
        {
            let mut mapping = image.map(&queue, MapFlags::WRITE_INVALIDATE).unwrap();
            mapping.copy_from_slice(&[1, 2, 3, 4]);
        }
        assert_eq!(image.read(&queue).unwrap(), vec![1, 2, 3, 4]);
    }
}
