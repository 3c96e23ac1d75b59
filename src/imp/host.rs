// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
The host (CPU) backend.

Buffers and images are plain host bytes. There is no GPU-visibility state, so transitions do
nothing. Kernels are Rust closures, run on the submitting thread once per work-item of the
dispatch grid.
*/

use super::{ImageBackend, ImageRequest, QueueImp, Target};
use crate::error::{CreateError, ExecuteError, TransferError, TransitionError};
use crate::image::ImageInfo;
use crate::kernel::{ArgValue, HostArgs, HostKernelFn, HostSlot, WorkItem};
use crate::memory::HostMemory;
use crate::memory_flags::{MapFlags, MemoryFlags};
use crate::pixel_formats::convert;
use std::fmt::Debug;
use std::sync::Mutex;
use std::time::Instant;

#[derive(Clone)]
pub(crate) struct HostKernel(pub(crate) HostKernelFn);

impl Debug for HostKernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("HostKernel(..)")
    }
}

#[derive(Debug, Default)]
pub(crate) struct HostQueue {
    profiling: Mutex<Option<Instant>>,
}

impl HostQueue {
    pub(crate) fn start_profiling(&self) {
        *self.profiling.lock().unwrap_or_else(|e| e.into_inner()) = Some(Instant::now());
    }
    pub(crate) fn stop_profiling(&self) -> u64 {
        self.profiling
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .map_or(0, |start| start.elapsed().as_micros() as u64)
    }
}

#[derive(Debug)]
struct HostDispatch {
    kernel: HostKernel,
    global_size: [u32; 3],
    local_size: [u32; 3],
    args: Vec<ArgValue>,
}

/// Dispatches waiting for their recording to be submitted.
#[derive(Debug, Default)]
pub(crate) struct HostRecording {
    dispatches: Vec<HostDispatch>,
}

impl HostRecording {
    pub(crate) fn push(
        &mut self,
        kernel: HostKernel,
        global_size: [u32; 3],
        local_size: [u32; 3],
        args: Vec<ArgValue>,
    ) {
        self.dispatches.push(HostDispatch {
            kernel,
            global_size,
            local_size,
            args,
        });
    }

    /// Runs every dispatch in recording order, stopping at the first failure.
    pub(crate) fn run(self) -> Result<(), ExecuteError> {
        for dispatch in self.dispatches {
            run(
                &dispatch.kernel,
                dispatch.global_size,
                dispatch.local_size,
                &dispatch.args,
            )?;
        }
        Ok(())
    }
}

/// Runs `kernel` over the grid. Partial work-groups at the grid edge skip out-of-range items.
pub(crate) fn run(
    kernel: &HostKernel,
    global_size: [u32; 3],
    local_size: [u32; 3],
    args: &[ArgValue],
) -> Result<(), ExecuteError> {
    let mut memories: Vec<Option<(HostMemory, Option<ImageInfo>)>> = Vec::with_capacity(args.len());
    for (index, arg) in args.iter().enumerate() {
        let memory = match arg {
            ArgValue::Scalar(_) => None,
            ArgValue::Buffer(buffer) => Some((buffer.host_storage()?, None)),
            ArgValue::ArgumentBuffer(buffer) => Some((buffer.buffer().host_storage()?, None)),
            ArgValue::Image(image) => {
                let (storage, info) = image.host_storage()?;
                Some((storage, Some(info)))
            }
        };
        if let Some((memory, _)) = &memory
            && memories
                .iter()
                .flatten()
                .any(|(other, _)| other.same_as(memory))
        {
            return Err(ExecuteError::AliasedArgument { index });
        }
        memories.push(memory);
    }
    let slots = args
        .iter()
        .zip(&memories)
        .map(|(arg, memory)| match (arg, memory) {
            (_, Some((memory, Some(info)))) => HostSlot::Image(memory.lock(), *info),
            (_, Some((memory, None))) => HostSlot::Memory(memory.lock()),
            (ArgValue::Scalar(bytes), None) => HostSlot::Scalar(bytes.as_slice()),
            //every non-scalar argument resolved to memory above
            (_, None) => HostSlot::Scalar(&[]),
        })
        .collect();
    let mut host_args = HostArgs { slots };

    let groups: [u32; 3] = std::array::from_fn(|d| global_size[d].div_ceil(local_size[d]));
    logwise::trace_sync!(
        "host dispatch over {groups} groups",
        groups = logwise::privacy::LogIt(&groups)
    );
    for gz in 0..groups[2] {
        for gy in 0..groups[1] {
            for gx in 0..groups[0] {
                let group_id = [gx, gy, gz];
                for lz in 0..local_size[2] {
                    for ly in 0..local_size[1] {
                        for lx in 0..local_size[0] {
                            let local_id = [lx, ly, lz];
                            let global_id: [u32; 3] =
                                std::array::from_fn(|d| group_id[d] * local_size[d] + local_id[d]);
                            if (0..3).any(|d| global_id[d] >= global_size[d]) {
                                continue;
                            }
                            let item = WorkItem {
                                global_id,
                                local_id,
                                group_id,
                                global_size,
                                local_size,
                            };
                            (kernel.0)(&item, &mut host_args);
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

#[derive(Debug)]
pub(crate) struct HostBuffer {
    storage: HostMemory,
}

impl HostBuffer {
    /// Uses `alias` directly when it is exactly `size` bytes, otherwise copies `initial` into
    /// fresh storage.
    pub(crate) fn new(size: u64, initial: Option<&[u8]>, alias: Option<&HostMemory>) -> Self {
        if let Some(alias) = alias {
            if alias.len() as u64 == size {
                return HostBuffer {
                    storage: alias.clone(),
                };
            }
            logwise::warn_sync!(
                "host memory is {len} bytes but the buffer is {size}, copying instead of aliasing",
                len = alias.len(),
                size = size
            );
        }
        let storage = HostMemory::zeroed(size as usize);
        if let Some(initial) = initial {
            storage.with_mut(|bytes| {
                let len = initial.len().min(bytes.len());
                bytes[..len].copy_from_slice(&initial[..len]);
            });
        }
        HostBuffer { storage }
    }

    pub(crate) fn storage(&self) -> &HostMemory {
        &self.storage
    }
    pub(crate) fn read(&self) -> Vec<u8> {
        self.storage.to_vec()
    }
    pub(crate) fn write(&self, data: &[u8]) {
        self.storage.with_mut(|bytes| {
            let len = data.len().min(bytes.len());
            bytes[..len].copy_from_slice(&data[..len]);
        });
    }
    pub(crate) fn zero(&self) {
        self.storage.with_mut(|bytes| bytes.fill(0));
    }
    pub(crate) fn copy_from(&self, src: &HostBuffer) {
        if self.storage.same_as(&src.storage) {
            return;
        }
        let data = src.storage.to_vec();
        self.write(&data);
    }
}

#[derive(Debug, Default)]
pub(crate) struct HostImage {
    storage: Option<HostMemory>,
    info: Option<ImageInfo>,
}

impl HostImage {
    pub(crate) fn storage(&self) -> Option<(HostMemory, ImageInfo)> {
        Some((self.storage.clone()?, self.info?))
    }

    fn storage_or_invalid(&self) -> Result<&HostMemory, TransferError> {
        self.storage.as_ref().ok_or(TransferError::InvalidObject)
    }
}

impl ImageBackend for HostImage {
    fn allocate(&mut self, queue: &QueueImp, request: &ImageRequest<'_>) -> Result<(), CreateError> {
        let info = *request.info;
        self.info = Some(info);
        let size = info.storage_byte_size();
        let storage = match request.host_memory {
            Some(memory) if !info.is_shimmed() && memory.len() as u64 == size => memory.clone(),
            Some(_) => {
                logwise::warn_sync!(
                    "host memory doesn't match the image storage, copying instead of aliasing"
                );
                HostMemory::zeroed(size as usize)
            }
            None => HostMemory::zeroed(size as usize),
        };
        self.storage = Some(storage.clone());
        if let Some(data) = request.initial {
            if request.flags.contains(MemoryFlags::NO_INITIAL_COPY) {
                logwise::trace_sync!("skipping initial copy");
            } else if info.format.has_render_target() {
                logwise::error_sync!("can't initialize a render target with host data");
            } else {
                storage.with_mut(|bytes| {
                    let len = data.len().min(bytes.len());
                    bytes[..len].copy_from_slice(&data[..len]);
                });
            }
        }
        if request.flags.contains(MemoryFlags::GENERATE_MIP_MAPS) && info.mip_levels > 1 {
            self.generate_mip_maps(Target::immediate(queue))?;
        }
        Ok(())
    }

    fn transition_read(&mut self, _target: Target<'_>, _allow_general: bool) -> Result<(), TransitionError> {
        Ok(())
    }

    fn transition_write(
        &mut self,
        _target: Target<'_>,
        _read_write: bool,
        _rt_direct_write: bool,
        _allow_general: bool,
    ) -> Result<(), TransitionError> {
        Ok(())
    }

    fn map(&mut self, _queue: &QueueImp, flags: MapFlags) -> Result<Vec<u8>, TransferError> {
        let storage = self.storage_or_invalid()?;
        if flags.needs_download() {
            Ok(storage.to_vec())
        } else {
            Ok(vec![0; storage.len()])
        }
    }

    fn unmap(&mut self, _queue: &QueueImp, flags: MapFlags, data: &[u8]) -> Result<(), TransferError> {
        let storage = self.storage_or_invalid()?;
        if flags.writes() {
            storage.with_mut(|bytes| {
                let len = data.len().min(bytes.len());
                bytes[..len].copy_from_slice(&data[..len]);
            });
        }
        Ok(())
    }

    fn generate_mip_maps(&mut self, _target: Target<'_>) -> Result<(), TransitionError> {
        let (Some(storage), Some(info)) = (&self.storage, self.info) else {
            return Err(TransitionError::InvalidObject);
        };
        storage.with_mut(|bytes| {
            for level in 1..info.mip_levels {
                let src_offset = info.level_offset(level - 1) as usize;
                let src_size = info.level_byte_size(level - 1) as usize;
                let dst_offset = info.level_offset(level) as usize;
                let Some(src) = bytes.get(src_offset..src_offset + src_size) else {
                    return;
                };
                let dst = convert::downsample(
                    info.storage_format,
                    src,
                    info.level_extent(level - 1),
                    info.level_extent(level),
                );
                if let Some(target) = bytes.get_mut(dst_offset..dst_offset + dst.len()) {
                    target.copy_from_slice(&dst);
                }
            }
        });
        Ok(())
    }

    fn destroy(&mut self) {
        self.storage = None;
    }
}
