// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Backend implementations.

Every resource carries one closed enum with a variant per backend. Backend-specific behavior lives
only in the leaf types; images reach theirs through [`ImageBackend`], a single level of dynamic
dispatch.
*/

pub mod explicit;
pub(crate) mod host;

use crate::error::{CreateError, TransferError, TransitionError};
use crate::image::ImageInfo;
use crate::memory::HostMemory;
use crate::memory_flags::{ForeignKind, MapFlags, MemoryFlags};
use explicit::Driver;
use explicit::buffer::ExplicitBuffer;
use explicit::image::ExplicitImage;
use explicit::kernel::ExplicitKernel;
use explicit::queue::{ExplicitQueue, ExplicitRecording, Recorder};
use host::{HostBuffer, HostImage, HostQueue, HostRecording};
use std::sync::Arc;

#[derive(Debug)]
pub(crate) struct ExplicitDevice {
    pub(crate) driver: Arc<dyn Driver>,
    pub(crate) queue_family: u32,
    pub(crate) debug_labels: bool,
}

#[derive(Debug)]
pub(crate) enum DeviceImp {
    Explicit(ExplicitDevice),
    Host,
}

#[derive(Debug)]
pub(crate) enum QueueImp {
    Explicit(ExplicitQueue),
    Host(HostQueue),
}

#[derive(Debug)]
pub(crate) enum RecordingImp {
    Explicit(ExplicitRecording),
    Host(HostRecording),
}

#[derive(Debug)]
pub(crate) enum BufferImp {
    Explicit(ExplicitBuffer),
    Host(HostBuffer),
}

#[derive(Debug)]
pub(crate) enum ImageImp {
    Explicit(ExplicitImage),
    Host(HostImage),
}

#[derive(Debug)]
pub(crate) enum KernelEntryImp {
    Explicit(ExplicitKernel),
    Host(host::HostKernel),
}

/// What an image is created from.
pub(crate) struct ImageRequest<'a> {
    pub(crate) info: &'a ImageInfo,
    pub(crate) flags: MemoryFlags,
    /// Full-chain initial contents in the storage format.
    pub(crate) initial: Option<&'a [u8]>,
    /// Host memory the image aliases, when it uses host memory.
    pub(crate) host_memory: Option<&'a HostMemory>,
    pub(crate) export: Option<ForeignKind>,
    pub(crate) max_mip_levels: u32,
}

/// Where a transition records: a caller-supplied recording, or a disposable one on `queue`.
pub(crate) struct Target<'a> {
    pub(crate) queue: &'a QueueImp,
    pub(crate) recording: Option<&'a mut RecordingImp>,
}

impl<'a> Target<'a> {
    pub(crate) fn immediate(queue: &'a QueueImp) -> Self {
        Target {
            queue,
            recording: None,
        }
    }

    pub(crate) fn explicit(self) -> Result<Recorder<'a>, TransitionError> {
        match (self.queue, self.recording) {
            (_, Some(RecordingImp::Explicit(recording))) => Ok(Recorder::Deferred(recording)),
            (QueueImp::Explicit(queue), None) => Ok(Recorder::Immediate(queue)),
            _ => Err(TransitionError::ForeignQueue),
        }
    }
}

impl QueueImp {
    pub(crate) fn explicit(&self) -> Result<&ExplicitQueue, TransitionError> {
        match self {
            QueueImp::Explicit(queue) => Ok(queue),
            QueueImp::Host(_) => Err(TransitionError::ForeignQueue),
        }
    }
}

/// The operations every backend image provides.
pub(crate) trait ImageBackend {
    fn allocate(&mut self, queue: &QueueImp, request: &ImageRequest<'_>) -> Result<(), CreateError>;
    fn transition_read(&mut self, target: Target<'_>, allow_general: bool) -> Result<(), TransitionError>;
    fn transition_write(
        &mut self,
        target: Target<'_>,
        read_write: bool,
        rt_direct_write: bool,
        allow_general: bool,
    ) -> Result<(), TransitionError>;
    /// Full-chain storage bytes; zeroes when `flags` don't need the current contents.
    fn map(&mut self, queue: &QueueImp, flags: MapFlags) -> Result<Vec<u8>, TransferError>;
    fn unmap(&mut self, queue: &QueueImp, flags: MapFlags, data: &[u8]) -> Result<(), TransferError>;
    fn generate_mip_maps(&mut self, target: Target<'_>) -> Result<(), TransitionError>;
    fn destroy(&mut self);
    fn set_debug_label(&self, _label: &str) {}
}

impl ImageImp {
    pub(crate) fn backend(&self) -> &dyn ImageBackend {
        match self {
            ImageImp::Explicit(image) => image,
            ImageImp::Host(image) => image,
        }
    }
    pub(crate) fn backend_mut(&mut self) -> &mut dyn ImageBackend {
        match self {
            ImageImp::Explicit(image) => image,
            ImageImp::Host(image) => image,
        }
    }
}

impl ImageBackend for ExplicitImage {
    fn allocate(&mut self, queue: &QueueImp, request: &ImageRequest<'_>) -> Result<(), CreateError> {
        ExplicitImage::allocate(self, queue.explicit()?, request)
    }
    fn transition_read(&mut self, target: Target<'_>, allow_general: bool) -> Result<(), TransitionError> {
        ExplicitImage::transition_read(self, &mut target.explicit()?, allow_general)
    }
    fn transition_write(
        &mut self,
        target: Target<'_>,
        read_write: bool,
        rt_direct_write: bool,
        allow_general: bool,
    ) -> Result<(), TransitionError> {
        ExplicitImage::transition_write(
            self,
            &mut target.explicit()?,
            read_write,
            rt_direct_write,
            allow_general,
        )
    }
    fn map(&mut self, queue: &QueueImp, flags: MapFlags) -> Result<Vec<u8>, TransferError> {
        ExplicitImage::map(self, queue.explicit()?, flags)
    }
    fn unmap(&mut self, queue: &QueueImp, flags: MapFlags, data: &[u8]) -> Result<(), TransferError> {
        ExplicitImage::unmap(self, queue.explicit()?, flags, data)
    }
    fn generate_mip_maps(&mut self, target: Target<'_>) -> Result<(), TransitionError> {
        ExplicitImage::generate_mip_maps(self, &mut target.explicit()?)
    }
    fn destroy(&mut self) {
        ExplicitImage::destroy(self)
    }
    fn set_debug_label(&self, label: &str) {
        ExplicitImage::set_debug_label(self, label)
    }
}
