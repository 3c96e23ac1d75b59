// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Linear device memory.

Like images, buffers are created infallibly: check [`Buffer::is_valid`] before relying on one.
*/

use crate::device::Device;
use crate::error::{CreateError, ExecuteError, TransferError};
use crate::imp::explicit::BufferHandle;
use crate::imp::explicit::buffer::ExplicitBuffer;
use crate::imp::explicit::queue::Recorder;
use crate::imp::host::HostBuffer;
use crate::imp::{BufferImp, DeviceImp, QueueImp, RecordingImp};
use crate::memory::{
    Exclusive, ForeignInterop, HostMemory, MemoryObject, SharedHandle, export_kind,
};
use crate::memory_flags::{Correction, MemoryFlags};
use crate::queue::{CommandRecording, Queue};
use std::sync::Arc;

#[derive(Debug)]
pub struct Buffer {
    base: MemoryObject<BufferImp>,
    size: u64,
    creation_error: Option<CreateError>,
}

impl Buffer {
    pub(crate) fn create(
        queue: &Queue,
        size: u64,
        flags: MemoryFlags,
        host_memory: Option<HostMemory>,
        interop: Option<ForeignInterop>,
    ) -> Buffer {
        let device = queue.device();
        let state = match &device.imp {
            DeviceImp::Explicit(explicit) => {
                BufferImp::Explicit(ExplicitBuffer::new(explicit.driver.clone()))
            }
            DeviceImp::Host => BufferImp::Host(HostBuffer::new(0, None, None)),
        };
        let mut buffer = Buffer {
            base: MemoryObject::new(device, host_memory, flags, interop, state),
            size,
            creation_error: None,
        };
        if let Err(e) = buffer.allocate(queue) {
            logwise::error_sync!(
                "buffer creation failed: {err}",
                err = logwise::privacy::LogIt(&e)
            );
            buffer.creation_error = Some(e);
        }
        buffer
    }

    fn allocate(&mut self, queue: &Queue) -> Result<(), CreateError> {
        if self.size == 0 {
            return Err(CreateError::ZeroSize);
        }
        let flags = self.base.flags();
        let initial = self.base.host_memory().map(HostMemory::to_vec);
        if let Some(initial) = &initial
            && (initial.len() as u64) < self.size
            && !flags.contains(MemoryFlags::NO_INITIAL_COPY)
        {
            return Err(CreateError::HostDataSize {
                expected: self.size,
                actual: initial.len() as u64,
            });
        }
        let initial = initial.filter(|_| !flags.contains(MemoryFlags::NO_INITIAL_COPY));
        let export = flags
            .contains(MemoryFlags::SHARING)
            .then(|| export_kind(self.base.interop()));
        let size = self.size;
        let alias = self.base.aliased_host_memory();
        let mut state = self.base.acquire()?;
        match (&mut *state, &queue.imp) {
            (BufferImp::Explicit(buffer), QueueImp::Explicit(queue)) => {
                buffer.allocate(queue, size, initial.as_deref(), export)
            }
            (BufferImp::Host(buffer), QueueImp::Host(_)) => {
                if export.is_some() {
                    return Err(CreateError::Unsupported("exporting host memory"));
                }
                *buffer = HostBuffer::new(size, initial.as_deref(), alias);
                Ok(())
            }
            _ => Err(CreateError::DeviceGone),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.creation_error.is_none()
    }
    pub fn creation_error(&self) -> Option<&CreateError> {
        self.creation_error.as_ref()
    }
    pub fn size(&self) -> u64 {
        self.size
    }
    pub fn flags(&self) -> MemoryFlags {
        self.base.flags()
    }
    pub fn corrections(&self) -> &[Correction] {
        self.base.corrections()
    }
    pub fn device(&self) -> Option<Arc<Device>> {
        self.base.device()
    }

    fn state(&self) -> Result<Exclusive<'_, BufferImp>, TransferError> {
        if !self.is_valid() {
            return Err(TransferError::InvalidObject);
        }
        Ok(self.base.acquire()?)
    }

    pub fn read(&self, queue: &Queue) -> Result<Vec<u8>, TransferError> {
        let state = self.state()?;
        let data = match (&*state, &queue.imp) {
            (BufferImp::Explicit(buffer), QueueImp::Explicit(queue)) => buffer.read(queue)?,
            (BufferImp::Host(buffer), QueueImp::Host(_)) => buffer.read(),
            _ => return Err(TransferError::InvalidObject),
        };
        if let Some(memory) = self.base.aliased_host_memory()
            && memory.len() == data.len()
            && !matches!(&*state, BufferImp::Host(buffer) if buffer.storage().same_as(memory))
        {
            memory.with_mut(|bytes| bytes.copy_from_slice(&data));
        }
        Ok(data)
    }

    pub fn read_into(&self, queue: &Queue, out: &mut [u8]) -> Result<(), TransferError> {
        let data = self.read(queue)?;
        let len = data.len().min(out.len());
        out[..len].copy_from_slice(&data[..len]);
        Ok(())
    }

    /// Writes `data` to the start of the buffer.
    pub fn write(&self, queue: &Queue, data: &[u8]) -> Result<(), TransferError> {
        if data.len() as u64 > self.size {
            return Err(TransferError::SizeMismatch {
                expected: self.size,
                actual: data.len() as u64,
            });
        }
        let state = self.state()?;
        match (&*state, &queue.imp) {
            (BufferImp::Explicit(buffer), QueueImp::Explicit(queue)) => buffer.write(queue, data)?,
            (BufferImp::Host(buffer), QueueImp::Host(_)) => buffer.write(data),
            _ => return Err(TransferError::InvalidObject),
        }
        if let Some(memory) = self.base.aliased_host_memory()
            && !matches!(&*state, BufferImp::Host(buffer) if buffer.storage().same_as(memory))
        {
            memory.with_mut(|bytes| {
                let len = bytes.len().min(data.len());
                bytes[..len].copy_from_slice(&data[..len]);
            });
        }
        Ok(())
    }

    pub fn zero(&self, queue: &Queue) -> Result<(), TransferError> {
        let state = self.state()?;
        match (&*state, &queue.imp) {
            (BufferImp::Explicit(buffer), QueueImp::Explicit(queue)) => {
                buffer.fill(&mut Recorder::Immediate(queue), 0)?
            }
            (BufferImp::Host(buffer), QueueImp::Host(_)) => buffer.zero(),
            _ => return Err(TransferError::InvalidObject),
        }
        Ok(())
    }

    /**
    Copies the overlapping prefix of `src` into this buffer.

    With a recording the copy happens when the recording is submitted, and both buffers must stay
    alive until it completed. Copying a buffer onto itself does nothing.
    */
    pub fn copy_from(
        &self,
        queue: &Queue,
        recording: Option<&mut CommandRecording<'_>>,
        src: &Buffer,
    ) -> Result<(), TransferError> {
        if std::ptr::eq(self, src) {
            return Ok(());
        }
        if !src.is_valid() {
            return Err(TransferError::InvalidObject);
        }
        //always locked in address order
        let (dst_state, src_state) = if (self as *const Buffer) < (src as *const Buffer) {
            let dst = self.state()?;
            (dst, src.state()?)
        } else {
            let src_state = src.state()?;
            (self.state()?, src_state)
        };
        match (&*dst_state, &*src_state) {
            (BufferImp::Explicit(dst), BufferImp::Explicit(src)) => {
                let mut recorder = match recording.map(|r| r.imp_mut()) {
                    Some(RecordingImp::Explicit(recording)) => Recorder::Deferred(recording),
                    Some(RecordingImp::Host(_)) => return Err(TransferError::InvalidObject),
                    None => match &queue.imp {
                        QueueImp::Explicit(queue) => Recorder::Immediate(queue),
                        QueueImp::Host(_) => return Err(TransferError::InvalidObject),
                    },
                };
                dst.copy_from(&mut recorder, src)?;
            }
            (BufferImp::Host(dst), BufferImp::Host(src)) => dst.copy_from(src),
            _ => return Err(TransferError::InvalidObject),
        }
        Ok(())
    }

    /// The handle exported at creation, for buffers created with [`MemoryFlags::SHARING`].
    pub fn shared_handle(&self) -> Option<SharedHandle> {
        let state = self.base.acquire().ok()?;
        let BufferImp::Explicit(buffer) = &*state else {
            return None;
        };
        let kind = export_kind(self.base.interop());
        buffer
            .shared_handle()
            .map(|handle| SharedHandle { kind, handle })
    }

    pub fn native_handle(&self) -> Option<BufferHandle> {
        let state = self.base.acquire().ok()?;
        match &*state {
            BufferImp::Explicit(buffer) => buffer.handle(),
            BufferImp::Host(_) => None,
        }
    }

    pub(crate) fn host_storage(&self) -> Result<HostMemory, ExecuteError> {
        if !self.is_valid() {
            return Err(ExecuteError::InvalidObject);
        }
        let state = self.base.acquire()?;
        match &*state {
            BufferImp::Host(buffer) => Ok(buffer.storage().clone()),
            BufferImp::Explicit(_) => Err(ExecuteError::InvalidObject),
        }
    }

    pub(crate) fn explicit_handle(&self) -> Result<BufferHandle, ExecuteError> {
        if !self.is_valid() {
            return Err(ExecuteError::InvalidObject);
        }
        self.native_handle().ok_or(ExecuteError::InvalidObject)
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        if let Some(BufferImp::Explicit(buffer)) = self.base.teardown() {
            buffer.destroy();
        }
    }
}

/**
A buffer of kernel arguments (argument-buffer or descriptor-buffer style), bound to a kernel as
one argument.

Its layout is the kernel's business; this crate only moves the bytes.
*/
#[derive(Debug, Clone)]
pub struct ArgumentBuffer {
    buffer: Arc<Buffer>,
}

impl ArgumentBuffer {
    pub fn new(buffer: Arc<Buffer>) -> Self {
        ArgumentBuffer { buffer }
    }
    pub fn buffer(&self) -> &Arc<Buffer> {
        &self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;

    #[test]
    fn zero_sized_buffers_are_invalid() {
        let context = Context::host();
        let queue = context.create_queue(context.device()).unwrap();
        let buffer = context.create_buffer(&queue, 0, MemoryFlags::READ_WRITE, None);
        assert_eq!(buffer.creation_error(), Some(&CreateError::ZeroSize));
        assert_eq!(buffer.read(&queue), Err(TransferError::InvalidObject));
    }

    #[test]
    fn writes_past_the_end_are_rejected() {
        let context = Context::host();
        let queue = context.create_queue(context.device()).unwrap();
        let buffer = context.create_buffer(&queue, 4, MemoryFlags::READ_WRITE, None);
        assert_eq!(
            buffer.write(&queue, &[0; 5]),
            Err(TransferError::SizeMismatch {
                expected: 4,
                actual: 5
            })
        );
        buffer.write(&queue, &[1, 2]).unwrap();
        assert_eq!(buffer.read(&queue).unwrap(), vec![1, 2, 0, 0]);
    }

    #[test]
    fn copies_between_buffers() {
        let context = Context::simulated();
        let queue = context.create_queue(context.device()).unwrap();
        let src = context.create_buffer(
            &queue,
            4,
            MemoryFlags::READ,
            Some(HostMemory::new(vec![4, 3, 2, 1])),
        );
        let dst = context.create_buffer(&queue, 4, MemoryFlags::READ_WRITE, None);
        dst.copy_from(&queue, None, &src).unwrap();
        assert_eq!(dst.read(&queue).unwrap(), vec![4, 3, 2, 1]);
        dst.copy_from(&queue, None, &dst).unwrap();
        dst.zero(&queue).unwrap();
        assert_eq!(dst.read(&queue).unwrap(), vec![0; 4]);
    }
}
