// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Explicit buffers and the host-visible staging buffers used for every host transfer.

use super::queue::{ExplicitQueue, Recorder};
use super::{BufferHandle, BufferUsage, Driver, MemoryHandle, MemoryLocation, logged};
use crate::error::{CreateError, DriverError, DriverErrorKind};
use crate::memory_flags::ForeignKind;
use std::sync::Arc;

/// A host-visible buffer with its own allocation, released on drop.
pub(crate) struct Staging {
    driver: Arc<dyn Driver>,
    pub(crate) buffer: BufferHandle,
    memory: Option<MemoryHandle>,
}

impl Staging {
    pub(crate) fn new(driver: &Arc<dyn Driver>, size: u64) -> Result<Self, DriverError> {
        let buffer = logged(
            driver.create_buffer(
                size.max(1),
                BufferUsage::TRANSFER_SRC | BufferUsage::TRANSFER_DST,
            ),
            "staging buffer creation failed",
        )?;
        let mut staging = Staging {
            driver: driver.clone(),
            buffer,
            memory: None,
        };
        let requirements = driver.buffer_memory_requirements(buffer);
        let memory = logged(
            driver.allocate_memory(requirements.size, MemoryLocation::HostVisible, None),
            "staging allocation failed",
        )?;
        staging.memory = Some(memory);
        logged(
            driver.bind_buffer_memory(buffer, memory, 0),
            "staging allocation binding failed",
        )?;
        Ok(staging)
    }

    pub(crate) fn write(&self, data: &[u8]) -> Result<(), DriverError> {
        match self.memory {
            Some(memory) => self.driver.write_memory(memory, 0, data),
            None => Err(DriverError::new("write_memory", DriverErrorKind::InvalidHandle)),
        }
    }

    pub(crate) fn read(&self, out: &mut [u8]) -> Result<(), DriverError> {
        match self.memory {
            Some(memory) => self.driver.read_memory(memory, 0, out),
            None => Err(DriverError::new("read_memory", DriverErrorKind::InvalidHandle)),
        }
    }
}

impl Drop for Staging {
    fn drop(&mut self) {
        self.driver.destroy_buffer(self.buffer);
        if let Some(memory) = self.memory {
            self.driver.free_memory(memory);
        }
    }
}

#[derive(Debug)]
pub(crate) struct ExplicitBuffer {
    driver: Arc<dyn Driver>,
    buffer: Option<BufferHandle>,
    memory: Option<MemoryHandle>,
    size: u64,
    shared_handle: Option<u64>,
}

impl ExplicitBuffer {
    pub(crate) fn new(driver: Arc<dyn Driver>) -> Self {
        ExplicitBuffer {
            driver,
            buffer: None,
            memory: None,
            size: 0,
            shared_handle: None,
        }
    }

    pub(crate) fn allocate(
        &mut self,
        queue: &ExplicitQueue,
        size: u64,
        initial: Option<&[u8]>,
        export: Option<ForeignKind>,
    ) -> Result<(), CreateError> {
        let driver = self.driver.clone();
        let usage = BufferUsage::STORAGE
            | BufferUsage::UNIFORM
            | BufferUsage::INDIRECT
            | BufferUsage::TRANSFER_SRC
            | BufferUsage::TRANSFER_DST;
        let buffer = logged(driver.create_buffer(size, usage), "buffer creation failed")?;
        self.buffer = Some(buffer);
        self.size = size;
        let requirements = driver.buffer_memory_requirements(buffer);
        let memory = logged(
            driver.allocate_memory(requirements.size, MemoryLocation::DeviceLocal, export),
            "buffer allocation failed",
        )?;
        self.memory = Some(memory);
        logged(
            driver.bind_buffer_memory(buffer, memory, 0),
            "buffer allocation binding failed",
        )?;
        if let Some(data) = initial {
            self.write(queue, data)?;
        }
        if let Some(kind) = export {
            self.shared_handle = Some(logged(
                driver.export_memory(memory, kind),
                "failed to retrieve shared memory handle",
            )?);
        }
        Ok(())
    }

    pub(crate) fn handle(&self) -> Option<BufferHandle> {
        self.buffer
    }
    pub(crate) fn shared_handle(&self) -> Option<u64> {
        self.shared_handle
    }

    fn valid_handle(&self) -> Result<BufferHandle, DriverError> {
        self.buffer.ok_or(DriverError::new(
            "buffer",
            DriverErrorKind::InvalidHandle,
        ))
    }

    /// Copies `data` (at most the buffer size) to the start of the buffer.
    pub(crate) fn write(&self, queue: &ExplicitQueue, data: &[u8]) -> Result<(), DriverError> {
        let buffer = self.valid_handle()?;
        let len = (data.len() as u64).min(self.size);
        let staging = Staging::new(&self.driver, len)?;
        staging.write(&data[..len as usize])?;
        Recorder::Immediate(queue).record(|driver, commands| {
            driver.cmd_copy_buffer(commands, staging.buffer, buffer, len);
        })
    }

    pub(crate) fn read(&self, queue: &ExplicitQueue) -> Result<Vec<u8>, DriverError> {
        let buffer = self.valid_handle()?;
        let staging = Staging::new(&self.driver, self.size)?;
        let size = self.size;
        Recorder::Immediate(queue).record(|driver, commands| {
            driver.cmd_copy_buffer(commands, buffer, staging.buffer, size);
        })?;
        let mut out = vec![0; size as usize];
        staging.read(&mut out)?;
        Ok(out)
    }

    pub(crate) fn fill(&self, recorder: &mut Recorder<'_>, value: u32) -> Result<(), DriverError> {
        let buffer = self.valid_handle()?;
        let size = self.size;
        recorder.record(|driver, commands| driver.cmd_fill_buffer(commands, buffer, 0, size, value))
    }

    pub(crate) fn copy_from(
        &self,
        recorder: &mut Recorder<'_>,
        src: &ExplicitBuffer,
    ) -> Result<(), DriverError> {
        let dst = self.valid_handle()?;
        let src_handle = src.valid_handle()?;
        let size = self.size.min(src.size);
        recorder.record(|driver, commands| driver.cmd_copy_buffer(commands, src_handle, dst, size))
    }

    pub(crate) fn destroy(&mut self) {
        if let Some(buffer) = self.buffer.take() {
            self.driver.destroy_buffer(buffer);
        }
        if let Some(memory) = self.memory.take() {
            self.driver.free_memory(memory);
        }
    }
}
