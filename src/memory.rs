// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
The lifecycle and locking contract shared by buffers and images.

A [`MemoryObject`] owns the backend state of one allocation behind an exclusive section. Every
sequence of backend calls that has to look atomic to callers (map-then-transition, upload-then-
regenerate-mips) runs while holding an [`Exclusive`] guard.

Teardown is driven by the owning type's `Drop`. Once it starts, [`MemoryObject::acquire`] fails
with [`MemoryError::TornDown`]. The base object itself never calls into a backend; releasing
native handles is the job of the backend state it wraps.
*/

use crate::device::Device;
use crate::error::MemoryError;
use crate::memory_flags::{Correction, ForeignKind, MemoryFlags};
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

/**
Host bytes handed to a memory object at creation.

With [`MemoryFlags::USE_HOST_MEMORY`] the object aliases these bytes: host-facing reads and writes
go through them and they stay authoritative for the host side. Otherwise they are only the
initial contents, copied to the device once.

Cloning is shallow.
*/
#[derive(Debug, Clone, Default)]
pub struct HostMemory(Arc<Mutex<Vec<u8>>>);

impl HostMemory {
    pub fn new(bytes: Vec<u8>) -> Self {
        HostMemory(Arc::new(Mutex::new(bytes)))
    }
    pub fn zeroed(len: usize) -> Self {
        Self::new(vec![0; len])
    }
    pub fn len(&self) -> usize {
        self.lock().len()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Copies the current bytes out.
    pub fn to_vec(&self) -> Vec<u8> {
        self.lock().clone()
    }
    pub fn with<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(&self.lock())
    }
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut Vec<u8>) -> R) -> R {
        f(&mut self.lock())
    }
    pub(crate) fn lock(&self) -> MutexGuard<'_, Vec<u8>> {
        //plain bytes can't be left inconsistent by a panic
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }
    /// Whether both values share the same bytes.
    pub fn same_as(&self, other: &HostMemory) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Identifies an object owned by a foreign API that a memory object interoperates with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ForeignInterop {
    pub kind: ForeignKind,
    /// The foreign API's object name (a GL texture name, for instance).
    pub id: u64,
}

/// A platform handle to exported device memory: a file descriptor or a Windows handle.
///
/// It is obtained once, at creation. Re-exporting is not supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SharedHandle {
    pub kind: ForeignKind,
    pub handle: u64,
}

/// The handle type a shared allocation is exported as: the interop's own handle type when it
/// names one, otherwise the platform's opaque handle.
pub(crate) fn export_kind(interop: Option<ForeignInterop>) -> ForeignKind {
    match interop.map(|i| i.kind) {
        Some(kind @ (ForeignKind::OpaqueFd | ForeignKind::OpaqueWin32)) => kind,
        _ if cfg!(windows) => ForeignKind::OpaqueWin32,
        _ => ForeignKind::OpaqueFd,
    }
}

pub(crate) struct MemoryObject<S> {
    device: Weak<Device>,
    host_memory: Option<HostMemory>,
    flags: MemoryFlags,
    corrections: Vec<Correction>,
    interop: Option<ForeignInterop>,
    tearing_down: AtomicBool,
    state: Mutex<S>,
}

impl<S> MemoryObject<S> {
    pub(crate) fn new(
        device: &Arc<Device>,
        host_memory: Option<HostMemory>,
        flags: MemoryFlags,
        interop: Option<ForeignInterop>,
        state: S,
    ) -> Self {
        if !flags.intersects(MemoryFlags::READ_WRITE) {
            logwise::error_sync!(
                "memory object created without read or write access, assuming read-write"
            );
        }
        let normalized = flags.normalize(interop.map(|i| i.kind));
        for correction in &normalized.corrections {
            logwise::info_sync!(
                "memory flags corrected: {correction}",
                correction = logwise::privacy::LogIt(correction)
            );
        }
        if normalized.flags.contains(MemoryFlags::USE_HOST_MEMORY) && host_memory.is_none() {
            logwise::warn_sync!("host memory use requested without host memory");
        }
        MemoryObject {
            device: Arc::downgrade(device),
            host_memory,
            flags: normalized.flags,
            corrections: normalized.corrections,
            interop,
            tearing_down: AtomicBool::new(false),
            state: Mutex::new(state),
        }
    }

    /// Enters the exclusive section.
    pub(crate) fn acquire(&self) -> Result<Exclusive<'_, S>, MemoryError> {
        if self.tearing_down.load(Ordering::Acquire) {
            return Err(MemoryError::TornDown);
        }
        let guard = self.state.lock().map_err(|_| MemoryError::Poisoned)?;
        Ok(Exclusive { guard })
    }

    /// Marks the object as torn down and hands out its state for release.
    ///
    /// Returns `None` if the state was poisoned; nothing is released in that case.
    pub(crate) fn teardown(&mut self) -> Option<&mut S> {
        self.tearing_down.store(true, Ordering::Release);
        self.state.get_mut().ok()
    }

    pub(crate) fn device(&self) -> Option<Arc<Device>> {
        self.device.upgrade()
    }
    pub(crate) fn flags(&self) -> MemoryFlags {
        self.flags
    }
    pub(crate) fn corrections(&self) -> &[Correction] {
        &self.corrections
    }
    pub(crate) fn host_memory(&self) -> Option<&HostMemory> {
        self.host_memory.as_ref()
    }
    /// The host memory the object aliases, if it uses host memory.
    pub(crate) fn aliased_host_memory(&self) -> Option<&HostMemory> {
        if self.flags.contains(MemoryFlags::USE_HOST_MEMORY) {
            self.host_memory.as_ref()
        } else {
            None
        }
    }
    pub(crate) fn interop(&self) -> Option<ForeignInterop> {
        self.interop
    }
}

impl<S> std::fmt::Debug for MemoryObject<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryObject")
            .field("flags", &self.flags)
            .field("interop", &self.interop)
            .field("tearing_down", &self.tearing_down.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// Guard for a memory object's exclusive section.
#[derive(Debug)]
pub(crate) struct Exclusive<'a, S> {
    guard: MutexGuard<'a, S>,
}

impl<S> Deref for Exclusive<'_, S> {
    type Target = S;
    fn deref(&self) -> &S {
        &self.guard
    }
}

impl<S> DerefMut for Exclusive<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.guard
    }
}
