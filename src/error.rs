// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Error types.
//!
//! Errors come in two tiers. Configuration problems (flag combinations, formats, extents) are
//! soft: flags are corrected and logged, and bad formats or extents produce an invalid object
//! whose [`CreateError`] can be inspected. Driver failures are hard stops for the operation in
//! progress and surface as [`DriverError`], wrapped by the error of whatever operation failed.

use crate::pixel_formats::{ImageExtent, ImageFormat};
use std::fmt::Display;

/// The reason a native call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum DriverErrorKind {
    OutOfDeviceMemory,
    OutOfHostMemory,
    Unsupported,
    DeviceLost,
    InvalidHandle,
    /// Produced by failure injection on the simulated driver.
    Injected,
}

impl Display for DriverErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriverErrorKind::OutOfDeviceMemory => write!(f, "out of device memory"),
            DriverErrorKind::OutOfHostMemory => write!(f, "out of host memory"),
            DriverErrorKind::Unsupported => write!(f, "unsupported"),
            DriverErrorKind::DeviceLost => write!(f, "device lost"),
            DriverErrorKind::InvalidHandle => write!(f, "invalid handle"),
            DriverErrorKind::Injected => write!(f, "injected failure"),
        }
    }
}

/// A failed native call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{operation} failed: {kind}")]
pub struct DriverError {
    /// Name of the native operation, such as `"create_image"`.
    pub operation: &'static str,
    pub kind: DriverErrorKind,
}

impl DriverError {
    pub const fn new(operation: &'static str, kind: DriverErrorKind) -> Self {
        DriverError { operation, kind }
    }
}

/// Failure to acquire a memory object's exclusive section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum MemoryError {
    #[error("memory object is being torn down")]
    TornDown,
    #[error("a previous holder of the memory object panicked")]
    Poisoned,
}

/// Why a buffer, image, kernel or pipeline could not be created.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum CreateError {
    #[error("unsupported image format {0}")]
    UnsupportedFormat(ImageFormat),
    #[error("invalid image format {0}")]
    InvalidFormat(ImageFormat),
    #[error("invalid image extent {0:?}")]
    InvalidExtent(ImageExtent),
    #[error("cube map width and height must be equal, got {width}x{height}")]
    NonSquareCube { width: u32, height: u32 },
    #[error("host data is {actual} bytes, expected {expected}")]
    HostDataSize { expected: u64, actual: u64 },
    #[error("zero-sized buffers are not allowed")]
    ZeroSize,
    #[error("the device no longer exists")]
    DeviceGone,
    #[error("{0}")]
    Unsupported(&'static str),
    #[error("{0}")]
    Memory(#[from] MemoryError),
    #[error("initial transition failed: {0}")]
    Transition(#[from] TransitionError),
    #[error("initial upload failed: {0}")]
    Transfer(#[from] TransferError),
    #[error("driver error: {0}")]
    Driver(#[from] DriverError),
}

/// Failure of a layout/access transition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum TransitionError {
    #[error("render targets can't be read-write")]
    ReadWriteRenderTarget,
    #[error("the image is invalid")]
    InvalidObject,
    #[error("the queue belongs to another device")]
    ForeignQueue,
    #[error("{0}")]
    Memory(#[from] MemoryError),
    #[error("driver error: {0}")]
    Driver(#[from] DriverError),
}

/// Failure of a host-facing read, write, map or fill.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum TransferError {
    #[error("transfer is {actual} bytes, expected {expected}")]
    SizeMismatch { expected: u64, actual: u64 },
    #[error("the object is invalid")]
    InvalidObject,
    #[error("host data for {0} can't be converted to its storage format")]
    UnsupportedConversion(ImageFormat),
    #[error("{0}")]
    Memory(#[from] MemoryError),
    #[error("transition failed: {0}")]
    Transition(#[from] TransitionError),
    #[error("driver error: {0}")]
    Driver(#[from] DriverError),
}

/// Failure to enqueue work.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ExecuteError {
    #[error("the device does not support cooperative dispatch")]
    CooperativeUnsupported,
    #[error("the device does not support indirect compute commands")]
    IndirectUnsupported,
    #[error("kernel {kernel} takes {expected} arguments, got {actual}")]
    ArgumentCount {
        kernel: String,
        expected: usize,
        actual: usize,
    },
    #[error("argument {index} of kernel {kernel} must be {expected}, got {actual}")]
    ArgumentKind {
        kernel: String,
        index: usize,
        expected: String,
        actual: String,
    },
    #[error("local work size must not contain zero")]
    ZeroLocalSize,
    #[error("local work size {size} exceeds the device maximum {max}")]
    LocalSizeTooLarge { size: u32, max: u32 },
    #[error("kernel {0} has no entry for this device")]
    NoEntry(String),
    #[error("an argument or kernel is invalid")]
    InvalidObject,
    #[error("argument {index} names an object already passed to the same dispatch")]
    AliasedArgument { index: usize },
    #[error("indirect command range {offset}+{count} exceeds {len} commands")]
    CommandRange { offset: u32, count: u32, len: u32 },
    #[error("transition failed: {0}")]
    Transition(#[from] TransitionError),
    #[error("{0}")]
    Memory(#[from] MemoryError),
    #[error("driver error: {0}")]
    Driver(#[from] DriverError),
}
